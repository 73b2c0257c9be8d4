use anyhow::Result;

use callcenter_core::similarity::normalized;
use callcenter_core::traits::{Embedder, SimilarityIndex};
use callcenter_core::types::DocumentChunk;
use callcenter_core::Error;

/// `context` is `None` when the best chunk scored under the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedContext {
    pub context: Option<String>,
    pub score: f32,
}

/// Builds the grounding passage for the retrieval tier.
///
/// Only the best of the top-k chunks is held to the threshold. Once it
/// clears, all k chunks are joined best first.
pub struct ContextRetriever<'a> {
    embedder: &'a dyn Embedder,
    index: &'a dyn SimilarityIndex,
    chunks: &'a [DocumentChunk],
    top_k: usize,
    threshold: f32,
}

impl<'a> ContextRetriever<'a> {
    pub fn new(
        embedder: &'a dyn Embedder,
        index: &'a dyn SimilarityIndex,
        chunks: &'a [DocumentChunk],
        top_k: usize,
        threshold: f32,
    ) -> Self {
        Self { embedder, index, chunks, top_k, threshold }
    }

    pub fn retrieve(&self, query: &str) -> Result<RetrievedContext> {
        let query_vec = normalized(self.embedder.embed(query)?);
        let hits = self.index.search(&query_vec, self.top_k)?;
        let Some(best) = hits.first().map(|h| h.score) else {
            return Ok(RetrievedContext { context: None, score: 0.0 });
        };
        if best < self.threshold {
            return Ok(RetrievedContext { context: None, score: best });
        }
        let texts = hits
            .iter()
            .map(|h| {
                self.chunks
                    .get(h.row)
                    .map(|c| c.text.as_str())
                    .ok_or_else(|| Error::Misaligned(format!("chunk index row {} has no chunk", h.row)))
            })
            .collect::<std::result::Result<Vec<&str>, Error>>()?;
        let context = texts.join("\n\n").trim().to_string();
        Ok(RetrievedContext { context: Some(context), score: best })
    }
}
