use anyhow::Result;

use callcenter_core::similarity::normalized;
use callcenter_core::traits::{Embedder, SimilarityIndex};
use callcenter_core::types::{QaRecord, RowId};
use callcenter_core::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupTier {
    Dataset,
    Fallback,
}

/// Result of the dataset lookup. `score` is reported on a miss too, for
/// diagnostics only.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetLookup {
    pub tier: LookupTier,
    pub response: Option<String>,
    pub score: f32,
    pub row: Option<RowId>,
}

impl DatasetLookup {
    fn miss(score: f32, row: Option<RowId>) -> Self {
        Self { tier: LookupTier::Fallback, response: None, score, row }
    }
}

/// Tier 1: nearest curated question by cosine similarity.
pub struct DatasetMatcher<'a> {
    embedder: &'a dyn Embedder,
    index: &'a dyn SimilarityIndex,
    corpus: &'a [QaRecord],
    threshold: f32,
}

impl<'a> DatasetMatcher<'a> {
    pub fn new(embedder: &'a dyn Embedder, index: &'a dyn SimilarityIndex, corpus: &'a [QaRecord], threshold: f32) -> Self {
        Self { embedder, index, corpus, threshold }
    }

    pub fn lookup(&self, query: &str) -> Result<DatasetLookup> {
        if query.trim().is_empty() {
            return Ok(DatasetLookup::miss(0.0, None));
        }
        let query_vec = normalized(self.embedder.embed(query)?);
        let Some(best) = self.index.search(&query_vec, 1)?.into_iter().next() else {
            return Ok(DatasetLookup::miss(0.0, None));
        };
        if best.score < self.threshold {
            return Ok(DatasetLookup::miss(best.score, Some(best.row)));
        }
        let record = self
            .corpus
            .get(best.row)
            .ok_or_else(|| Error::Misaligned(format!("dataset index row {} has no corpus record", best.row)))?;
        Ok(DatasetLookup {
            tier: LookupTier::Dataset,
            response: Some(record.output.clone()),
            score: best.score,
            row: Some(best.row),
        })
    }
}
