use crate::types::{GenerationParams, SearchHit};

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector for a single input"))
    }
}

/// Nearest-neighbour search over L2-normalized vectors.
///
/// Hits come back ordered by descending score and carry the row position of
/// the matched vector, which callers resolve against the aligned store.
pub trait SimilarityIndex: Send + Sync {
    fn dim(&self) -> usize;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn search(&self, query: &[f32], k: usize) -> anyhow::Result<Vec<SearchHit>>;
}

pub trait GenerativeModel: Send + Sync {
    fn generate(&self, prompt: &str, params: &GenerationParams) -> anyhow::Result<String>;
}
