//! Domain types shared by the retrieval, generation and routing crates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a record in its store. Rows of an index and rows of the
/// store backing it must line up one to one.
pub type RowId = usize;

/// A curated instruction/response pair from the BFSI dataset.
///
/// - `instruction`: the canonical customer question
/// - `input`: optional extra context (often an empty string in the corpus)
/// - `output`: the vetted answer returned verbatim on a dataset match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaRecord {
    pub instruction: String,
    #[serde(default)]
    pub input: Option<String>,
    pub output: String,
}

/// A paragraph-sized block of a regulatory/policy document.
///
/// Chunks are filtered for minimum substance when the index is built; the
/// runtime trusts that filter and does not re-check it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    pub source: String,
}

/// One nearest-neighbour result. `score` is an inner product over unit
/// vectors, so it is a cosine similarity and not a probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub row: RowId,
    pub score: f32,
}

/// Decoding knobs handed to a [`crate::traits::GenerativeModel`].
///
/// Decoding is always greedy; only the budget and the repetition penalty
/// are tunable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_new_tokens: usize,
    pub repetition_penalty: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self { max_new_tokens: 120, repetition_penalty: 1.2 }
    }
}

/// The tier that produced a final answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    Dataset,
    Rag,
    FineTuned,
}

impl Tier {
    /// Provenance label surfaced to the caller.
    pub fn label(self) -> &'static str {
        match self {
            Tier::Dataset => "Tier 1 (Dataset)",
            Tier::Rag => "Tier 3 (RAG)",
            Tier::FineTuned => "Tier 2 (TinyLlama)",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of routing a single query. Built fresh per query, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub tier: Tier,
    pub response: String,
    pub dataset_score: f32,
    pub retrieval_score: Option<f32>,
}

impl RoutingDecision {
    pub fn provenance(&self) -> &'static str {
        self.tier.label()
    }
}
