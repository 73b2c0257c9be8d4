//! Typed settings tree: data locations, routing thresholds, classifier
//! keywords, generation knobs and the formatter rule table.
//!
//! Every field has a default so a bare `config.toml` (or none at all) yields
//! a working assistant. `Settings::validate` rejects values the router
//! cannot act on.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::GenerationParams;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub routing: RoutingSettings,
    pub classifier: ClassifierSettings,
    pub generation: GenerationParams,
    pub formatter: FormatterSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub corpus_path: String,
    /// Plain-text policy documents, one `.txt` file per circular.
    pub rag_docs_dir: String,
    /// Sections this short (in chars) are not worth indexing.
    pub min_chunk_chars: usize,
    pub lancedb_dir: String,
    pub dataset_table: String,
    pub chunk_table: String,
    pub embed_model_dir: String,
    pub llm_model_dir: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            corpus_path: "data/bfsidata.json".to_string(),
            rag_docs_dir: "data/rag_docs".to_string(),
            min_chunk_chars: 50,
            lancedb_dir: "models/lancedb".to_string(),
            dataset_table: "bfsi_dataset".to_string(),
            chunk_table: "rag_chunks".to_string(),
            embed_model_dir: "models/all-MiniLM-L6-v2".to_string(),
            llm_model_dir: "models/tinyllama-bfsi".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingSettings {
    /// Minimum similarity for a dataset answer to be returned verbatim.
    pub dataset_threshold: f32,
    /// Minimum best-chunk similarity for the RAG tier to run.
    pub context_threshold: f32,
    pub context_top_k: usize,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self { dataset_threshold: 0.74, context_threshold: 0.55, context_top_k: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    pub keywords: Vec<String>,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        let keywords = [
            "regulatory",
            "framework",
            "compliance",
            "classification",
            "provisioning",
            "guidelines",
            "policy",
            "supervisory",
            "prudential",
            "reporting",
        ];
        Self { keywords: keywords.iter().map(|k| k.to_string()).collect() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatterSettings {
    /// Marker that opens the assistant turn in an echoed prompt.
    pub role_marker: String,
    /// Glyphs rewritten to a plain dash before bullet filtering.
    pub bullet_glyphs: Vec<String>,
    /// Bullets containing any of these (case-insensitive) are dropped.
    pub contradiction_phrases: Vec<String>,
    pub max_line_chars: usize,
    pub min_bullet_chars: usize,
    pub max_bullets: usize,
    pub min_bullets: usize,
    pub fallback: Vec<String>,
}

impl Default for FormatterSettings {
    fn default() -> Self {
        Self {
            role_marker: "<|assistant|>".to_string(),
            bullet_glyphs: ["•", "â€¢", "●", "▪", "◦"].iter().map(|g| g.to_string()).collect(),
            contradiction_phrases: ["no change", "decrease", "may not"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            max_line_chars: 140,
            min_bullet_chars: 5,
            max_bullets: 3,
            min_bullets: 2,
            fallback: vec![
                "- An increase in interest rate may raise your monthly EMI.".to_string(),
                "- The impact depends on loan tenure and outstanding balance.".to_string(),
                "- Exact changes require verification with the bank.".to_string(),
            ],
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let routing = &self.routing;
        for (name, value) in [
            ("routing.dataset_threshold", routing.dataset_threshold),
            ("routing.context_threshold", routing.context_threshold),
        ] {
            if !(-1.0..=1.0).contains(&value) {
                return Err(Error::InvalidConfig(format!("{name} must lie in [-1, 1], got {value}")));
            }
        }
        if routing.context_top_k == 0 {
            return Err(Error::InvalidConfig("routing.context_top_k must be at least 1".into()));
        }
        if self.generation.max_new_tokens == 0 {
            return Err(Error::InvalidConfig("generation.max_new_tokens must be at least 1".into()));
        }
        if self.generation.repetition_penalty <= 0.0 {
            return Err(Error::InvalidConfig("generation.repetition_penalty must be positive".into()));
        }
        let fmt = &self.formatter;
        if fmt.max_bullets == 0 || fmt.min_bullets > fmt.max_bullets {
            return Err(Error::InvalidConfig(format!(
                "formatter bullet bounds are inconsistent (min {}, max {})",
                fmt.min_bullets, fmt.max_bullets
            )));
        }
        if fmt.max_line_chars == 0 {
            return Err(Error::InvalidConfig("formatter.max_line_chars must be at least 1".into()));
        }
        if fmt.fallback.is_empty() || fmt.fallback.iter().any(|l| !l.starts_with('-')) {
            return Err(Error::InvalidConfig("formatter.fallback must be a non-empty list of dash bullets".into()));
        }
        if fmt.role_marker.is_empty() {
            return Err(Error::InvalidConfig("formatter.role_marker must not be empty".into()));
        }
        Ok(())
    }
}
