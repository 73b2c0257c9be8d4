use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::error::Error;
use crate::types::QaRecord;

/// Read the instruction/response corpus, a JSON array of
/// `{instruction, input?, output}` objects. Order is preserved because row
/// positions must match the dataset index.
pub fn load_corpus(path: &Path) -> Result<Vec<QaRecord>> {
    if !path.exists() {
        return Err(Error::NotFound(format!("corpus file {}", path.display())).into());
    }
    let raw = fs::read_to_string(path).with_context(|| format!("reading corpus {}", path.display()))?;
    let records: Vec<QaRecord> =
        serde_json::from_str(&raw).with_context(|| format!("parsing corpus {}", path.display()))?;
    if records.is_empty() {
        return Err(Error::EmptyArtifact(format!("corpus {} has no records", path.display())).into());
    }
    tracing::info!(records = records.len(), path = %path.display(), "corpus loaded");
    Ok(records)
}
