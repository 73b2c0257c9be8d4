use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::types::DocumentChunk;

/// Split a document on blank lines, keeping sections longer than
/// `min_chars` (after trimming) so headings and stray lines drop out.
pub fn chunk_sections(text: &str, min_chars: usize) -> Vec<String> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|section| section.chars().count() > min_chars)
        .map(str::to_string)
        .collect()
}

/// Chunk every `.txt` file directly under `dir`, visiting files in name
/// order so chunk rows are stable between builds.
pub fn load_documents(dir: &Path, min_chars: usize) -> Result<Vec<DocumentChunk>> {
    if !dir.is_dir() {
        return Err(Error::NotFound(format!("document directory {}", dir.display())).into());
    }
    let mut chunks = Vec::new();
    let files = list_txt_files(dir);
    for path in &files {
        let text = read_lossy(path)?;
        let source = path.file_name().map_or_else(String::new, |n| n.to_string_lossy().into_owned());
        let before = chunks.len();
        chunks.extend(chunk_sections(&text, min_chars).into_iter().map(|text| DocumentChunk { text, source: source.clone() }));
        tracing::debug!(file = %source, chunks = chunks.len() - before, "document chunked");
    }
    if chunks.is_empty() {
        return Err(Error::EmptyArtifact(format!("no usable sections in {} ({} files)", dir.display(), files.len())).into());
    }
    tracing::info!(files = files.len(), chunks = chunks.len(), "documents chunked");
    Ok(chunks)
}

fn read_lossy(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn list_txt_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("txt"))
        .collect();
    files.sort();
    files
}
