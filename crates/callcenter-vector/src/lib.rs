//! Similarity indices for the dataset and document-chunk lookups.
//!
//! Artifacts live in LanceDB tables produced by the offline index builder.
//! They are read once into [`FlatIndex`] instances, which then answer every
//! query synchronously from memory.

use anyhow::Result;
use lancedb::Connection;
use std::path::Path;

use callcenter_core::types::DocumentChunk;
use callcenter_core::Error;

pub mod flat;
pub mod schema;
pub mod table;

pub use flat::FlatIndex;

use table::StoredRow;

/// The chunk index together with the chunk texts, row-aligned.
pub struct ChunkStore {
    pub index: FlatIndex,
    pub chunks: Vec<DocumentChunk>,
}

/// Blocking handle over a LanceDB directory. Owns a private runtime since
/// the rest of the pipeline is synchronous.
pub struct LanceStore { rt: tokio::runtime::Runtime, conn: Connection }

impl LanceStore {
    pub fn open(dir: &Path) -> Result<Self> {
        if !dir.exists() {
            return Err(Error::NotFound(format!("LanceDB directory {}", dir.display())).into());
        }
        let rt = tokio::runtime::Runtime::new()?;
        let conn = rt.block_on(table::open_db(dir.to_string_lossy().as_ref()))?;
        Ok(Self { rt, conn })
    }

    pub fn load_dataset_index(&self, table: &str) -> Result<FlatIndex> {
        let rows = aligned(table, self.rt.block_on(table::read_rows(&self.conn, table, false))?)?;
        let dim = rows[0].vector.len();
        let index = FlatIndex::from_rows(dim, rows.into_iter().map(|r| r.vector).collect())?;
        tracing::info!(table, rows = callcenter_core::traits::SimilarityIndex::len(&index), dim, "dataset index loaded");
        Ok(index)
    }

    pub fn load_chunk_store(&self, table: &str) -> Result<ChunkStore> {
        let rows = aligned(table, self.rt.block_on(table::read_rows(&self.conn, table, true))?)?;
        let dim = rows[0].vector.len();
        let mut index = FlatIndex::new(dim);
        let mut chunks = Vec::with_capacity(rows.len());
        for r in rows {
            index.push(r.vector)?;
            chunks.push(r.chunk.ok_or_else(|| Error::Misaligned(format!("{table}: row {} has no chunk text", r.row)))?);
        }
        tracing::info!(table, chunks = chunks.len(), dim, "chunk store loaded");
        Ok(ChunkStore { index, chunks })
    }

    pub fn write_dataset(&self, table: &str, vectors: &[Vec<f32>]) -> Result<()> {
        self.rt.block_on(table::write_dataset(&self.conn, table, vectors))
    }

    pub fn write_chunks(&self, table: &str, chunks: &[DocumentChunk], vectors: &[Vec<f32>]) -> Result<()> {
        self.rt.block_on(table::write_chunks(&self.conn, table, chunks, vectors))
    }
}

/// Order rows by their `row` id and require the ids to be exactly `0..n`.
fn aligned(table: &str, mut rows: Vec<StoredRow>) -> Result<Vec<StoredRow>> {
    if rows.is_empty() {
        return Err(Error::EmptyArtifact(format!("LanceDB table '{table}' has no rows")).into());
    }
    rows.sort_by_key(|r| r.row);
    if let Some((expected, r)) = rows.iter().enumerate().find(|(i, r)| r.row != *i) {
        return Err(Error::Misaligned(format!("{table}: expected row {expected}, found {}", r.row)).into());
    }
    Ok(rows)
}
