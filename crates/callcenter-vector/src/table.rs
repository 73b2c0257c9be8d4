//! LanceDB reads and writes for the dataset and chunk tables.
//!
//! Tables are read in full once at startup; nothing here runs per query.
use anyhow::{anyhow, Result};
use arrow_array::cast::AsArray;
use arrow_array::{Array, ArrayRef, FixedSizeListArray, Int32Array, RecordBatch, RecordBatchIterator, StringArray};
use futures::TryStreamExt;
use lancedb::query::ExecutableQuery;
use lancedb::{connect, Connection};
use std::sync::Arc;

use callcenter_core::types::DocumentChunk;
use callcenter_core::Error;

use crate::schema::{chunk_schema, dataset_schema, ROW, SOURCE, TEXT, VECTOR};

/// One row as stored: position, vector and, for chunk tables, the chunk.
#[derive(Debug, Clone)]
pub struct StoredRow {
    pub row: usize,
    pub vector: Vec<f32>,
    pub chunk: Option<DocumentChunk>,
}

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

pub async fn read_rows(conn: &Connection, table: &str, with_chunks: bool) -> Result<Vec<StoredRow>> {
    let names = conn.table_names().execute().await?;
    if !names.contains(&table.to_string()) {
        return Err(Error::NotFound(format!("LanceDB table '{table}'")).into());
    }
    let t = conn.open_table(table).execute().await?;
    let mut out = Vec::new();
    let mut stream = t.query().execute().await?;
    while let Some(batch) = stream.try_next().await? {
        let rows = batch
            .column_by_name(ROW)
            .and_then(|c| c.as_any().downcast_ref::<Int32Array>())
            .ok_or_else(|| anyhow!("{table}.{ROW} column missing"))?;
        let vectors = batch
            .column_by_name(VECTOR)
            .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
            .ok_or_else(|| anyhow!("{table}.{VECTOR} column missing"))?;
        let texts = if with_chunks { Some(string_column(&batch, table, TEXT)?) } else { None };
        let sources = if with_chunks { Some(string_column(&batch, table, SOURCE)?) } else { None };
        for i in 0..batch.num_rows() {
            let row = usize::try_from(rows.value(i)).map_err(|_| anyhow!("{table}: negative row id {}", rows.value(i)))?;
            let vector = vectors
                .value(i)
                .as_primitive::<arrow_array::types::Float32Type>()
                .values()
                .iter()
                .copied()
                .collect::<Vec<f32>>();
            let chunk = match (texts, sources) {
                (Some(t), Some(s)) => Some(DocumentChunk { text: t.value(i).to_string(), source: s.value(i).to_string() }),
                _ => None,
            };
            out.push(StoredRow { row, vector, chunk });
        }
    }
    Ok(out)
}

fn string_column<'a>(batch: &'a RecordBatch, table: &str, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| anyhow!("{table}.{name} column missing"))
}

fn vector_column(vectors: &[Vec<f32>]) -> Result<(i32, ArrayRef)> {
    let dim = vectors.first().map(Vec::len).ok_or_else(|| Error::EmptyArtifact("no vectors to write".into()))?;
    if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
        return Err(Error::DimensionMismatch { expected: dim, actual: bad.len() }.into());
    }
    let dim = i32::try_from(dim)?;
    let values: Vec<Option<Vec<Option<f32>>>> = vectors.iter().map(|v| Some(v.iter().map(|&x| Some(x)).collect())).collect();
    let array = FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(values.into_iter(), dim);
    Ok((dim, Arc::new(array)))
}

fn row_column(n: usize) -> Result<ArrayRef> {
    let rows = (0..n).map(i32::try_from).collect::<std::result::Result<Vec<i32>, _>>()?;
    Ok(Arc::new(Int32Array::from(rows)))
}

async fn create(conn: &Connection, table: &str, batch: RecordBatch) -> Result<()> {
    let schema = batch.schema();
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
    conn.create_table(table, reader).execute().await?;
    Ok(())
}

/// Persist dataset vectors with rows numbered in slice order.
pub async fn write_dataset(conn: &Connection, table: &str, vectors: &[Vec<f32>]) -> Result<()> {
    let (dim, vector_col) = vector_column(vectors)?;
    let batch = RecordBatch::try_new(dataset_schema(dim), vec![row_column(vectors.len())?, vector_col])?;
    create(conn, table, batch).await
}

/// Persist chunks with their vectors; `chunks[i]` pairs with `vectors[i]`.
pub async fn write_chunks(conn: &Connection, table: &str, chunks: &[DocumentChunk], vectors: &[Vec<f32>]) -> Result<()> {
    if chunks.len() != vectors.len() {
        return Err(Error::Misaligned(format!("{} chunks vs {} vectors", chunks.len(), vectors.len())).into());
    }
    let (dim, vector_col) = vector_column(vectors)?;
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let sources: Vec<String> = chunks.iter().map(|c| c.source.clone()).collect();
    let batch = RecordBatch::try_new(
        chunk_schema(dim),
        vec![
            row_column(chunks.len())?,
            Arc::new(StringArray::from(texts)),
            Arc::new(StringArray::from(sources)),
            vector_col,
        ],
    )?;
    create(conn, table, batch).await
}
