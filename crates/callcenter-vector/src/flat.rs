//! Exact inner-product index held in memory.
//!
//! Every row is L2-normalized on insertion, so a normalized query scores
//! each row by cosine similarity. Search is a full scan, which is what the
//! dataset and chunk corpora (thousands of rows) call for.

use anyhow::Result;

use callcenter_core::similarity::{dot, normalized};
use callcenter_core::traits::SimilarityIndex;
use callcenter_core::types::{RowId, SearchHit};
use callcenter_core::Error;

#[derive(Debug, Clone)]
pub struct FlatIndex {
    dim: usize,
    rows: Vec<Vec<f32>>,
}

impl FlatIndex {
    pub fn new(dim: usize) -> Self {
        Self { dim, rows: Vec::new() }
    }

    pub fn from_rows(dim: usize, rows: Vec<Vec<f32>>) -> Result<Self> {
        let mut index = Self::new(dim);
        for row in rows {
            index.push(row)?;
        }
        Ok(index)
    }

    pub fn push(&mut self, vector: Vec<f32>) -> Result<RowId> {
        if vector.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: vector.len() }.into());
        }
        self.rows.push(normalized(vector));
        Ok(self.rows.len() - 1)
    }
}

impl SimilarityIndex for FlatIndex {
    fn dim(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: query.len() }.into());
        }
        let mut hits: Vec<SearchHit> = self
            .rows
            .iter()
            .enumerate()
            .map(|(row, v)| SearchHit { row, score: dot(query, v) })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.row.cmp(&b.row)));
        hits.truncate(k);
        Ok(hits)
    }
}
