//! Exact inner-product vector index

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::{Error, Result};

const FORMAT_VERSION: u32 = 1;

/// One search result: the index row and its inner-product score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub row: usize,
    pub score: f32,
}

/// Brute-force index over row-major `f32` vectors
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

/// On-disk form of a [`FlatIndex`]
#[derive(Serialize, Deserialize)]
struct StoredIndex {
    version: u32,
    dimension: u32,
    rows: u64,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Build an index whose row `i` is `vectors[i]`
    pub fn build(vectors: &[Vec<f32>]) -> Result<Self> {
        let dimension = match vectors.first() {
            Some(first) if !first.is_empty() => first.len(),
            Some(_) => return Err(Error::embedding("Cannot index zero-dimensional vectors")),
            None => return Err(Error::embedding("Cannot build an index from no vectors")),
        };

        let mut data = Vec::with_capacity(vectors.len() * dimension);
        for (row, vector) in vectors.iter().enumerate() {
            if vector.len() != dimension {
                return Err(Error::embedding(format!(
                    "Vector {} has {} dimensions, expected {}",
                    row,
                    vector.len(),
                    dimension
                )));
            }
            data.extend_from_slice(vector);
        }

        Ok(Self { dimension, data })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The `min(k, len)` rows with the highest inner product against `query`,
    /// best first; equal scores keep ascending row order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimension {
            return Err(Error::ModelMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut hits: Vec<SearchHit> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(row, vector)| SearchHit {
                row,
                score: dot(vector, query),
            })
            .collect();

        hits.sort_by(|a, b| match b.score.total_cmp(&a.score) {
            Ordering::Equal => a.row.cmp(&b.row),
            other => other,
        });
        hits.truncate(k);

        Ok(hits)
    }

    /// Serialize to a versioned binary blob
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let stored = StoredIndex {
            version: FORMAT_VERSION,
            dimension: self.dimension as u32,
            rows: self.len() as u64,
            data: self.data.clone(),
        };
        bincode::serde::encode_to_vec(&stored, bincode::config::standard())
            .map_err(|e| Error::persistence(format!("Failed to encode index: {}", e)))
    }

    /// Parse a blob written by [`FlatIndex::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (stored, _): (StoredIndex, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| Error::persistence(format!("Corrupt index blob: {}", e)))?;

        if stored.version != FORMAT_VERSION {
            return Err(Error::persistence(format!(
                "Unsupported index format version {}",
                stored.version
            )));
        }
        let dimension = stored.dimension as usize;
        if dimension == 0 || stored.data.len() as u64 != stored.rows * dimension as u64 {
            return Err(Error::persistence(format!(
                "Index blob holds {} values, expected {} rows of {}",
                stored.data.len(),
                stored.rows,
                dimension
            )));
        }

        Ok(Self {
            dimension,
            data: stored.data,
        })
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
