use serde::{Deserialize, Serialize};

use crate::error::{ChainRagError, Result};
use crate::models::{MetadataFilter, TransactionDocument};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub document: TransactionDocument,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: TransactionDocument,
    pub score: f32,
}

/// Brute-force cosine similarity index over one account's transactions.
///
/// Filters are applied before ranking, so `k` always counts matching
/// documents rather than being eaten by non-matching neighbours.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    pub model: String,
    pub dimensions: usize,
    entries: Vec<IndexedDocument>,
}

impl VectorIndex {
    pub fn new(model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            model: model.into(),
            dimensions,
            entries: Vec::new(),
        }
    }

    pub fn insert(&mut self, document: TransactionDocument, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(ChainRagError::Embedding(format!(
                "Vector for '{}' has {} dimensions, index expects {}",
                document.id,
                vector.len(),
                self.dimensions
            )));
        }
        self.entries.push(IndexedDocument { document, vector });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn documents(&self) -> impl Iterator<Item = &TransactionDocument> {
        self.entries.iter().map(|e| &e.document)
    }

    /// Top `k` documents matching `filter`, most similar first. Equal scores
    /// keep insertion order.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        filter: &MetadataFilter,
    ) -> Vec<ScoredDocument> {
        if k == 0 {
            return Vec::new();
        }

        let mut candidates: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| filter.matches(&entry.document))
            .map(|(pos, entry)| (pos, cosine_sim(query, &entry.vector)))
            .collect();

        candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(k);

        candidates
            .into_iter()
            .map(|(pos, score)| ScoredDocument {
                document: self.entries[pos].document.clone(),
                score,
            })
            .collect()
    }
}

fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}
