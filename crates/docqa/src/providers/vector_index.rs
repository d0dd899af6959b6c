//! Vector index provider trait for storing and searching chunk embeddings

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::types::{Chunk, DocumentId};

/// Search result from the vector index
#[derive(Debug, Clone)]
pub struct VectorMatch {
    /// The matched chunk
    pub chunk: Chunk,
    /// Similarity score (higher is more similar)
    pub similarity: f32,
}

/// What a built index was built with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    /// Embedding model used for every vector
    pub model: String,
    /// Vector dimensions
    pub dimensions: usize,
    /// Number of chunks
    pub chunks: usize,
    /// When the build finished
    pub built_at: DateTime<Utc>,
    /// Query vectors folded in from accepted feedback
    #[serde(default)]
    pub reinforcements: usize,
}

impl IndexManifest {
    /// Why this index cannot serve the given embedding settings, if it can't
    pub fn mismatch(&self, model: &str, dimensions: usize) -> Option<String> {
        if self.model != model {
            Some(format!("index built with model {}, configured {}", self.model, model))
        } else if self.chunks > 0 && self.dimensions != dimensions {
            Some(format!(
                "index has {} dimensions, configured {}",
                self.dimensions, dimensions
            ))
        } else {
            None
        }
    }
}

/// A query embedding that should also lead to an accepted chunk
#[derive(Debug, Clone, PartialEq)]
pub struct Reinforcement {
    /// Chunk the query was accepted for
    pub target: DocumentId,
    /// Embedding of the query text
    pub embedding: Vec<f32>,
}

/// Result of opening the persisted index
#[derive(Debug, Clone)]
pub enum IndexState {
    /// Loaded and searchable
    Ready(IndexManifest),
    /// Absent or unreadable, with the reason
    Missing(String),
}

/// Trait for the persisted vector index
///
/// A rebuild replaces the whole index; readers that started before the swap
/// finish against the old snapshot.
#[async_trait]
pub trait VectorIndexProvider: Send + Sync {
    /// Load the index from durable storage
    async fn open(&self) -> Result<IndexState>;

    /// Replace the whole index with `chunks` and their embeddings, then persist it
    async fn replace_all(
        &self,
        chunks: Vec<Chunk>,
        embeddings: Vec<Vec<f32>>,
        model: &str,
    ) -> Result<IndexManifest>;

    /// Replace the reinforcement vectors of the current index.
    ///
    /// A chunk scores the best of its own similarity and that of any query
    /// vector pointing at it, and is returned at most once. A rebuild drops
    /// every reinforcement.
    async fn set_reinforcements(&self, reinforcements: Vec<Reinforcement>) -> Result<IndexManifest> {
        let _ = reinforcements;
        Err(Error::internal(format!(
            "{} does not support reinforcement",
            self.name()
        )))
    }

    /// Top `top_k` chunks by similarity, best first
    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<VectorMatch>>;

    /// Every identifier currently indexed
    async fn ids(&self) -> Result<HashSet<DocumentId>>;

    /// Number of indexed chunks
    async fn len(&self) -> Result<usize>;

    /// Whether an index is loaded
    fn is_loaded(&self) -> bool;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
