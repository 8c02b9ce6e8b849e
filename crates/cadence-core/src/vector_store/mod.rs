//! Persistent ANN vector store: one contract, two interchangeable
//! back-ends (HNSW-approximate and flat-exact).

#[cfg(feature = "vector-search")]
pub mod hnsw;

pub mod flat;

use std::collections::HashMap;
use std::path::Path;

#[cfg(feature = "vector-search")]
pub use hnsw::HnswStore;

pub use flat::FlatStore;

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum VectorStoreError {
    #[error("index creation failed: {0}")]
    IndexCreation(String),
    #[error("failed to add a vector: {0}")]
    IndexAdd(String),
    #[error("search failed: {0}")]
    IndexSearch(String),
    #[error("persistence failed: {0}")]
    IndexPersistence(String),
    #[error("invalid dimensions: expected {expected}, got {got}")]
    InvalidDimensions { expected: usize, got: usize },
    #[error("duplicate track id: {0}")]
    DuplicateId(String),
}

/// A record to insert: a stable id, arbitrary string metadata (empty
/// string denotes "absent" — there is no distinguished null so the format
/// stays uniform across back-ends), and its embedding.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: String,
    pub metadata: HashMap<String, String>,
    pub embedding: Vec<f32>,
}

/// One scored search result. `distance` is the complement of `similarity`
/// (`1.0 - similarity`) so callers that think in either frame don't need to
/// recompute it.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub metadata: HashMap<String, String>,
    pub similarity: f32,
    pub distance: f32,
}

/// Equality-predicate conjunction applied to metadata during search. An
/// empty filter matches everything.
pub type Filter = HashMap<String, String>;

/// Aggregate statistics about a store.
#[derive(Debug, Clone)]
pub struct VectorStoreStats {
    pub total_vectors: usize,
    pub dimensions: usize,
}

/// Contract shared by every vector-store back-end.
pub trait VectorStore: Send + Sync {
    /// Insert a batch of records. Atomic per batch: either all records are
    /// present afterward or none are.
    fn add(&mut self, records: Vec<VectorRecord>) -> Result<(), VectorStoreError>;

    /// Return up to `k` records matching `filter`, ranked by cosine
    /// similarity (highest first). Ties are broken by insertion order.
    fn search(&self, query: &[f32], k: usize, filter: &Filter) -> Result<Vec<SearchHit>, VectorStoreError>;

    fn count(&self) -> usize;

    /// Distinct values of the `genre` metadata key across all records.
    fn genres(&self) -> Vec<String>;

    /// Irreversibly clear the store, re-creating it empty.
    fn clear(&mut self) -> Result<(), VectorStoreError>;

    fn stats(&self) -> VectorStoreStats;

    /// Persist the store to `dir`.
    fn save(&self, dir: &Path) -> Result<(), VectorStoreError>;
}

fn metadata_matches(metadata: &HashMap<String, String>, filter: &Filter) -> bool {
    filter.iter().all(|(k, v)| metadata.get(k).map(|existing| existing == v).unwrap_or(false))
}
