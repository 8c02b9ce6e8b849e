//! Cadence Core
//!
//! An emotion-aware music recommendation engine.
//!
//! Given a free-text description of a mood or activity, the engine:
//! - classifies the dominant emotion via a sentiment pass plus semantic
//!   similarity against a set of learned activity prototypes,
//! - enriches the query with emotional descriptors and embeds it,
//! - searches a persistent vector store filtered by the emotion's
//!   suggested genre (falling back to a secondary genre when the primary
//!   filter is too narrow),
//! - and records the interaction in an encrypted, per-user memory that
//!   feeds back into future recommendations.
//!
//! The vector store is pluggable behind one trait with two back-ends: an
//! HNSW-backed approximate index (`vector_store::hnsw`) for large
//! catalogues, and an exact flat index (`vector_store::flat`) for small
//! ones or for ground-truth comparisons.

pub mod config;
pub mod context;
pub mod crypto;
pub mod embedding;
pub mod emotion;
pub mod memory;
pub mod prototypes;
pub mod recommender;
pub mod sentiment;
pub mod track;
pub mod vector_store;

pub use config::Config;
pub use context::ContextManager;
pub use crypto::{CryptoError, Encryptor};
pub use emotion::{EmotionAnalyzer, EmotionError, EmotionState};
pub use recommender::{RecommendError, Recommender};
pub use track::{GenreTag, Track};
pub use vector_store::{SearchHit, VectorStore, VectorStoreError};
