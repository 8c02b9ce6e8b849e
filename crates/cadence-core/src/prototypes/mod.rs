//! Prototype cache: one averaged embedding per semantic category, built
//! from a keyword x template cross product and memoised on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::embedding::{cosine_similarity, Embedder, EmbeddingError};
use crate::emotion::tables::{KEYWORD_GROUPS, TEMPLATES};

/// Cache file format version. Bumping this forces regeneration even if the
/// on-disk bytes happen to still parse.
const CACHE_FORMAT_VERSION: u32 = 1;

#[non_exhaustive]
#[derive(Debug)]
pub enum PrototypeError {
    Embedding(EmbeddingError),
    Io(std::io::Error),
}

impl std::fmt::Display for PrototypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrototypeError::Embedding(e) => write!(f, "embedding failed while building prototypes: {e}"),
            PrototypeError::Io(e) => write!(f, "prototype cache I/O failed: {e}"),
        }
    }
}

impl std::error::Error for PrototypeError {}

impl From<EmbeddingError> for PrototypeError {
    fn from(e: EmbeddingError) -> Self {
        PrototypeError::Embedding(e)
    }
}

impl From<std::io::Error> for PrototypeError {
    fn from(e: std::io::Error) -> Self {
        PrototypeError::Io(e)
    }
}

#[derive(Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    centroids: HashMap<String, Vec<f32>>,
}

/// `category -> centroid` classifier, compared against an input embedding
/// by cosine similarity.
pub struct PrototypeCache {
    centroids: HashMap<String, Vec<f32>>,
}

fn cache_key(embedding_model_id: &str) -> String {
    let mut canonical: Vec<(&str, Vec<&str>)> = KEYWORD_GROUPS
        .iter()
        .map(|(category, keywords)| (*category, keywords.to_vec()))
        .collect();
    canonical.sort_by_key(|(category, _)| *category);

    let content = format!("{embedding_model_id}_{canonical:?}");
    let digest = Sha256::digest(content.as_bytes());
    hex_prefix(&digest, 8)
}

fn hex_prefix(bytes: &[u8], chars: usize) -> String {
    bytes
        .iter()
        .take(chars.div_ceil(2))
        .map(|b| format!("{b:02x}"))
        .collect::<String>()
        .chars()
        .take(chars)
        .collect()
}

impl PrototypeCache {
    fn cache_path(data_dir: &Path, embedding_model_id: &str) -> PathBuf {
        data_dir.join(".cache").join(format!("prototypes_{}.bin", cache_key(embedding_model_id)))
    }

    /// Load the cache from disk if present and well-formed, otherwise build
    /// it from scratch using `embedder` and persist the result.
    pub fn load_or_build(
        embedder: &dyn Embedder,
        embedding_model_id: &str,
        data_dir: &Path,
    ) -> Result<Self, PrototypeError> {
        let cache_dir = data_dir.join(".cache");
        std::fs::create_dir_all(&cache_dir)?;
        let cache_path = Self::cache_path(data_dir, embedding_model_id);

        if cache_path.exists() {
            match Self::try_load(&cache_path) {
                Ok(cache) => {
                    tracing::info!(path = ?cache_path, "loaded prototype cache");
                    return Ok(cache);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "prototype cache malformed, regenerating");
                }
            }
        }

        let cache = Self::build(embedder)?;
        if let Err(e) = cache.save(&cache_path) {
            tracing::warn!(error = %e, "failed to persist prototype cache");
        }
        Ok(cache)
    }

    fn try_load(path: &Path) -> Result<Self, PrototypeError> {
        let bytes = std::fs::read(path)?;
        let (file, _): (CacheFile, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
                .map_err(|e| PrototypeError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

        if file.version != CACHE_FORMAT_VERSION {
            return Err(PrototypeError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "cache format version mismatch",
            )));
        }

        Ok(Self { centroids: file.centroids })
    }

    fn save(&self, path: &Path) -> Result<(), PrototypeError> {
        let file = CacheFile {
            version: CACHE_FORMAT_VERSION,
            centroids: self.centroids.clone(),
        };
        let bytes = bincode::serde::encode_to_vec(&file, bincode::config::standard())
            .map_err(|e| PrototypeError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

        let tmp_path = path.with_extension("bin.tmp");
        std::fs::write(&tmp_path, bytes)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Build prototypes fresh by encoding every `template x keyword`
    /// variation per category and averaging.
    pub fn build(embedder: &dyn Embedder) -> Result<Self, PrototypeError> {
        let mut centroids = HashMap::with_capacity(KEYWORD_GROUPS.len());

        for (category, keywords) in KEYWORD_GROUPS {
            let variations: Vec<String> = keywords
                .iter()
                .flat_map(|keyword| {
                    TEMPLATES.iter().map(move |template| template.replace("{keyword}", keyword))
                })
                .collect();

            tracing::debug!(category = %category, count = variations.len(), "generating prototype");

            let refs: Vec<&str> = variations.iter().map(|s| s.as_str()).collect();
            let embeddings = embedder.encode_batch(&refs)?;

            let dims = embedder.dimensions();
            let mut centroid = vec![0.0f32; dims];
            for emb in &embeddings {
                for (c, v) in centroid.iter_mut().zip(emb.iter()) {
                    *c += v;
                }
            }
            let n = embeddings.len().max(1) as f32;
            for c in &mut centroid {
                *c /= n;
            }

            centroids.insert((*category).to_string(), centroid);
        }

        Ok(Self { centroids })
    }

    /// Return every category ranked by cosine similarity to `embedding`,
    /// highest first.
    pub fn rank(&self, embedding: &[f32]) -> Vec<(String, f32)> {
        let mut similarities: Vec<(String, f32)> = self
            .centroids
            .iter()
            .map(|(category, centroid)| (category.clone(), cosine_similarity(embedding, centroid)))
            .collect();

        similarities.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        similarities
    }

    pub fn best_match(&self, embedding: &[f32]) -> Option<(String, f32)> {
        self.rank(embedding).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_deterministic() {
        let a = cache_key("test-model");
        let b = cache_key("test-model");
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
    }

    #[test]
    fn cache_key_differs_by_model() {
        let a = cache_key("model-a");
        let b = cache_key("model-b");
        assert_ne!(a, b);
    }

    struct StubEmbedder;
    impl Embedder for StubEmbedder {
        fn dimensions(&self) -> usize {
            4
        }
        fn encode(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![1.0, 0.0, 0.0, 0.0])
        }
        fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0, 0.0]).collect())
        }
    }

    #[test]
    fn build_produces_one_centroid_per_category() {
        let cache = PrototypeCache::build(&StubEmbedder).unwrap();
        assert_eq!(cache.centroids.len(), KEYWORD_GROUPS.len());
    }

    #[test]
    fn rank_orders_descending() {
        let cache = PrototypeCache::build(&StubEmbedder).unwrap();
        let ranked = cache.rank(&[1.0, 0.0, 0.0, 0.0]);
        for window in ranked.windows(2) {
            assert!(window[0].1 >= window[1].1);
        }
    }
}
