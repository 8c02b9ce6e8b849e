//! Local semantic embeddings via `fastembed` (ONNX, local inference).
//!
//! Default model: BGE-small-en-v1.5, 384 native dimensions — matching the
//! dimensionality the rest of the system assumes, so no Matryoshka
//! truncation step is needed here (contrast a 768-dimension model, which
//! would need truncating to a smaller working size).

use std::sync::{Mutex, OnceLock};

use fastembed::{EmbeddingModel as FastEmbedModel, InitOptions, TextEmbedding};

use super::{normalize, EmbeddingError, Embedder};

/// Native output dimension of the default embedding model.
pub const EMBEDDING_DIMENSIONS: usize = 384;

/// Maximum text length for embedding (truncated if longer).
pub const MAX_TEXT_LENGTH: usize = 8192;

/// Batch size for efficient embedding generation.
pub const BATCH_SIZE: usize = 32;

static MODEL_RESULT: OnceLock<Result<Mutex<TextEmbedding>, String>> = OnceLock::new();

fn get_cache_dir() -> std::path::PathBuf {
    if let Ok(path) = std::env::var("FASTEMBED_CACHE_PATH") {
        return std::path::PathBuf::from(path);
    }

    if let Some(proj_dirs) = directories::ProjectDirs::from("io", "cadence", "cadence-core") {
        return proj_dirs.cache_dir().join("fastembed");
    }

    if let Some(base_dirs) = directories::BaseDirs::new() {
        return base_dirs.home_dir().join(".cache/cadence/fastembed");
    }

    std::path::PathBuf::from(".fastembed_cache")
}

fn get_model() -> Result<std::sync::MutexGuard<'static, TextEmbedding>, EmbeddingError> {
    let result = MODEL_RESULT.get_or_init(|| {
        let cache_dir = get_cache_dir();

        if let Err(e) = std::fs::create_dir_all(&cache_dir) {
            tracing::warn!("failed to create cache directory {:?}: {}", cache_dir, e);
        }

        let options = InitOptions::new(FastEmbedModel::BGESmallENV15)
            .with_show_download_progress(true)
            .with_cache_dir(cache_dir);

        TextEmbedding::try_new(options).map(Mutex::new).map_err(|e| {
            format!(
                "failed to initialize bge-small-en-v1.5 embedding model: {e}. \
                ensure ONNX runtime is available and model files can be downloaded."
            )
        })
    });

    match result {
        Ok(model) => model
            .lock()
            .map_err(|e| EmbeddingError::ModelInit(format!("lock poisoned: {e}"))),
        Err(err) => Err(EmbeddingError::ModelInit(err.clone())),
    }
}

/// Truncate to at most [`MAX_TEXT_LENGTH`] Unicode scalar values. Slicing on
/// a raw byte index can land inside a multi-byte UTF-8 sequence (Spanish
/// input is full of 2-byte accented characters) and panic, so this walks
/// `chars()` instead of indexing `text.len()` directly.
fn truncate_text(text: &str) -> String {
    if text.chars().count() > MAX_TEXT_LENGTH {
        text.chars().take(MAX_TEXT_LENGTH).collect()
    } else {
        text.to_string()
    }
}

/// Embedder backed by a process-wide, lazily-initialized `fastembed` model.
pub struct LocalEmbedder {
    dimensions: usize,
}

impl Default for LocalEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalEmbedder {
    pub fn new() -> Self {
        Self {
            dimensions: EMBEDDING_DIMENSIONS,
        }
    }

    /// Force model initialization (useful to surface load errors eagerly).
    pub fn init(&self) -> Result<(), EmbeddingError> {
        let _model = get_model()?;
        Ok(())
    }

    pub fn model_name(&self) -> &'static str {
        "BAAI/bge-small-en-v1.5"
    }
}

impl Embedder for LocalEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::InvalidInput("text cannot be empty".to_string()));
        }

        let mut model = get_model()?;
        let text = truncate_text(text);

        let embeddings = model
            .embed(vec![text.as_str()], None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;

        let mut vector = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::EmbeddingFailed("no embedding generated".to_string()))?;

        normalize(&mut vector);
        Ok(vector)
    }

    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let non_empty: Vec<&str> = texts.iter().copied().filter(|t| !t.is_empty()).collect();
        if non_empty.is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "batch contained only empty entries".to_string(),
            ));
        }

        let mut model = get_model()?;
        let mut all_embeddings = Vec::with_capacity(non_empty.len());

        for chunk in non_empty.chunks(BATCH_SIZE) {
            let truncated: Vec<String> = chunk.iter().map(|t| truncate_text(t)).collect();
            let refs: Vec<&str> = truncated.iter().map(|s| s.as_str()).collect();

            let embeddings = model
                .embed(refs, None)
                .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;

            for mut v in embeddings {
                normalize(&mut v);
                all_embeddings.push(v);
            }
        }

        Ok(all_embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_text_leaves_short_text_untouched() {
        assert_eq!(truncate_text("hello"), "hello");
    }

    #[test]
    fn truncate_text_cuts_long_text() {
        let long = "a".repeat(MAX_TEXT_LENGTH + 100);
        assert_eq!(truncate_text(&long).chars().count(), MAX_TEXT_LENGTH);
    }

    #[test]
    fn truncate_text_does_not_split_a_multibyte_character() {
        // "á" is 2 bytes in UTF-8; a byte-index slice at MAX_TEXT_LENGTH
        // would land mid-character if the text is built entirely from it.
        let long = "á".repeat(MAX_TEXT_LENGTH + 100);
        let truncated = truncate_text(&long);
        assert_eq!(truncated.chars().count(), MAX_TEXT_LENGTH);
        assert!(truncated.chars().all(|c| c == 'á'));
    }

    #[test]
    fn dimensions_reports_384() {
        let embedder = LocalEmbedder::new();
        assert_eq!(embedder.dimensions(), 384);
    }
}
