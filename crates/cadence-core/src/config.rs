//! Centralized configuration, loaded from the environment with defaults
//! appropriate for development.

use std::path::PathBuf;

/// Deployment mode. Only `Production` enforces the `MASTER_SECRET`
/// fail-closed rule in [`Config::from_env`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Development,
    Production,
}

/// Which vector store back-end to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorStoreKind {
    Hnsw,
    Flat,
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid VECTOR_STORE value: {0} (expected 'hnsw' or 'flat')")]
    InvalidVectorStore(String),
    #[error("MASTER_SECRET must be set when APP_ENV=production")]
    MissingMasterSecret,
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub run_mode: RunMode,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub emotion_model: String,
    pub vector_store: VectorStoreKind,
    pub memory_dir: PathBuf,
    pub store_dir: PathBuf,
    pub data_dir: PathBuf,
    pub max_conversation_history: usize,
    pub memory_window: usize,
    pub master_secret: Option<Vec<u8>>,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from the environment, applying defaults and
    /// validating `VECTOR_STORE` and, under `production`, `MASTER_SECRET`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let run_mode = if env_or("APP_ENV", "development").eq_ignore_ascii_case("production") {
            RunMode::Production
        } else {
            RunMode::Development
        };

        let vector_store_raw = env_or("VECTOR_STORE", "hnsw").to_lowercase();
        let vector_store = match vector_store_raw.as_str() {
            "hnsw" => VectorStoreKind::Hnsw,
            "flat" => VectorStoreKind::Flat,
            other => return Err(ConfigError::InvalidVectorStore(other.to_string())),
        };

        let base_dir = directories::ProjectDirs::from("io", "cadence", "cadence-core")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".cadence"));

        let memory_dir = env_or("MEMORY_DIR", &base_dir.join("memory").to_string_lossy()).into();
        let store_dir = env_or("STORE_DIR", &base_dir.join("store").to_string_lossy()).into();
        let data_dir = env_or("DATA_DIR", &base_dir.to_string_lossy()).into();

        for dir in [&memory_dir, &store_dir, &data_dir] {
            std::fs::create_dir_all(dir).map_err(|source| ConfigError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }

        let master_secret = std::env::var("MASTER_SECRET").ok().map(|s| s.into_bytes());
        if run_mode == RunMode::Production && master_secret.is_none() {
            return Err(ConfigError::MissingMasterSecret);
        }

        Ok(Self {
            run_mode,
            embedding_model: env_or("EMBEDDING_MODEL", "BGESmallENV15"),
            embedding_dimension: env_usize("EMBEDDING_DIMENSION", 384),
            emotion_model: env_or(
                "EMOTION_MODEL",
                "cardiffnlp/twitter-xlm-roberta-base-sentiment-multilingual",
            ),
            vector_store,
            memory_dir,
            store_dir,
            data_dir,
            max_conversation_history: env_usize("MAX_CONVERSATION_HISTORY", 50),
            memory_window: env_usize("MEMORY_WINDOW", 10),
            master_secret,
        })
    }

    /// Log the active configuration without exposing the master secret.
    pub fn log_summary(&self) {
        tracing::info!(
            vector_store = ?self.vector_store,
            embedding_model = %self.embedding_model,
            embedding_dimension = self.embedding_dimension,
            emotion_model = %self.emotion_model,
            run_mode = ?self.run_mode,
            "cadence-core configuration loaded"
        );
    }
}
