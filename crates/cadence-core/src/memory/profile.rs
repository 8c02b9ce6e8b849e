//! Encrypted long-lived preference aggregate for a single user.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{now, MemoryError};
use crate::crypto::Encryptor;

const MAX_LISTENING_HISTORY: usize = 100;

/// One track accepted (played, saved, etc.) by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListeningHistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub track_id: String,
    pub genre: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    pub favorite_genres: Vec<String>,
    pub disliked_genres: Vec<String>,
    pub preferred_energy_range: (f32, f32),
    pub preferred_valence_range: (f32, f32),
    pub language: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            favorite_genres: Vec::new(),
            disliked_genres: Vec::new(),
            preferred_energy_range: (0.3, 0.7),
            preferred_valence_range: (0.3, 0.7),
            language: "es".to_string(),
        }
    }
}

/// Sparse patch applied to [`Preferences`]; `None` fields are left
/// untouched, matching the original's "merge only known keys" semantics.
#[derive(Debug, Clone, Default)]
pub struct PreferenceUpdate {
    pub favorite_genres: Option<Vec<String>>,
    pub disliked_genres: Option<Vec<String>>,
    pub preferred_energy_range: Option<(f32, f32)>,
    pub preferred_valence_range: Option<(f32, f32)>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Statistics {
    pub total_sessions: u64,
    pub total_recommendations: u64,
    pub most_common_emotion: Option<String>,
    pub last_session: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProfileData {
    user_id: String,
    created_at: DateTime<Utc>,
    preferences: Preferences,
    statistics: Statistics,
    listening_history: Vec<ListeningHistoryEntry>,
}

impl ProfileData {
    fn default_for(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            created_at: now(),
            preferences: Preferences::default(),
            statistics: Statistics::default(),
            listening_history: Vec::new(),
        }
    }
}

/// A user's durable preferences, listening history and session
/// statistics. Unlike [`super::conversation::ConversationMemory`] this is
/// a single aggregate, not an append-only log.
pub struct UserProfile {
    path: PathBuf,
    encryptor: Arc<Encryptor>,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>, memory_dir: &Path, encryptor: Arc<Encryptor>) -> Self {
        let user_id = user_id.into();
        let path = memory_dir.join(format!("{user_id}_profile.enc"));
        Self { path, encryptor }
    }

    fn user_id(&self) -> String {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.strip_suffix("_profile"))
            .unwrap_or_default()
            .to_string()
    }

    pub fn preferences(&self) -> Result<Preferences, MemoryError> {
        Ok(self.load()?.preferences)
    }

    pub fn statistics(&self) -> Result<Statistics, MemoryError> {
        Ok(self.load()?.statistics)
    }

    pub fn listening_history(&self) -> Result<Vec<ListeningHistoryEntry>, MemoryError> {
        Ok(self.load()?.listening_history)
    }

    /// Merge `update` into the stored preferences, leaving unset fields
    /// untouched.
    pub fn update_preferences(&self, update: PreferenceUpdate) -> Result<(), MemoryError> {
        let mut data = self.load()?;

        if let Some(v) = update.favorite_genres {
            data.preferences.favorite_genres = v;
        }
        if let Some(v) = update.disliked_genres {
            data.preferences.disliked_genres = v;
        }
        if let Some(v) = update.preferred_energy_range {
            data.preferences.preferred_energy_range = v;
        }
        if let Some(v) = update.preferred_valence_range {
            data.preferences.preferred_valence_range = v;
        }
        if let Some(v) = update.language {
            data.preferences.language = v;
        }

        self.save(&data)
    }

    /// Append a track to the listening history, keeping only the most
    /// recent [`MAX_LISTENING_HISTORY`] entries.
    pub fn add_to_listening_history(&self, track_id: impl Into<String>, genre: Option<String>) -> Result<(), MemoryError> {
        let mut data = self.load()?;
        data.listening_history.push(ListeningHistoryEntry {
            timestamp: now(),
            track_id: track_id.into(),
            genre,
        });

        if data.listening_history.len() > MAX_LISTENING_HISTORY {
            let excess = data.listening_history.len() - MAX_LISTENING_HISTORY;
            data.listening_history.drain(0..excess);
        }

        self.save(&data)
    }

    /// Record a session: bumps `total_sessions`, stamps `last_session`,
    /// and, if `emotion` is given, overwrites `most_common_emotion` with
    /// it (the latest emotion wins, not the true mode, mirroring the
    /// original's behaviour). `total_recommendations` is tracked here but
    /// is never incremented elsewhere, matching the original.
    pub fn update_statistics(&self, emotion: Option<&str>) -> Result<(), MemoryError> {
        let mut data = self.load()?;
        data.statistics.total_sessions += 1;
        data.statistics.last_session = Some(now());
        if let Some(emotion) = emotion {
            data.statistics.most_common_emotion = Some(emotion.to_string());
        }
        self.save(&data)
    }

    fn load(&self) -> Result<ProfileData, MemoryError> {
        if !self.path.exists() {
            return Ok(ProfileData::default_for(&self.user_id()));
        }

        let content = std::fs::read_to_string(&self.path)?;

        if let Ok(data) = self.encryptor.decrypt_obj::<ProfileData>(&content) {
            return Ok(data);
        }

        match serde_json::from_str::<ProfileData>(&content) {
            Ok(data) => {
                tracing::info!(user_id = %self.user_id(), "migrating plaintext profile to encrypted format");
                self.save(&data)?;
                Ok(data)
            }
            Err(e) => {
                tracing::warn!(user_id = %self.user_id(), error = %e, "profile unreadable, starting a fresh default profile");
                Ok(ProfileData::default_for(&self.user_id()))
            }
        }
    }

    fn save(&self, data: &ProfileData) -> Result<(), MemoryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let encoded = self.encryptor.encrypt_obj(data)?;

        let file_name = self.path.file_name().unwrap_or_default().to_string_lossy().to_string();
        let tmp_path = self.path.with_file_name(format!("{file_name}.tmp"));
        std::fs::write(&tmp_path, encoded)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
