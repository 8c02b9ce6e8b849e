//! Append-only, encrypted per-user conversation log.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{now, top_n, MemoryError};
use crate::crypto::Encryptor;
use crate::emotion::EmotionState;

/// One recorded recommendation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub timestamp: DateTime<Utc>,
    pub user_text: String,
    pub emotion_data: Option<EmotionState>,
    pub recommendations: Option<Vec<String>>,
}

/// One entry of [`ConversationMemory::emotion_history`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionHistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub emotion: String,
    pub score: f32,
    pub energy: f32,
    pub valence: f32,
}

/// Derived on demand from the full log; never persisted separately.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PreferenceSummary {
    pub favorite_genres: Vec<(String, usize)>,
    pub common_emotions: Vec<(String, usize)>,
    pub total_interactions: usize,
}

#[derive(Serialize, Deserialize, Default)]
struct HistoryFile {
    history: Vec<Interaction>,
}

/// Append-only encrypted log of a single user's interactions, capped at
/// `max_history` entries (oldest dropped first).
pub struct ConversationMemory {
    user_id: String,
    path: PathBuf,
    encryptor: Arc<Encryptor>,
    max_history: usize,
    memory_window: usize,
}

impl ConversationMemory {
    pub fn new(
        user_id: impl Into<String>,
        memory_dir: &Path,
        encryptor: Arc<Encryptor>,
        max_history: usize,
        memory_window: usize,
    ) -> Self {
        let user_id = user_id.into();
        let path = memory_dir.join(format!("{user_id}_history.enc"));
        Self { user_id, path, encryptor, max_history, memory_window }
    }

    /// Append `interaction`, truncating the log to the last `max_history`
    /// entries. Read-truncate-write under the user's file; concurrent
    /// writers for the same user are out of scope (single-process
    /// assumption).
    pub fn append(&self, interaction: Interaction) -> Result<(), MemoryError> {
        let mut history = self.load_full_history()?;
        history.push(interaction);

        if history.len() > self.max_history {
            let excess = history.len() - self.max_history;
            history.drain(0..excess);
        }

        self.write_history(&history)
    }

    /// The last `n` interactions, oldest first.
    pub fn recent(&self, n: usize) -> Result<Vec<Interaction>, MemoryError> {
        let history = self.load_full_history()?;
        let start = history.len().saturating_sub(n);
        Ok(history[start..].to_vec())
    }

    /// A human-readable summary of the last [`Self::memory_window`]
    /// interactions, truncated to roughly `max_chars` characters.
    pub fn conversation_context(&self, max_chars: usize) -> Result<String, MemoryError> {
        let recent = self.recent(self.memory_window)?;

        if recent.is_empty() {
            return Ok("This is your first conversation.".to_string());
        }

        let mut context = String::from("Recent conversation history:\n\n");
        for (i, interaction) in recent.iter().enumerate() {
            let preview: String = interaction.user_text.chars().take(100).collect();
            context.push_str(&format!("[{}] User: {preview}...\n", i + 1));

            if let Some(emotion) = &interaction.emotion_data {
                context.push_str(&format!("    Detected emotion: {}\n", emotion.dominant_emotion));
            }
            context.push('\n');
        }

        let char_budget = max_chars.saturating_mul(4);
        if context.chars().count() > char_budget {
            context = context.chars().take(char_budget).collect::<String>() + "...";
        }

        Ok(context)
    }

    /// Emotion trail over the last `n` interactions that carried emotion data.
    pub fn emotion_history(&self, n: usize) -> Result<Vec<EmotionHistoryEntry>, MemoryError> {
        let history = self.recent(n)?;
        Ok(history
            .into_iter()
            .filter_map(|interaction| {
                let emotion = interaction.emotion_data?;
                Some(EmotionHistoryEntry {
                    timestamp: interaction.timestamp,
                    emotion: emotion.dominant_emotion,
                    score: emotion.dominant_score,
                    energy: emotion.dimensions.energy,
                    valence: emotion.dimensions.valence,
                })
            })
            .collect())
    }

    /// Favourite genres and common emotions across the whole log, or
    /// `None` if the user has no history yet.
    pub fn preferences_summary(&self) -> Result<Option<PreferenceSummary>, MemoryError> {
        let history = self.load_full_history()?;
        if history.is_empty() {
            return Ok(None);
        }

        let mut genre_counts: HashMap<String, usize> = HashMap::new();
        let mut emotion_counts: HashMap<String, usize> = HashMap::new();

        for interaction in &history {
            if let Some(emotion) = &interaction.emotion_data {
                *emotion_counts.entry(emotion.dominant_emotion.clone()).or_insert(0) += 1;
                for genre in &emotion.suggested_genres {
                    *genre_counts.entry(genre.clone()).or_insert(0) += 1;
                }
            }
        }

        Ok(Some(PreferenceSummary {
            favorite_genres: top_n(genre_counts, 5),
            common_emotions: top_n(emotion_counts, 5),
            total_interactions: history.len(),
        }))
    }

    /// Irreversibly delete this user's log file. A no-op if it doesn't exist.
    pub fn clear(&self) -> Result<(), MemoryError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    fn load_full_history(&self) -> Result<Vec<Interaction>, MemoryError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path)?;

        if let Ok(file) = self.encryptor.decrypt_obj::<HistoryFile>(&content) {
            return Ok(file.history);
        }

        // Backward-compatibility path: the file may predate encryption.
        // Parse as plaintext JSON, then migrate by re-writing encrypted.
        match serde_json::from_str::<HistoryFile>(&content) {
            Ok(file) => {
                tracing::info!(user_id = %self.user_id, "migrating plaintext history to encrypted format");
                self.write_history(&file.history)?;
                Ok(file.history)
            }
            Err(e) => {
                tracing::warn!(user_id = %self.user_id, error = %e, "history file unreadable, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    fn write_history(&self, history: &[Interaction]) -> Result<(), MemoryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = HistoryFile { history: history.to_vec() };
        let encoded = self.encryptor.encrypt_obj(&file)?;

        let file_name = self.path.file_name().unwrap_or_default().to_string_lossy().to_string();
        let tmp_path = self.path.with_file_name(format!("{file_name}.tmp"));
        std::fs::write(&tmp_path, encoded)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

/// Build an [`Interaction`] for the current moment.
pub fn new_interaction(
    user_text: impl Into<String>,
    emotion_data: Option<EmotionState>,
    recommendations: Option<Vec<String>>,
) -> Interaction {
    Interaction { timestamp: now(), user_text: user_text.into(), emotion_data, recommendations }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::{Dimensions, MusicParams};

    fn encryptor() -> Arc<Encryptor> {
        Arc::new(Encryptor::new(b"test-master-secret-at-least-32-bytes-long"))
    }

    fn sample_emotion(dominant: &str) -> EmotionState {
        EmotionState {
            dominant_emotion: dominant.to_string(),
            dominant_score: 0.8,
            suggested_genres: vec!["pop".to_string(), "happy".to_string()],
            dimensions: Dimensions { valence: 0.8, energy: 0.7 },
            music_params: MusicParams { target_valence: 0.8, target_energy: 0.7 },
        }
    }

    #[test]
    fn empty_log_reports_first_conversation() {
        let tmp = tempfile::tempdir().unwrap();
        let memory = ConversationMemory::new("alice", tmp.path(), encryptor(), 50, 10);
        assert_eq!(memory.conversation_context(500).unwrap(), "This is your first conversation.");
    }

    #[test]
    fn append_then_recent_roundtrips() {
        let tmp = tempfile::tempdir().unwrap();
        let memory = ConversationMemory::new("alice", tmp.path(), encryptor(), 50, 10);

        memory.append(new_interaction("hola", Some(sample_emotion("joy")), None)).unwrap();
        memory.append(new_interaction("adios", Some(sample_emotion("sadness")), None)).unwrap();

        let recent = memory.recent(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].user_text, "hola");
        assert_eq!(recent[1].user_text, "adios");
    }

    #[test]
    fn rolling_cap_keeps_only_last_n() {
        let tmp = tempfile::tempdir().unwrap();
        let memory = ConversationMemory::new("alice", tmp.path(), encryptor(), 3, 10);

        for i in 0..5 {
            memory.append(new_interaction(format!("msg-{i}"), None, None)).unwrap();
        }

        let recent = memory.recent(100).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].user_text, "msg-2");
        assert_eq!(recent[2].user_text, "msg-4");
    }

    #[test]
    fn preferences_summary_counts_genres_and_emotions() {
        let tmp = tempfile::tempdir().unwrap();
        let memory = ConversationMemory::new("alice", tmp.path(), encryptor(), 50, 10);

        memory.append(new_interaction("a", Some(sample_emotion("joy")), None)).unwrap();
        memory.append(new_interaction("b", Some(sample_emotion("joy")), None)).unwrap();

        let summary = memory.preferences_summary().unwrap().unwrap();
        assert_eq!(summary.total_interactions, 2);
        assert_eq!(summary.common_emotions[0], ("joy".to_string(), 2));
    }

    #[test]
    fn preferences_summary_is_none_when_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let memory = ConversationMemory::new("alice", tmp.path(), encryptor(), 50, 10);
        assert!(memory.preferences_summary().unwrap().is_none());
    }

    #[test]
    fn clear_removes_the_log_file() {
        let tmp = tempfile::tempdir().unwrap();
        let memory = ConversationMemory::new("alice", tmp.path(), encryptor(), 50, 10);
        memory.append(new_interaction("hola", None, None)).unwrap();
        memory.clear().unwrap();
        assert!(memory.recent(10).unwrap().is_empty());
    }

    #[test]
    fn plaintext_history_is_migrated_on_read() {
        let tmp = tempfile::tempdir().unwrap();
        let memory = ConversationMemory::new("alice", tmp.path(), encryptor(), 50, 10);

        let plaintext = serde_json::to_string(&HistoryFile {
            history: vec![new_interaction("legacy", None, None)],
        })
        .unwrap();
        std::fs::write(&memory.path, plaintext).unwrap();

        let recent = memory.recent(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].user_text, "legacy");

        // After one read, the file must be in the new (encrypted) format.
        let on_disk = std::fs::read_to_string(&memory.path).unwrap();
        assert!(memory.encryptor.decrypt_obj::<HistoryFile>(&on_disk).is_ok());
    }
}
