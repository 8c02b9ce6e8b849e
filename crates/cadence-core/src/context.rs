//! Facade tying a user's [`memory::ConversationMemory`] and
//! [`memory::UserProfile`] together into the view the recommender and any
//! chat-style caller actually want.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::crypto::Encryptor;
use crate::emotion::EmotionState;
use crate::memory::{
    self, ConversationMemory, EmotionHistoryEntry, MemoryError, PreferenceSummary, Preferences,
    UserProfile,
};

/// Everything a prompt-builder needs about a user in one shot.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedContext {
    pub conversation_context: String,
    pub music_preferences: Option<PreferenceSummary>,
    pub emotion_history: Vec<EmotionHistoryEntry>,
    pub user_preferences: Preferences,
}

impl Default for EnrichedContext {
    fn default() -> Self {
        Self {
            conversation_context: "This is your first conversation.".to_string(),
            music_preferences: None,
            emotion_history: Vec::new(),
            user_preferences: Preferences::default(),
        }
    }
}

/// Per-user facade over [`ConversationMemory`] and [`UserProfile`].
pub struct ContextManager {
    conversation: ConversationMemory,
    profile: UserProfile,
}

impl ContextManager {
    pub fn new(
        user_id: impl Into<String>,
        memory_dir: &Path,
        encryptor: Arc<Encryptor>,
        max_history: usize,
        memory_window: usize,
    ) -> Self {
        let user_id = user_id.into();
        let conversation =
            ConversationMemory::new(&user_id, memory_dir, encryptor.clone(), max_history, memory_window);
        let profile = UserProfile::new(&user_id, memory_dir, encryptor);
        Self { conversation, profile }
    }

    /// Record one turn: always logs the interaction, and if `emotion` is
    /// given also folds it into the user's running statistics.
    pub fn add_interaction(
        &self,
        user_text: impl Into<String>,
        emotion: Option<&EmotionState>,
        recommendations: Option<Vec<String>>,
    ) -> Result<(), MemoryError> {
        let interaction =
            memory::conversation::new_interaction(user_text, emotion.cloned(), recommendations);
        self.conversation.append(interaction)?;

        if let Some(emotion) = emotion {
            self.profile.update_statistics(Some(&emotion.dominant_emotion))?;
        }

        Ok(())
    }

    /// Convenience variant of [`Self::add_interaction`] for callers that
    /// only have a bare emotion label and (optionally) a genre, not a full
    /// [`EmotionState`] — constructs a minimal one (confidence 1.0, a
    /// single suggested genre defaulting to `"pop"`, neutral 0.5/0.5
    /// dimensions) and records it the same way.
    pub fn add_quick_interaction(
        &self,
        user_text: impl Into<String>,
        emotion: &str,
        genre: Option<&str>,
    ) -> Result<(), MemoryError> {
        let emotion_data = EmotionState {
            dominant_emotion: emotion.to_string(),
            dominant_score: 1.0,
            suggested_genres: vec![genre.unwrap_or("pop").to_string()],
            dimensions: crate::emotion::Dimensions { valence: 0.5, energy: 0.5 },
            music_params: crate::emotion::MusicParams { target_valence: 0.5, target_energy: 0.5 },
        };

        self.add_interaction(user_text, Some(&emotion_data), None)
    }

    /// The combined view used to build a recommendation prompt. Never
    /// fails: any underlying read error degrades to
    /// [`EnrichedContext::default`] rather than propagating, since this
    /// is advisory context, not the recommendation itself.
    pub fn enriched_context(&self) -> EnrichedContext {
        self.try_enriched_context().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default context");
            EnrichedContext::default()
        })
    }

    fn try_enriched_context(&self) -> Result<EnrichedContext, MemoryError> {
        Ok(EnrichedContext {
            conversation_context: self.conversation.conversation_context(500)?,
            music_preferences: self.conversation.preferences_summary()?,
            emotion_history: self.conversation.emotion_history(10)?,
            user_preferences: self.profile.preferences()?,
        })
    }

    /// A text block suitable for seeding a downstream prompt: current
    /// input, prior conversation context (when this isn't the user's
    /// first turn), top favourite genres and common emotions, and the
    /// last few detected emotions.
    pub fn personalized_prompt(&self, current_input: &str) -> String {
        let context = self.enriched_context();
        let mut prompt = format!("Current message: {current_input}\n\n");

        if context.conversation_context != "This is your first conversation." {
            prompt.push_str(&context.conversation_context);
            prompt.push('\n');
        }

        if let Some(prefs) = &context.music_preferences {
            if !prefs.favorite_genres.is_empty() {
                let top: Vec<&str> =
                    prefs.favorite_genres.iter().take(3).map(|(g, _)| g.as_str()).collect();
                prompt.push_str(&format!("Favorite genres: {}\n", top.join(", ")));
            }
            if !prefs.common_emotions.is_empty() {
                let top: Vec<&str> =
                    prefs.common_emotions.iter().take(3).map(|(e, _)| e.as_str()).collect();
                prompt.push_str(&format!("Common emotions: {}\n", top.join(", ")));
            }
        }

        if !context.emotion_history.is_empty() {
            let recent: Vec<&str> = context
                .emotion_history
                .iter()
                .rev()
                .take(3)
                .map(|e| e.emotion.as_str())
                .collect();
            prompt.push_str(&format!("Recent emotions: {}\n", recent.join(", ")));
        }

        prompt
    }

    /// Clear the conversation log only; the user's durable profile
    /// (preferences, statistics, listening history) is kept.
    pub fn clear_all(&self) -> Result<(), MemoryError> {
        self.conversation.clear()
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }
}
