//! Activity-pattern extraction + semantic classification -> structured
//! [`EmotionState`].

pub mod tables;

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::embedding::Embedder;
use crate::prototypes::PrototypeCache;
use crate::sentiment::SentimentModel;

/// Errors surfaced only by construction, never by `analyze` itself —
/// `analyze` degrades to the neutral default rather than propagating.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum EmotionError {
    #[error("failed to build activity prototypes: {0}")]
    PrototypeBuild(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub valence: f32,
    pub energy: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MusicParams {
    pub target_valence: f32,
    pub target_energy: f32,
}

/// The structured result of an emotion analysis pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionState {
    pub dominant_emotion: String,
    pub dominant_score: f32,
    pub suggested_genres: Vec<String>,
    pub dimensions: Dimensions,
    pub music_params: MusicParams,
}

impl EmotionState {
    fn from_emotion(emotion: &str, confidence: f32) -> Self {
        let (valence, energy) = tables::dimensions_for(emotion);
        let suggested_genres = tables::genres_for(emotion).iter().map(|g| g.to_string()).collect();

        Self {
            dominant_emotion: emotion.to_string(),
            dominant_score: confidence,
            suggested_genres,
            dimensions: Dimensions { valence, energy },
            music_params: MusicParams {
                target_valence: valence,
                target_energy: energy,
            },
        }
    }

    /// The neutral default, used whenever the analyzer has no usable
    /// signal or hits an internal error.
    pub fn neutral_default(confidence: f32) -> Self {
        Self::from_emotion("neutral", confidence)
    }
}

fn activity_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"para\s+(\w+(?:\s+\w+){0,2})",
            r"mientras\s+(\w+(?:\s+\w+){0,2})",
            r"cuando\s+(\w+(?:\s+\w+){0,2})",
            r"al\s+(\w+(?:\s+\w+){0,2})",
            r"quiero\s+(\w+(?:\s+\w+){0,2})",
            r"necesito\s+(\w+(?:\s+\w+){0,2})",
            r"voy a\s+(\w+(?:\s+\w+){0,2})",
            r"(?:música|canciones)\s+(?:para|de)\s+(\w+(?:\s+\w+){0,2})",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("activity pattern is a valid regex"))
        .collect()
    })
}

const IGNORE_WORDS: &[&str] = &[
    "el", "la", "los", "las", "un", "una", "unos", "unas", "mi", "tu", "su", "este", "esta",
    "ese", "esa", "mis", "tus", "sus", "mí", "ti", "música", "canciones",
];

/// Scan the lowercased text for a closed set of activity-expressing
/// patterns and return a small context window around the first match.
fn extract_activity_context(text: &str) -> Option<String> {
    let text_lower = text.to_lowercase();

    for pattern in activity_patterns() {
        let Some(captures) = pattern.captures(&text_lower) else {
            continue;
        };
        let activity = captures.get(1)?.as_str().trim();

        let filtered_words: Vec<&str> =
            activity.split_whitespace().filter(|w| !IGNORE_WORDS.contains(w)).collect();

        if filtered_words.is_empty() {
            continue;
        }

        let words: Vec<&str> = text_lower.split_whitespace().collect();
        let first_word = filtered_words[0];

        if let Some(idx) = words.iter().position(|w| *w == first_word) {
            let start = idx.saturating_sub(2);
            let end = (idx + 4).min(words.len());
            return Some(words[start..end].join(" "));
        }
    }

    None
}

/// Combines a sentiment model, an embedder, and a set of activity
/// prototypes to classify free text into an [`EmotionState`].
pub struct EmotionAnalyzer {
    sentiment: Arc<dyn SentimentModel>,
    embedder: Arc<dyn Embedder>,
    prototypes: PrototypeCache,
}

impl EmotionAnalyzer {
    pub fn new(
        sentiment: Arc<dyn SentimentModel>,
        embedder: Arc<dyn Embedder>,
        prototypes: PrototypeCache,
    ) -> Self {
        Self { sentiment, embedder, prototypes }
    }

    /// The public neutral-default response, for callers that need a
    /// placeholder without going through a failed analysis.
    pub fn default_response(&self, confidence: f32) -> EmotionState {
        EmotionState::neutral_default(confidence)
    }

    /// Analyze `text`. Never fails: any internal error degrades to the
    /// neutral default.
    pub fn analyze(&self, text: &str) -> EmotionState {
        if text.trim().is_empty() {
            return EmotionState::neutral_default(0.50);
        }

        let text_trimmed = text.trim();
        let sentiment_input: String = text_trimmed.chars().take(512).collect();

        let dominant = match self.sentiment.dominant(&sentiment_input) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(error = %e, "sentiment classification failed, using neutral default");
                return EmotionState::neutral_default(0.50);
            }
        };

        let sentiment_label = dominant.label.as_str();
        let sentiment_confidence = dominant.score;

        tracing::info!(sentiment = sentiment_label, confidence = sentiment_confidence, "sentiment pass complete");

        // Unlike the sentiment call above, activity extraction sees the
        // whole (untruncated) input.
        let activity_context = extract_activity_context(text_trimmed);
        let context_to_analyze = activity_context.as_deref().unwrap_or(text_trimmed);

        if activity_context.is_some() {
            tracing::info!(context = %context_to_analyze, "activity context detected");
        } else {
            tracing::info!("no activity pattern matched, analyzing full text");
        }

        let emotion = self.analyze_semantic_context(context_to_analyze, sentiment_label, sentiment_confidence);

        EmotionState::from_emotion(&emotion, sentiment_confidence)
    }

    fn analyze_semantic_context(&self, context: &str, sentiment: &str, confidence: f32) -> String {
        let embedding = match self.embedder.encode(context) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "embedding failed during semantic classification, falling back to sentiment");
                return tables::sentiment_to_emotion(sentiment).to_string();
            }
        };

        let ranked = self.prototypes.rank(&embedding);
        let Some((most_similar, max_similarity)) = ranked.into_iter().next() else {
            return tables::sentiment_to_emotion(sentiment).to_string();
        };

        let base_threshold = 0.35;
        let adjusted_threshold = base_threshold - if confidence > 0.8 { 0.05 } else { 0.0 };

        tracing::debug!(most_similar = %most_similar, similarity = max_similarity, threshold = adjusted_threshold, "semantic classification");

        if max_similarity >= adjusted_threshold {
            self.activity_type_to_emotion(&most_similar, sentiment)
        } else {
            tables::sentiment_to_emotion(sentiment).to_string()
        }
    }

    fn activity_type_to_emotion(&self, activity_type: &str, sentiment: &str) -> String {
        if let Some(emotion) = tables::strong_mapping(activity_type) {
            return emotion.to_string();
        }

        if let Some(emotion) = tables::weak_mapping(activity_type, sentiment) {
            return emotion.to_string();
        }

        tables::sentiment_to_emotion(sentiment).to_string()
    }
}
