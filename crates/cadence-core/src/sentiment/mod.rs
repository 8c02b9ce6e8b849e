//! Sentiment classification: text -> a labelled probability distribution.
//!
//! The core depends only on labels and relative order, so the trait
//! boundary is intentionally narrow — a host application can substitute a
//! hosted sentiment model without touching [`crate::emotion::EmotionAnalyzer`].
//! The implementation shipped here is a deterministic, bilingual (ES/EN)
//! lexicon scorer, in the same const-table style the rest of this crate's
//! keyword-driven modules use.

use std::collections::HashSet;

/// The closed sentiment label set the analyzer depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }
}

/// One entry of the returned distribution.
#[derive(Debug, Clone, Copy)]
pub struct SentimentScore {
    pub label: SentimentLabel,
    pub score: f32,
}

#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum SentimentError {
    InvalidInput(String),
}

impl std::fmt::Display for SentimentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SentimentError::InvalidInput(e) => write!(f, "invalid input: {e}"),
        }
    }
}

impl std::error::Error for SentimentError {}

/// Contract: given text up to 512 code points, return a distribution over
/// `{positive, negative, neutral}` that sums to 1.
pub trait SentimentModel: Send + Sync {
    fn classify(&self, text: &str) -> Result<Vec<SentimentScore>, SentimentError>;

    /// Convenience: the argmax label and its score.
    fn dominant(&self, text: &str) -> Result<SentimentScore, SentimentError> {
        let scores = self.classify(text)?;
        scores
            .into_iter()
            .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal))
            .ok_or_else(|| SentimentError::InvalidInput("empty distribution".to_string()))
    }
}

const POSITIVE_WORDS: &[&str] = &[
    "feliz", "alegre", "contento", "alegría", "felicidad", "animado", "bien", "genial",
    "fantástico", "dichoso", "amor", "encanta", "gusta", "genial", "excelente", "increíble",
    "happy", "great", "love", "amazing", "good", "excited", "joy", "wonderful",
];

const NEGATIVE_WORDS: &[&str] = &[
    "triste", "llorar", "melancolía", "dolor", "tristeza", "pena", "soledad", "rabia", "enfado",
    "frustración", "ira", "molesto", "enojado", "irritado", "estrés", "estresado", "agobio",
    "ansiedad", "mal", "horrible", "odio", "sad", "angry", "hate", "terrible", "bad", "awful",
];

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_string())
        .collect()
}

/// Deterministic lexicon-scored sentiment classifier.
pub struct LexiconSentiment {
    positive: HashSet<&'static str>,
    negative: HashSet<&'static str>,
}

impl Default for LexiconSentiment {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconSentiment {
    pub fn new() -> Self {
        Self {
            positive: POSITIVE_WORDS.iter().copied().collect(),
            negative: NEGATIVE_WORDS.iter().copied().collect(),
        }
    }
}

impl SentimentModel for LexiconSentiment {
    fn classify(&self, text: &str) -> Result<Vec<SentimentScore>, SentimentError> {
        if text.trim().is_empty() {
            return Err(SentimentError::InvalidInput("text cannot be empty".to_string()));
        }

        let tokens = tokenize(text);
        let pos_hits = tokens.iter().filter(|w| self.positive.contains(w.as_str())).count();
        let neg_hits = tokens.iter().filter(|w| self.negative.contains(w.as_str())).count();

        // Laplace-smoothed so the distribution always sums to 1 and no label
        // is ever exactly 0, matching how a real classifier's softmax output
        // behaves.
        let pos = pos_hits as f32 + 1.0;
        let neg = neg_hits as f32 + 1.0;
        let neu = 1.0 + if pos_hits == 0 && neg_hits == 0 { 1.0 } else { 0.0 };
        let total = pos + neg + neu;

        Ok(vec![
            SentimentScore {
                label: SentimentLabel::Positive,
                score: pos / total,
            },
            SentimentScore {
                label: SentimentLabel::Negative,
                score: neg / total,
            },
            SentimentScore {
                label: SentimentLabel::Neutral,
                score: neu / total,
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_rejected() {
        let model = LexiconSentiment::new();
        assert!(model.classify("").is_err());
    }

    #[test]
    fn positive_text_dominates() {
        let model = LexiconSentiment::new();
        let dominant = model.dominant("estoy muy feliz y contento").unwrap();
        assert_eq!(dominant.label, SentimentLabel::Positive);
    }

    #[test]
    fn negative_text_dominates() {
        let model = LexiconSentiment::new();
        let dominant = model.dominant("estoy triste y con mucho dolor").unwrap();
        assert_eq!(dominant.label, SentimentLabel::Negative);
    }

    #[test]
    fn neutral_text_when_no_hits() {
        let model = LexiconSentiment::new();
        let dominant = model.dominant("quiero escuchar algo de música").unwrap();
        assert_eq!(dominant.label, SentimentLabel::Neutral);
    }

    #[test]
    fn distribution_sums_to_one() {
        let model = LexiconSentiment::new();
        let scores = model.classify("un texto cualquiera").unwrap();
        let sum: f32 = scores.iter().map(|s| s.score).sum();
        assert!((sum - 1.0).abs() < 0.0001);
    }
}
