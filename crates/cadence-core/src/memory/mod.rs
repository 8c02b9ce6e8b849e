//! Per-user persistent memory: an append-only encrypted conversation log
//! ([`conversation::ConversationMemory`]) and an encrypted preference
//! aggregate ([`profile::UserProfile`]).

pub mod conversation;
pub mod profile;

pub use conversation::{ConversationMemory, EmotionHistoryEntry, Interaction, PreferenceSummary};
pub use profile::{ListeningHistoryEntry, Preferences, PreferenceUpdate, Statistics, UserProfile};

use std::collections::HashMap;

use chrono::{DateTime, Utc};

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("encryption failed: {0}")]
    Crypto(#[from] crate::crypto::CryptoError),
    #[error("I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored data malformed: {0}")]
    Malformed(String),
}

/// Returns the top `n` entries of `counts`, ordered by descending count.
/// Mirrors `collections.Counter.most_common`; exact tie order among equal
/// counts is not part of the contract.
pub(crate) fn top_n(counts: HashMap<String, usize>, n: usize) -> Vec<(String, usize)> {
    let mut entries: Vec<(String, usize)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(n);
    entries
}

pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}
