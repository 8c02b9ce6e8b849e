//! Catalogue record shape and the closed genre vocabulary.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::vector_store::VectorRecord;

/// The closed genre vocabulary the recommender filters on. Out-of-vocabulary
/// tags may still be stored in a [`VectorStore`](crate::VectorStore) but will
/// never be selected by the emotion-to-genre table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenreTag {
    Sad,
    Chill,
    Happy,
    Dance,
    Party,
    Pop,
    Rock,
    Workout,
}

impl GenreTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenreTag::Sad => "sad",
            GenreTag::Chill => "chill",
            GenreTag::Happy => "happy",
            GenreTag::Dance => "dance",
            GenreTag::Party => "party",
            GenreTag::Pop => "pop",
            GenreTag::Rock => "rock",
            GenreTag::Workout => "workout",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sad" => Some(GenreTag::Sad),
            "chill" => Some(GenreTag::Chill),
            "happy" => Some(GenreTag::Happy),
            "dance" => Some(GenreTag::Dance),
            "party" => Some(GenreTag::Party),
            "pop" => Some(GenreTag::Pop),
            "rock" => Some(GenreTag::Rock),
            "workout" => Some(GenreTag::Workout),
            _ => None,
        }
    }
}

impl std::fmt::Display for GenreTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A catalogue record. Immutable once inserted into a
/// [`VectorStore`](crate::VectorStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub track_id: String,
    pub title: String,
    pub artist: String,
    pub description: String,
    pub genre: GenreTag,
    pub url: String,
    #[serde(default)]
    pub album_image: String,
    #[serde(default)]
    pub preview_url: String,
}

impl Track {
    /// Metadata key/value pairs as stored by the vector-store back-ends.
    /// Absent optional fields are represented as empty strings rather than a
    /// distinguished null, keeping the storage format uniform.
    pub fn metadata(&self) -> HashMap<String, String> {
        HashMap::from([
            ("title".to_string(), self.title.clone()),
            ("artist".to_string(), self.artist.clone()),
            ("description".to_string(), self.description.clone()),
            ("genre".to_string(), self.genre.as_str().to_string()),
            ("url".to_string(), self.url.clone()),
            ("album_image".to_string(), self.album_image.clone()),
            ("preview_url".to_string(), self.preview_url.clone()),
        ])
    }

    /// The ingestion-side insertion contract: pair this track's metadata
    /// with its externally-supplied embedding into a store-ready record.
    pub fn into_vector_record(self, embedding: Vec<f32>) -> VectorRecord {
        let metadata = self.metadata();
        VectorRecord { id: self.track_id, metadata, embedding }
    }
}
