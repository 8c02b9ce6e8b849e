//! Request-path orchestrator: analyse → enrich → search → explain → record.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use crate::context::{ContextManager, EnrichedContext};
use crate::crypto::Encryptor;
use crate::embedding::{EmbeddingError, Embedder};
use crate::emotion::{tables, EmotionAnalyzer, EmotionState};
use crate::vector_store::{Filter, SearchHit, VectorStore};

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum RecommendError {
    #[error("user_text must not be empty")]
    EmptyInput,
    #[error("failed to embed the enriched query: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("vector search failed: {0}")]
    Search(#[from] crate::vector_store::VectorStoreError),
}

/// The full result of one [`Recommender::recommend`] call.
///
/// `music_recommendations` and `context_playlists` are reserved
/// shape-slots for a presentation layer built on top of this core; they
/// are always empty here.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationBundle {
    pub emotion_analysis: EmotionState,
    pub vector_results: Vec<SearchHitView>,
    pub explanation: String,
    pub enriched_context: EnrichedContext,
    pub music_recommendations: Vec<()>,
    pub context_playlists: Vec<()>,
}

/// A [`SearchHit`] reshaped for serialization (the original borrows
/// nothing unusual, but keeping a view type here decouples the public
/// result shape from the store's internal representation).
#[derive(Debug, Clone, Serialize)]
pub struct SearchHitView {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub genre: String,
    pub url: String,
    pub similarity: f32,
}

impl From<SearchHit> for SearchHitView {
    fn from(hit: SearchHit) -> Self {
        Self {
            id: hit.id,
            title: hit.metadata.get("title").cloned().unwrap_or_default(),
            artist: hit.metadata.get("artist").cloned().unwrap_or_default(),
            genre: hit.metadata.get("genre").cloned().unwrap_or_default(),
            url: hit.metadata.get("url").cloned().unwrap_or_default(),
            similarity: hit.similarity,
        }
    }
}

/// Orchestrates a single recommendation request: emotion analysis, query
/// enrichment, filtered vector search with fallback, explanation, and
/// best-effort persistence of the interaction.
pub struct Recommender {
    analyzer: EmotionAnalyzer,
    embedder: Arc<dyn Embedder>,
    store: Box<dyn VectorStore>,
    encryptor: Arc<Encryptor>,
    memory_dir: PathBuf,
    max_conversation_history: usize,
    memory_window: usize,
    /// Source of randomness for the step-8 tail shuffle. Entropy-seeded by
    /// default; [`Self::with_seed`] swaps in a deterministic one so the
    /// "top `k/2` fixed, remainder a reproducible permutation" property can
    /// actually be exercised by a caller (or a test) that needs it.
    rng: Mutex<StdRng>,
}

impl Recommender {
    pub fn new(
        analyzer: EmotionAnalyzer,
        embedder: Arc<dyn Embedder>,
        store: Box<dyn VectorStore>,
        encryptor: Arc<Encryptor>,
        memory_dir: PathBuf,
        max_conversation_history: usize,
        memory_window: usize,
    ) -> Self {
        Self {
            analyzer,
            embedder,
            store,
            encryptor,
            memory_dir,
            max_conversation_history,
            memory_window,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Replace the randomisation source with one seeded deterministically,
    /// so that repeated `recommend(..., randomise: true)` calls produce a
    /// reproducible tail permutation (spec scenario S6).
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Run the full recommendation pipeline for `user_id`.
    ///
    /// `k` is the number of results requested; `randomise`, when set,
    /// keeps the top half in place and shuffles the remainder before
    /// trimming, so repeat requests for the same mood don't always
    /// return the identical ordering.
    pub fn recommend(
        &self,
        user_id: &str,
        user_text: &str,
        k: usize,
        randomise: bool,
    ) -> Result<RecommendationBundle, RecommendError> {
        if user_text.trim().is_empty() {
            return Err(RecommendError::EmptyInput);
        }

        let context_manager = ContextManager::new(
            user_id,
            &self.memory_dir,
            self.encryptor.clone(),
            self.max_conversation_history,
            self.memory_window,
        );

        // Step 1: best-effort context; never fatal.
        let enriched_context = context_manager.enriched_context();

        // Step 2: emotion analysis. `analyze` never fails by construction
        // in this implementation, so there is no malformed-structure case
        // to defend against here.
        let emotion = self.analyzer.analyze(user_text);

        // Step 3: enrich the query with a fixed emotional descriptor plus
        // energy/valence-driven qualifiers.
        let enriched_query = build_enriched_query(user_text, &emotion);

        // Step 4: embed the enriched query.
        let query_vector = self.embedder.encode(&enriched_query)?;

        // Steps 5-7: primary/secondary genre filtered search, falling
        // back to an unfiltered search when no genre is suggested.
        let search_n = if randomise { k * 2 } else { k };
        let mut results =
            self.search_with_genre_fallback(&query_vector, &emotion.suggested_genres, k, search_n)?;

        // Step 8: randomisation.
        if randomise && results.len() > k {
            let split = k / 2;
            let (head, tail) = results.split_at_mut(split);
            {
                let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                tail.shuffle(&mut *rng);
            }
            let mut combined: Vec<SearchHit> = head.to_vec();
            combined.extend(tail.iter().take(k - split).cloned());
            results = combined;
        } else {
            results.truncate(k);
        }

        // Step 9: one-sentence explanation.
        let explanation = build_explanation(&emotion);

        // Step 10: best-effort persistence; never propagated.
        if let Err(e) = context_manager.add_interaction(user_text, Some(&emotion), None) {
            tracing::warn!(user_id, error = %e, "failed to persist interaction, continuing without it");
        }

        Ok(RecommendationBundle {
            emotion_analysis: emotion,
            vector_results: results.into_iter().map(SearchHitView::from).collect(),
            explanation,
            enriched_context,
            music_recommendations: Vec::new(),
            context_playlists: Vec::new(),
        })
    }

    /// `k` is the caller's literal requested count, used only for the
    /// "fewer than k/2 results" fallback threshold; `n` is how many hits to
    /// actually fetch per query (`k`, or `2k` under randomisation).
    fn search_with_genre_fallback(
        &self,
        query: &[f32],
        suggested_genres: &[String],
        k: usize,
        n: usize,
    ) -> Result<Vec<SearchHit>, RecommendError> {
        let Some(primary) = suggested_genres.first() else {
            return Ok(self.store.search(query, n, &Filter::new())?);
        };

        let mut filter = Filter::new();
        filter.insert("genre".to_string(), primary.clone());
        let mut results = self.store.search(query, n, &filter)?;

        if results.len() < k / 2 {
            if let Some(secondary) = suggested_genres.get(1) {
                let remaining = n - results.len();
                let mut secondary_filter = Filter::new();
                secondary_filter.insert("genre".to_string(), secondary.clone());
                let secondary_results = self.store.search(query, remaining, &secondary_filter)?;
                results.extend(secondary_results);
            }
        }

        Ok(results)
    }
}

fn build_enriched_query(user_text: &str, emotion: &EmotionState) -> String {
    let mut query = format!("{user_text} {}", tables::descriptor_for(&emotion.dominant_emotion));

    let energy = emotion.dimensions.energy;
    if energy - 0.5 > 0.2 {
        query.push_str(" música energética rápida");
    } else if 0.5 - energy > 0.2 {
        query.push_str(" música suave lenta");
    }

    let valence = emotion.dimensions.valence;
    if valence - 0.5 > 0.2 {
        query.push_str(" música positiva alegre");
    } else if 0.5 - valence > 0.2 {
        query.push_str(" música melancólica");
    }

    query
}

fn build_explanation(emotion: &EmotionState) -> String {
    let mut explanation = format!("Música para cuando te sientes {}", emotion.dominant_emotion);
    if emotion.dimensions.energy < 0.3 {
        explanation.push_str(", con ritmo suave");
    } else if emotion.dimensions.energy > 0.7 {
        explanation.push_str(", con mucha energía");
    }
    explanation.push('.');
    explanation
}
