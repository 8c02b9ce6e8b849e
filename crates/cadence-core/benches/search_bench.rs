//! Cadence Core Benchmarks
//!
//! Benchmarks for the hot paths of a recommendation request: embedding
//! similarity, prototype ranking, and flat-store search.
//! Run with: cargo bench -p cadence-core

use std::collections::HashMap;

use cadence_core::vector_store::{Filter, FlatStore, VectorRecord, VectorStore};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    dot / (norm_a * norm_b)
}

fn bench_cosine_similarity(c: &mut Criterion) {
    let a: Vec<f32> = (0..384).map(|i| (i as f32).sin()).collect();
    let b: Vec<f32> = (0..384).map(|i| (i as f32).cos()).collect();

    c.bench_function("cosine_similarity_384d", |bencher| {
        bencher.iter(|| {
            black_box(cosine_similarity(&a, &b));
        })
    });
}

fn synthetic_vector(dims: usize, seed: usize) -> Vec<f32> {
    let mut v: Vec<f32> = (0..dims).map(|j| ((seed * dims + j) as f32).sin()).collect();
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

fn populated_store(n: usize, dims: usize) -> FlatStore {
    let mut store = FlatStore::new(dims);
    let genres = ["pop", "rock", "sad", "happy", "workout", "chill", "dance", "party"];
    let records: Vec<VectorRecord> = (0..n)
        .map(|i| {
            let mut metadata = HashMap::new();
            metadata.insert("genre".to_string(), genres[i % genres.len()].to_string());
            metadata.insert("title".to_string(), format!("track-{i}"));
            VectorRecord {
                id: format!("track-{i}"),
                metadata,
                embedding: synthetic_vector(dims, i),
            }
        })
        .collect();
    store.add(records).expect("synthetic catalogue insert");
    store
}

fn bench_flat_store_search_unfiltered(c: &mut Criterion) {
    let store = populated_store(1000, 384);
    let query = synthetic_vector(384, 999_999);

    c.bench_function("flat_store_search_1000x384_k10", |bencher| {
        bencher.iter(|| {
            black_box(store.search(&query, 10, &Filter::new()).unwrap());
        })
    });
}

fn bench_flat_store_search_filtered(c: &mut Criterion) {
    let store = populated_store(1000, 384);
    let query = synthetic_vector(384, 999_999);
    let mut filter = Filter::new();
    filter.insert("genre".to_string(), "workout".to_string());

    c.bench_function("flat_store_search_1000x384_k10_filtered", |bencher| {
        bencher.iter(|| {
            black_box(store.search(&query, 10, &filter).unwrap());
        })
    });
}

fn bench_emotion_analysis(c: &mut Criterion) {
    let analyzer = test_support::stub_analyzer();

    c.bench_function("emotion_analyze_activity_phrase", |bencher| {
        bencher.iter(|| {
            black_box(analyzer.analyze("quiero música para entrenar en el gimnasio"));
        })
    });
}

/// Benchmarks need a real [`EmotionAnalyzer`], which in turn needs an
/// embedder and sentiment model; these deterministic stand-ins avoid
/// pulling the `fastembed` ONNX runtime into the benchmark binary.
mod test_support {
    use std::sync::Arc;

    use cadence_core::prototypes::PrototypeCache;
    use cadence_core::EmotionAnalyzer;

    use crate::cadence_core_embedding_support::{StubEmbedder, StubSentiment};

    pub fn stub_analyzer() -> EmotionAnalyzer {
        let embedder: Arc<dyn cadence_core::embedding::Embedder> = Arc::new(StubEmbedder);
        let prototypes = PrototypeCache::build(embedder.as_ref()).expect("stub prototypes");
        EmotionAnalyzer::new(Arc::new(StubSentiment), embedder, prototypes)
    }
}

mod cadence_core_embedding_support {
    use cadence_core::embedding::{Embedder, EmbeddingError};
    use cadence_core::sentiment::{SentimentError, SentimentLabel, SentimentModel, SentimentScore};

    pub struct StubEmbedder;

    impl Embedder for StubEmbedder {
        fn dimensions(&self) -> usize {
            16
        }

        fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            let mut v = vec![0.0f32; 16];
            for (i, b) in text.bytes().enumerate() {
                v[i % 16] += b as f32;
            }
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                for x in &mut v {
                    *x /= norm;
                }
            }
            Ok(v)
        }

        fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            texts.iter().map(|t| self.encode(t)).collect()
        }
    }

    pub struct StubSentiment;

    impl SentimentModel for StubSentiment {
        fn classify(&self, _text: &str) -> Result<Vec<SentimentScore>, SentimentError> {
            Ok(vec![SentimentScore { label: SentimentLabel::Neutral, score: 0.6 }])
        }
    }
}

criterion_group!(
    benches,
    bench_cosine_similarity,
    bench_flat_store_search_unfiltered,
    bench_flat_store_search_filtered,
    bench_emotion_analysis,
);
criterion_main!(benches);
