//! Cross-back-end integration tests for `vector_store`.
//!
//! These exercise the two back-ends through the shared `VectorStore`
//! trait on the same synthetic catalogue, rather than through either
//! back-end's own unit tests, so that what's actually being checked is
//! agreement and persistence behaviour that only shows up once both
//! implementations are compared side by side.

use std::collections::HashMap;

use cadence_core::vector_store::{Filter, FlatStore, VectorRecord, VectorStore};

#[cfg(feature = "vector-search")]
use cadence_core::vector_store::HnswStore;

const DIMENSIONS: usize = 32;

/// Ten well-separated clusters (8 points each), so that "nearest neighbour"
/// has an unambiguous ground truth: every point's true nearest neighbours
/// are the other seven points in its own cluster.
fn synthetic_catalogue() -> Vec<VectorRecord> {
    let clusters = 10;
    let per_cluster = 8;
    let mut records = Vec::with_capacity(clusters * per_cluster);

    for cluster in 0..clusters {
        let mut axis = vec![0.0f32; DIMENSIONS];
        axis[cluster % DIMENSIONS] = 1.0;

        for point in 0..per_cluster {
            let mut embedding = axis.clone();
            // Small, deterministic per-point jitter on a different axis so
            // points in the same cluster are close but not identical.
            let jitter_axis = (cluster + point + 1) % DIMENSIONS;
            embedding[jitter_axis] += 0.01 * (point as f32 + 1.0);

            let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            for x in &mut embedding {
                *x /= norm;
            }

            let mut metadata = HashMap::new();
            metadata.insert("genre".to_string(), format!("cluster-{cluster}"));
            records.push(VectorRecord {
                id: format!("c{cluster}-p{point}"),
                metadata,
                embedding,
            });
        }
    }

    records
}

fn cluster_of(id: &str) -> &str {
    id.split('-').next().unwrap()
}

#[test]
fn flat_store_recovers_every_inserted_record() {
    let catalogue = synthetic_catalogue();
    let total = catalogue.len();

    let mut store = FlatStore::new(DIMENSIONS);
    store.add(catalogue.clone()).unwrap();
    assert_eq!(store.count(), total);

    for record in &catalogue {
        let hits = store.search(&record.embedding, 7, &Filter::new()).unwrap();
        let same_cluster = hits.iter().filter(|h| cluster_of(&h.id) == cluster_of(&record.id)).count();
        assert_eq!(same_cluster, 7, "flat store should recover every same-cluster neighbour exactly");
    }
}

#[cfg(feature = "vector-search")]
#[test]
fn hnsw_store_achieves_high_recall_against_flat_ground_truth() {
    let catalogue = synthetic_catalogue();

    let mut flat = FlatStore::new(DIMENSIONS);
    flat.add(catalogue.clone()).unwrap();

    let mut hnsw = HnswStore::new(DIMENSIONS).unwrap();
    hnsw.add(catalogue.clone()).unwrap();
    assert_eq!(hnsw.count(), catalogue.len());

    let k = 10;
    let mut matched = 0usize;
    let mut total = 0usize;

    for record in &catalogue {
        let ground_truth: std::collections::HashSet<String> = flat
            .search(&record.embedding, k, &Filter::new())
            .unwrap()
            .into_iter()
            .map(|h| h.id)
            .collect();

        let approx = hnsw.search(&record.embedding, k, &Filter::new()).unwrap();

        matched += approx.iter().filter(|h| ground_truth.contains(&h.id)).count();
        total += ground_truth.len();
    }

    let recall = matched as f32 / total as f32;
    assert!(recall >= 0.95, "hnsw recall@10 against flat ground truth was {recall}, expected >= 0.95");
}

#[cfg(feature = "vector-search")]
#[test]
fn hnsw_and_flat_agree_on_top_k_identity_for_most_queries() {
    let catalogue = synthetic_catalogue();

    let mut flat = FlatStore::new(DIMENSIONS);
    flat.add(catalogue.clone()).unwrap();

    let mut hnsw = HnswStore::new(DIMENSIONS).unwrap();
    hnsw.add(catalogue.clone()).unwrap();

    let k = 5;
    let mut agreeing_queries = 0usize;

    for record in &catalogue {
        let flat_top: std::collections::HashSet<String> =
            flat.search(&record.embedding, k, &Filter::new()).unwrap().into_iter().map(|h| h.id).collect();
        let hnsw_top: std::collections::HashSet<String> =
            hnsw.search(&record.embedding, k, &Filter::new()).unwrap().into_iter().map(|h| h.id).collect();

        if flat_top == hnsw_top {
            agreeing_queries += 1;
        }
    }

    let agreement = agreeing_queries as f32 / catalogue.len() as f32;
    assert!(agreement >= 0.70, "only {agreement} of queries agreed on top-k identity, expected >= 0.70");
}

#[test]
fn flat_store_persistence_round_trip_matches_live_search() {
    let catalogue = synthetic_catalogue();
    let query = catalogue[3].embedding.clone();

    let tmp_dir = tempfile::tempdir().unwrap();

    let mut live = FlatStore::new(DIMENSIONS);
    live.add(catalogue.clone()).unwrap();
    let live_hits: Vec<String> =
        live.search(&query, 7, &Filter::new()).unwrap().into_iter().map(|h| h.id).collect();
    live.save(tmp_dir.path()).unwrap();

    let reopened = FlatStore::open(tmp_dir.path(), DIMENSIONS).unwrap();
    assert_eq!(reopened.count(), catalogue.len());
    let reopened_hits: Vec<String> =
        reopened.search(&query, 7, &Filter::new()).unwrap().into_iter().map(|h| h.id).collect();

    assert_eq!(live_hits, reopened_hits, "search results must survive a save/reopen cycle");
}

#[cfg(feature = "vector-search")]
#[test]
fn hnsw_store_persistence_round_trip_matches_live_search() {
    let catalogue = synthetic_catalogue();
    let query = catalogue[3].embedding.clone();

    let tmp_dir = tempfile::tempdir().unwrap();

    let mut live = HnswStore::new(DIMENSIONS).unwrap();
    live.add(catalogue.clone()).unwrap();
    let live_hits: Vec<String> =
        live.search(&query, 7, &Filter::new()).unwrap().into_iter().map(|h| h.id).collect();
    live.save(tmp_dir.path()).unwrap();

    let reopened = HnswStore::open(tmp_dir.path(), DIMENSIONS).unwrap();
    assert_eq!(reopened.count(), catalogue.len());
    let reopened_hits: Vec<String> =
        reopened.search(&query, 7, &Filter::new()).unwrap().into_iter().map(|h| h.id).collect();

    assert_eq!(live_hits, reopened_hits, "search results must survive a save/reopen cycle");
}
