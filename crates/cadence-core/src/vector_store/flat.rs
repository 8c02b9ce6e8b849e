//! Exact nearest-neighbour vector store ("Flat" index).
//!
//! Brute-force L2 distance over the stored (unit-norm) vectors — exact,
//! not approximate, and the natural choice for small catalogues or as a
//! ground-truth comparison against [`super::hnsw::HnswStore`].

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{metadata_matches, Filter, SearchHit, VectorRecord, VectorStore, VectorStoreError, VectorStoreStats};

#[derive(Serialize, Deserialize, Clone)]
struct StoredRecord {
    id: String,
    metadata: HashMap<String, String>,
    embedding: Vec<f32>,
}

#[derive(Serialize, Deserialize)]
struct PersistedFlatStore {
    dimensions: usize,
    records: Vec<StoredRecord>,
}

/// Exact flat index: every record is kept in memory and scanned linearly
/// on search.
pub struct FlatStore {
    dimensions: usize,
    records: Vec<StoredRecord>,
    index_by_id: HashMap<String, usize>,
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum::<f32>().sqrt()
}

impl FlatStore {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, records: Vec::new(), index_by_id: HashMap::new() }
    }

    /// Open a store previously persisted via [`VectorStore::save`], or
    /// create a fresh empty one if `dir` has no flat-store file yet.
    pub fn open(dir: &Path, dimensions: usize) -> Result<Self, VectorStoreError> {
        let path = dir.join("flat_store.json");
        if !path.exists() {
            return Ok(Self::new(dimensions));
        }

        let bytes = std::fs::read(&path)
            .map_err(|e| VectorStoreError::IndexPersistence(e.to_string()))?;
        let persisted: PersistedFlatStore = serde_json::from_slice(&bytes)
            .map_err(|e| VectorStoreError::IndexPersistence(e.to_string()))?;

        let index_by_id = persisted
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();

        Ok(Self {
            dimensions: persisted.dimensions,
            records: persisted.records,
            index_by_id,
        })
    }
}

impl VectorStore for FlatStore {
    fn add(&mut self, records: Vec<VectorRecord>) -> Result<(), VectorStoreError> {
        for record in &records {
            if record.embedding.len() != self.dimensions {
                return Err(VectorStoreError::InvalidDimensions {
                    expected: self.dimensions,
                    got: record.embedding.len(),
                });
            }
            if self.index_by_id.contains_key(&record.id) {
                return Err(VectorStoreError::DuplicateId(record.id.clone()));
            }
        }

        for record in records {
            let idx = self.records.len();
            self.index_by_id.insert(record.id.clone(), idx);
            self.records.push(StoredRecord {
                id: record.id,
                metadata: record.metadata,
                embedding: record.embedding,
            });
        }

        Ok(())
    }

    fn search(&self, query: &[f32], k: usize, filter: &Filter) -> Result<Vec<SearchHit>, VectorStoreError> {
        if query.len() != self.dimensions {
            return Err(VectorStoreError::InvalidDimensions {
                expected: self.dimensions,
                got: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| metadata_matches(&r.metadata, filter))
            .map(|(i, r)| {
                let distance = l2_distance(query, &r.embedding);
                (i, 1.0 / (1.0 + distance))
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, similarity)| {
                let record = &self.records[i];
                SearchHit {
                    id: record.id.clone(),
                    metadata: record.metadata.clone(),
                    similarity,
                    distance: 1.0 - similarity,
                }
            })
            .collect())
    }

    fn count(&self) -> usize {
        self.records.len()
    }

    fn genres(&self) -> Vec<String> {
        let mut genres: Vec<String> =
            self.records.iter().filter_map(|r| r.metadata.get("genre").cloned()).collect();
        genres.sort();
        genres.dedup();
        genres
    }

    fn clear(&mut self) -> Result<(), VectorStoreError> {
        self.records.clear();
        self.index_by_id.clear();
        Ok(())
    }

    fn stats(&self) -> VectorStoreStats {
        VectorStoreStats { total_vectors: self.records.len(), dimensions: self.dimensions }
    }

    fn save(&self, dir: &Path) -> Result<(), VectorStoreError> {
        std::fs::create_dir_all(dir).map_err(|e| VectorStoreError::IndexPersistence(e.to_string()))?;
        let path = dir.join("flat_store.json");
        let tmp_path = dir.join("flat_store.json.tmp");

        let persisted = PersistedFlatStore { dimensions: self.dimensions, records: self.records.clone() };
        let bytes = serde_json::to_vec(&persisted)
            .map_err(|e| VectorStoreError::IndexPersistence(e.to_string()))?;

        std::fs::write(&tmp_path, bytes).map_err(|e| VectorStoreError::IndexPersistence(e.to_string()))?;
        std::fs::rename(&tmp_path, &path).map_err(|e| VectorStoreError::IndexPersistence(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, genre: &str, vector: Vec<f32>) -> VectorRecord {
        let mut metadata = HashMap::new();
        metadata.insert("genre".to_string(), genre.to_string());
        VectorRecord { id: id.to_string(), metadata, embedding: vector }
    }

    #[test]
    fn add_and_count() {
        let mut store = FlatStore::new(3);
        store.add(vec![record("a", "pop", vec![1.0, 0.0, 0.0])]).unwrap();
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut store = FlatStore::new(3);
        store.add(vec![record("a", "pop", vec![1.0, 0.0, 0.0])]).unwrap();
        let result = store.add(vec![record("a", "pop", vec![0.0, 1.0, 0.0])]);
        assert!(result.is_err());
    }

    #[test]
    fn search_finds_exact_match_first() {
        let mut store = FlatStore::new(3);
        store
            .add(vec![
                record("a", "pop", vec![1.0, 0.0, 0.0]),
                record("b", "pop", vec![0.0, 1.0, 0.0]),
            ])
            .unwrap();

        let results = store.search(&[1.0, 0.0, 0.0], 2, &Filter::new()).unwrap();
        assert_eq!(results[0].id, "a");
    }

    #[test]
    fn filter_soundness() {
        let mut store = FlatStore::new(3);
        store
            .add(vec![
                record("a", "pop", vec![1.0, 0.0, 0.0]),
                record("b", "rock", vec![0.9, 0.1, 0.0]),
            ])
            .unwrap();

        let mut filter = Filter::new();
        filter.insert("genre".to_string(), "pop".to_string());
        let results = store.search(&[1.0, 0.0, 0.0], 10, &filter).unwrap();
        assert!(results.iter().all(|h| h.metadata.get("genre") == Some(&"pop".to_string())));
    }

    #[test]
    fn clear_empties_the_store() {
        let mut store = FlatStore::new(3);
        store.add(vec![record("a", "pop", vec![1.0, 0.0, 0.0])]).unwrap();
        store.clear().unwrap();
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn save_and_reopen_preserves_records() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let mut store = FlatStore::new(3);
        store
            .add(vec![
                record("a", "pop", vec![1.0, 0.0, 0.0]),
                record("b", "rock", vec![0.0, 1.0, 0.0]),
            ])
            .unwrap();
        store.save(tmp_dir.path()).unwrap();

        let reopened = FlatStore::open(tmp_dir.path(), 3).unwrap();
        assert_eq!(reopened.count(), 2);
    }
}
