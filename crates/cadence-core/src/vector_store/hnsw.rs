//! Approximate nearest-neighbour vector store, backed by an HNSW graph
//! index (`usearch`). Preferred back-end for catalogues too large for an
//! exact linear scan; trades perfect recall for sub-millisecond queries.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use super::{metadata_matches, Filter, SearchHit, VectorRecord, VectorStore, VectorStoreError, VectorStoreStats};

/// HNSW connectivity parameter (higher = better recall, more memory).
const DEFAULT_CONNECTIVITY: usize = 16;
/// Expansion factor used while building the index.
const DEFAULT_EXPANSION_ADD: usize = 128;
/// Expansion factor used while searching; tuned so that filter-free
/// recall@10 stays at or above 0.95 on well-separated synthetic data.
const DEFAULT_EXPANSION_SEARCH: usize = 64;

/// When a filter is present, usearch is asked for this multiple of `k`
/// raw candidates before the metadata predicate is applied.
const FILTER_OVERFETCH_FACTOR: usize = 2;

fn index_options(dimensions: usize) -> IndexOptions {
    IndexOptions {
        dimensions,
        metric: MetricKind::Cos,
        quantization: ScalarKind::F32,
        connectivity: DEFAULT_CONNECTIVITY,
        expansion_add: DEFAULT_EXPANSION_ADD,
        expansion_search: DEFAULT_EXPANSION_SEARCH,
        multi: false,
    }
}

#[derive(Serialize, Deserialize)]
struct SidecarMetadata {
    dimensions: usize,
    key_to_id: HashMap<String, u64>,
    next_id: u64,
    metadata: HashMap<String, HashMap<String, String>>,
}

/// Graph-based approximate index. Each record's string id is mapped to a
/// dense `u64` key internally; metadata lives in a side table since
/// `usearch` only stores vectors.
pub struct HnswStore {
    index: Index,
    dimensions: usize,
    key_to_id: HashMap<String, u64>,
    id_to_key: HashMap<u64, String>,
    metadata: HashMap<String, HashMap<String, String>>,
    next_id: u64,
}

impl HnswStore {
    pub fn new(dimensions: usize) -> Result<Self, VectorStoreError> {
        let index = Index::new(&index_options(dimensions))
            .map_err(|e| VectorStoreError::IndexCreation(e.to_string()))?;
        index
            .reserve(16)
            .map_err(|e| VectorStoreError::IndexCreation(e.to_string()))?;

        Ok(Self {
            index,
            dimensions,
            key_to_id: HashMap::new(),
            id_to_key: HashMap::new(),
            metadata: HashMap::new(),
            next_id: 0,
        })
    }

    /// Open a store previously persisted via [`VectorStore::save`], or
    /// create a fresh empty one if `dir` has no index file yet.
    pub fn open(dir: &Path, dimensions: usize) -> Result<Self, VectorStoreError> {
        let index_path = dir.join("hnsw_index.usearch");
        let sidecar_path = dir.join("hnsw_sidecar.json");

        if !index_path.exists() || !sidecar_path.exists() {
            return Self::new(dimensions);
        }

        let sidecar_bytes = match std::fs::read(&sidecar_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "hnsw sidecar unreadable, starting empty");
                return Self::new(dimensions);
            }
        };

        let sidecar: SidecarMetadata = match serde_json::from_slice(&sidecar_bytes) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "hnsw sidecar malformed, starting empty (corrupt files left on disk)");
                return Self::new(dimensions);
            }
        };

        let index = match Index::new(&index_options(sidecar.dimensions)) {
            Ok(idx) => idx,
            Err(e) => return Err(VectorStoreError::IndexCreation(e.to_string())),
        };

        let path_str = index_path
            .to_str()
            .ok_or_else(|| VectorStoreError::IndexPersistence("non-UTF8 index path".to_string()))?;

        if let Err(e) = index.load(path_str) {
            tracing::warn!(error = %e, "hnsw index file corrupt, starting empty (corrupt files left on disk)");
            return Self::new(dimensions);
        }

        let id_to_key = sidecar.key_to_id.iter().map(|(k, &v)| (v, k.clone())).collect();

        Ok(Self {
            index,
            dimensions: sidecar.dimensions,
            key_to_id: sidecar.key_to_id,
            id_to_key,
            metadata: sidecar.metadata,
            next_id: sidecar.next_id,
        })
    }

    fn reserve_for(&self, additional: usize) -> Result<(), VectorStoreError> {
        let needed = self.index.size() + additional;
        if needed > self.index.capacity() {
            let new_capacity = std::cmp::max(self.index.capacity() * 2, needed);
            self.index
                .reserve(new_capacity)
                .map_err(|e| VectorStoreError::IndexAdd(e.to_string()))?;
        }
        Ok(())
    }
}

impl VectorStore for HnswStore {
    fn add(&mut self, records: Vec<VectorRecord>) -> Result<(), VectorStoreError> {
        for record in &records {
            if record.embedding.len() != self.dimensions {
                return Err(VectorStoreError::InvalidDimensions {
                    expected: self.dimensions,
                    got: record.embedding.len(),
                });
            }
            if self.key_to_id.contains_key(&record.id) {
                return Err(VectorStoreError::DuplicateId(record.id.clone()));
            }
        }

        self.reserve_for(records.len())?;

        for record in records {
            let id = self.next_id;
            self.index
                .add(id, &record.embedding)
                .map_err(|e| VectorStoreError::IndexAdd(e.to_string()))?;
            self.key_to_id.insert(record.id.clone(), id);
            self.id_to_key.insert(id, record.id.clone());
            self.metadata.insert(record.id, record.metadata);
            self.next_id += 1;
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

        if self.index.size() == 0 || k == 0 {
            return Ok(Vec::new());
        }

        let fetch_limit = if filter.is_empty() {
            k
        } else {
            (k * FILTER_OVERFETCH_FACTOR).max(k).min(self.index.size())
        };

        let results = self
            .index
            .search(query, fetch_limit)
            .map_err(|e| VectorStoreError::IndexSearch(e.to_string()))?;

        let mut scored: Vec<(u64, f32)> = results
            .keys
            .iter()
            .zip(results.distances.iter())
            .map(|(&id, &distance)| (id, 1.0 - distance))
            .collect();

        // usearch already returns nearest-first, but ties may not follow
        // insertion order; re-sort with id (== insertion order) as the
        // stable tiebreaker the contract requires.
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(&b.0))
        });

        let mut hits = Vec::with_capacity(k.min(scored.len()));
        for (id, similarity) in scored {
            let Some(key) = self.id_to_key.get(&id) else { continue };
            let Some(metadata) = self.metadata.get(key) else { continue };
            if !metadata_matches(metadata, filter) {
                continue;
            }
            hits.push(SearchHit {
                id: key.clone(),
                metadata: metadata.clone(),
                similarity,
                distance: 1.0 - similarity,
            });
            if hits.len() >= k {
                break;
            }
        }

        Ok(hits)
    }

    fn count(&self) -> usize {
        self.index.size()
    }

    fn genres(&self) -> Vec<String> {
        let mut genres: Vec<String> =
            self.metadata.values().filter_map(|m| m.get("genre").cloned()).collect();
        genres.sort();
        genres.dedup();
        genres
    }

    fn clear(&mut self) -> Result<(), VectorStoreError> {
        let fresh = Index::new(&index_options(self.dimensions))
            .map_err(|e| VectorStoreError::IndexCreation(e.to_string()))?;
        fresh.reserve(16).map_err(|e| VectorStoreError::IndexCreation(e.to_string()))?;
        self.index = fresh;
        self.key_to_id.clear();
        self.id_to_key.clear();
        self.metadata.clear();
        self.next_id = 0;
        Ok(())
    }

    fn stats(&self) -> VectorStoreStats {
        VectorStoreStats { total_vectors: self.index.size(), dimensions: self.dimensions }
    }

    fn save(&self, dir: &Path) -> Result<(), VectorStoreError> {
        std::fs::create_dir_all(dir).map_err(|e| VectorStoreError::IndexPersistence(e.to_string()))?;

        let index_path = dir.join("hnsw_index.usearch");
        let index_path_str = index_path
            .to_str()
            .ok_or_else(|| VectorStoreError::IndexPersistence("non-UTF8 index path".to_string()))?;
        self.index.save(index_path_str).map_err(|e| VectorStoreError::IndexPersistence(e.to_string()))?;

        let sidecar = SidecarMetadata {
            dimensions: self.dimensions,
            key_to_id: self.key_to_id.clone(),
            next_id: self.next_id,
            metadata: self.metadata.clone(),
        };
        let bytes = serde_json::to_vec(&sidecar).map_err(|e| VectorStoreError::IndexPersistence(e.to_string()))?;

        let sidecar_path = dir.join("hnsw_sidecar.json");
        let tmp_path = dir.join("hnsw_sidecar.json.tmp");
        std::fs::write(&tmp_path, bytes).map_err(|e| VectorStoreError::IndexPersistence(e.to_string()))?;
        std::fs::rename(&tmp_path, &sidecar_path).map_err(|e| VectorStoreError::IndexPersistence(e.to_string()))?;

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
        let mut store = HnswStore::new(3).unwrap();
        store.add(vec![record("a", "pop", vec![1.0, 0.0, 0.0])]).unwrap();
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut store = HnswStore::new(3).unwrap();
        store.add(vec![record("a", "pop", vec![1.0, 0.0, 0.0])]).unwrap();
        let result = store.add(vec![record("a", "pop", vec![0.0, 1.0, 0.0])]);
        assert!(result.is_err());
    }

    #[test]
    fn invalid_dimensions_is_rejected() {
        let mut store = HnswStore::new(3).unwrap();
        let result = store.add(vec![record("a", "pop", vec![1.0, 0.0])]);
        assert!(result.is_err());
    }

    #[test]
    fn search_finds_exact_match_first() {
        let mut store = HnswStore::new(3).unwrap();
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
        let mut store = HnswStore::new(3).unwrap();
        store
            .add(vec![
                record("a", "pop", vec![1.0, 0.0, 0.0]),
                record("b", "rock", vec![0.9, 0.1, 0.0]),
                record("c", "pop", vec![0.8, 0.2, 0.0]),
            ])
            .unwrap();

        let mut filter = Filter::new();
        filter.insert("genre".to_string(), "pop".to_string());
        let results = store.search(&[1.0, 0.0, 0.0], 10, &filter).unwrap();
        assert!(results.iter().all(|h| h.metadata.get("genre") == Some(&"pop".to_string())));
    }

    #[test]
    fn clear_empties_the_store() {
        let mut store = HnswStore::new(3).unwrap();
        store.add(vec![record("a", "pop", vec![1.0, 0.0, 0.0])]).unwrap();
        store.clear().unwrap();
        assert_eq!(store.count(), 0);
        assert!(store.genres().is_empty());
    }

    #[test]
    fn save_and_reopen_preserves_records() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let mut store = HnswStore::new(3).unwrap();
        store
            .add(vec![
                record("a", "pop", vec![1.0, 0.0, 0.0]),
                record("b", "rock", vec![0.0, 1.0, 0.0]),
            ])
            .unwrap();
        store.save(tmp_dir.path()).unwrap();

        let reopened = HnswStore::open(tmp_dir.path(), 3).unwrap();
        assert_eq!(reopened.count(), 2);
        assert_eq!(reopened.genres(), vec!["pop".to_string(), "rock".to_string()]);
    }

    #[test]
    fn opening_missing_directory_yields_empty_store() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let store = HnswStore::open(tmp_dir.path(), 3).unwrap();
        assert_eq!(store.count(), 0);
    }
}
