mod persist;

use crate::config::Config;
use crate::embed::{self, Embedder};
use crate::vector::persist::{CollectionLayout, Manifest, Record};
use anyhow::Context;
use hnsw_rs::prelude::*;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

/// Contract between the search engine and whatever holds the embedded
/// documents. `query` must return an empty list, not an error, when the store
/// is empty.
pub trait DocumentStore: Send + Sync {
    fn count(&self) -> Result<usize, VectorError>;
    fn query(&self, text: &str, k: usize) -> Result<Vec<StoreHit>, VectorError>;
    fn add(
        &self,
        id: &str,
        document: String,
        metadata: serde_json::Value,
    ) -> Result<(), VectorError>;
    fn reset(&self) -> Result<(), VectorError>;

    /// Documents whose metadata `field` equals one of `values` (ASCII case
    /// ignored), nearest to `text` first. Stores that cannot look up metadata
    /// return nothing and leave ranking to `query`.
    fn lookup(
        &self,
        text: &str,
        field: &str,
        values: &[String],
    ) -> Result<Vec<StoreHit>, VectorError> {
        let _ = (text, field, values);
        Ok(Vec::new())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreHit {
    pub id: String,
    pub document: String,
    pub metadata: serde_json::Value,
    /// Cosine distance, lower is closer.
    pub distance: f32,
}

#[derive(Debug, thiserror::Error)]
pub enum VectorError {
    #[error("id already exists")]
    IdExists,
    #[error("vector dim mismatch")]
    DimMismatch,
    #[error("invalid collection manifest")]
    InvalidManifest,
    #[error("persistence error")]
    Persistence,
}

#[derive(Clone, Copy, Debug)]
pub struct IndexParams {
    pub max_conn: usize,
    pub ef_construction: usize,
    pub bruteforce_limit: usize,
    pub segment_max_items: usize,
}

impl IndexParams {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_conn: config.hnsw_max_conn,
            ef_construction: config.hnsw_ef_construction,
            bruteforce_limit: config.bruteforce_limit,
            segment_max_items: config.segment_max_items,
        }
    }
}

impl Default for IndexParams {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// HNSW-backed flight collection. Cheap to clone; all clones share the same
/// collection.
#[derive(Clone)]
pub struct VectorStore(Arc<Inner>);

struct Inner {
    embedder: Arc<dyn Embedder>,
    layout: Option<CollectionLayout>,
    params: IndexParams,
    collection: RwLock<Collection>,
}

#[derive(Clone, Debug)]
pub struct StoredDocument {
    pub vector: Vec<f32>,
    pub document: String,
    pub metadata: serde_json::Value,
}

struct Collection {
    manifest: Manifest,
    items: HashMap<String, StoredDocument>,
    segments: Vec<SegmentIndex>,
}

struct SegmentIndex {
    hnsw: Hnsw<'static, f32, anndists::dist::distances::DistCosine>,
    id_by_data_id: Vec<String>,
    capacity: usize,
}

impl SegmentIndex {
    fn new(params: &IndexParams) -> Self {
        let capacity = params.segment_max_items.max(1);
        Self {
            hnsw: Hnsw::<f32, anndists::dist::distances::DistCosine>::new(
                params.max_conn,
                capacity.max(1024),
                16,
                params.ef_construction,
                anndists::dist::distances::DistCosine {},
            ),
            id_by_data_id: Vec::new(),
            capacity,
        }
    }

    fn is_full(&self) -> bool {
        self.id_by_data_id.len() >= self.capacity
    }

    fn insert(&mut self, id: String, vector: &[f32]) {
        let data_id = self.id_by_data_id.len();
        self.id_by_data_id.push(id);
        self.hnsw.insert((vector, data_id));
    }

    fn search_candidates(&self, query: &[f32], candidate_k: usize) -> Vec<(String, f32)> {
        if self.id_by_data_id.is_empty() {
            return Vec::new();
        }
        let ef = candidate_k.saturating_mul(2).clamp(50, 10_000);
        self.hnsw
            .search(query, candidate_k, ef)
            .into_iter()
            .filter_map(|n| {
                self.id_by_data_id
                    .get(n.d_id)
                    .map(|id| (id.clone(), n.distance))
            })
            .collect()
    }
}

impl VectorStore {
    pub fn new(embedder: Arc<dyn Embedder>, params: IndexParams) -> Self {
        let manifest = Manifest::new(embedder.dim());
        let collection = Collection::new(manifest, HashMap::new(), &params);
        Self(Arc::new(Inner {
            embedder,
            layout: None,
            params,
            collection: RwLock::new(collection),
        }))
    }

    /// Opens (or creates) `<data_dir>/vectors/<name>` and rebuilds the index
    /// from its record log.
    pub fn open(
        data_dir: impl AsRef<Path>,
        name: &str,
        embedder: Arc<dyn Embedder>,
        params: IndexParams,
    ) -> anyhow::Result<Self> {
        let vectors_dir = data_dir.as_ref().join("vectors");
        std::fs::create_dir_all(&vectors_dir)?;
        let layout = CollectionLayout::new(&vectors_dir, name);
        persist::init_collection(&layout, embedder.dim())
            .with_context(|| format!("init vector collection {name}"))?;
        let (manifest, items) = persist::load_collection(&layout)
            .with_context(|| format!("load vector collection {name}"))?;
        if manifest.dim != embedder.dim() {
            return Err(VectorError::InvalidManifest).with_context(|| {
                format!(
                    "collection {name} was built with dim {} but the embedder produces {}",
                    manifest.dim,
                    embedder.dim()
                )
            });
        }
        tracing::info!(collection = name, documents = items.len(), "opened vector collection");
        let collection = Collection::new(manifest, items, &params);
        Ok(Self(Arc::new(Inner {
            embedder,
            layout: Some(layout),
            params,
            collection: RwLock::new(collection),
        })))
    }

    pub fn get(&self, id: &str) -> Option<StoredDocument> {
        self.0.collection.read().items.get(id).cloned()
    }
}

impl DocumentStore for VectorStore {
    fn count(&self) -> Result<usize, VectorError> {
        Ok(self.0.collection.read().items.len())
    }

    fn query(&self, text: &str, k: usize) -> Result<Vec<StoreHit>, VectorError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let query = self.0.embedder.embed(text);
        let c = self.0.collection.read();
        c.search(&query, k, &self.0.params)
    }

    fn lookup(
        &self,
        text: &str,
        field: &str,
        values: &[String],
    ) -> Result<Vec<StoreHit>, VectorError> {
        if values.is_empty() {
            return Ok(Vec::new());
        }
        let query = self.0.embedder.embed(text);
        let c = self.0.collection.read();
        Ok(c.lookup(&query, field, values))
    }

    fn add(
        &self,
        id: &str,
        document: String,
        metadata: serde_json::Value,
    ) -> Result<(), VectorError> {
        let vector = self.0.embedder.embed(&document);
        let mut c = self.0.collection.write();
        if c.items.contains_key(id) {
            return Err(VectorError::IdExists);
        }
        if vector.len() != c.manifest.dim {
            return Err(VectorError::DimMismatch);
        }
        let record = Record {
            id: id.to_string(),
            vector,
            document,
            metadata,
        };
        if let Some(layout) = &self.0.layout {
            let appended = persist::append_record(layout, &record, c.manifest.file_len)
                .map_err(|err| {
                    tracing::error!(id, error = %err, "record append failed");
                    VectorError::Persistence
                })?;
            c.manifest.file_len = c.manifest.file_len.saturating_add(appended);
        }
        c.insert(record, &self.0.params);
        // the log is authoritative; counts are recomputed on open
        if let Some(layout) = &self.0.layout {
            if let Err(err) = persist::store_manifest(layout, &c.manifest) {
                tracing::warn!(error = %err, "manifest not updated");
            }
        }
        Ok(())
    }

    /// Wipes every document. The empty collection is built first and swapped
    /// in under the write lock, so readers see either the old or the new one.
    fn reset(&self) -> Result<(), VectorError> {
        let mut c = self.0.collection.write();
        let manifest = Manifest::new(c.manifest.dim);
        if let Some(layout) = &self.0.layout {
            persist::truncate_collection(layout, &manifest)
                .map_err(|_| VectorError::Persistence)?;
        }
        *c = Collection::new(manifest, HashMap::new(), &self.0.params);
        tracing::info!("vector collection reset");
        Ok(())
    }
}

impl Collection {
    fn new(manifest: Manifest, items: HashMap<String, StoredDocument>, params: &IndexParams) -> Self {
        let mut c = Self {
            manifest,
            items,
            segments: Vec::new(),
        };
        c.rebuild_segments(params);
        c.manifest.live_count = c.items.len();
        c
    }

    fn rebuild_segments(&mut self, params: &IndexParams) {
        self.segments.clear();
        let mut ids: Vec<&String> = self.items.keys().collect();
        ids.sort();
        let mut current = SegmentIndex::new(params);
        for id in ids {
            if current.is_full() {
                self.segments.push(current);
                current = SegmentIndex::new(params);
            }
            current.insert(id.clone(), &self.items[id].vector);
        }
        self.segments.push(current);
    }

    fn insert(&mut self, record: Record, params: &IndexParams) {
        let needs_segment = self.segments.last().map_or(true, |s| s.is_full());
        if needs_segment {
            self.segments.push(SegmentIndex::new(params));
        }
        if let Some(seg) = self.segments.last_mut() {
            seg.insert(record.id.clone(), &record.vector);
        }
        self.items.insert(
            record.id,
            StoredDocument {
                vector: record.vector,
                document: record.document,
                metadata: record.metadata,
            },
        );
        self.manifest.live_count = self.items.len();
        self.manifest.total_records = self.manifest.total_records.saturating_add(1);
    }

    fn search(
        &self,
        query: &[f32],
        k: usize,
        params: &IndexParams,
    ) -> Result<Vec<StoreHit>, VectorError> {
        if query.len() != self.manifest.dim {
            return Err(VectorError::DimMismatch);
        }
        if self.items.is_empty() {
            return Ok(Vec::new());
        }
        if self.items.len() <= params.bruteforce_limit || embed::is_zero(query) {
            return Ok(self.search_bruteforce(query, k));
        }

        let candidate_k = (k * 2).min(self.items.len()).max(k);
        let mut combined = Vec::new();
        for segment in &self.segments {
            combined.extend(segment.search_candidates(query, candidate_k));
        }
        combined.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        let mut hits = Vec::new();
        let mut seen = HashSet::new();
        for (id, distance) in combined {
            if !seen.insert(id.clone()) {
                continue;
            }
            if let Some(hit) = self.hit(&id, distance) {
                hits.push(hit);
            }
            if hits.len() >= k {
                break;
            }
        }
        Ok(hits)
    }

    fn search_bruteforce(&self, query: &[f32], k: usize) -> Vec<StoreHit> {
        let scored = self
            .items
            .iter()
            .map(|(id, item)| (id, embed::cosine_distance(query, &item.vector)))
            .collect();
        self.ranked(scored, k)
    }

    fn lookup(&self, query: &[f32], field: &str, values: &[String]) -> Vec<StoreHit> {
        let scored: Vec<(&String, f32)> = self
            .items
            .iter()
            .filter(|(_, item)| {
                item.metadata
                    .get(field)
                    .and_then(|v| v.as_str())
                    .is_some_and(|v| values.iter().any(|want| want.eq_ignore_ascii_case(v)))
            })
            .map(|(id, item)| (id, embed::cosine_distance(query, &item.vector)))
            .collect();
        let k = scored.len();
        self.ranked(scored, k)
    }

    fn ranked(&self, mut scored: Vec<(&String, f32)>, k: usize) -> Vec<StoreHit> {
        scored.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        scored
            .into_iter()
            .take(k)
            .filter_map(|(id, distance)| self.hit(id, distance))
            .collect()
    }

    fn hit(&self, id: &str, distance: f32) -> Option<StoreHit> {
        let item = self.items.get(id)?;
        Some(StoreHit {
            id: id.to_string(),
            document: item.document.clone(),
            metadata: item.metadata.clone(),
            distance,
        })
    }
}
