// In-memory record store and the per-session handle that swaps it on upload.
//
// A `RecordStore` is read-only after construction and cheap to clone (the
// records sit behind an `Arc`), so recomputations can hold a snapshot while a
// new upload replaces the session's current store.
use crate::error::Result;
use crate::loader::{self, LoadOptions, LoadReport, SourceFormat};
use crate::types::{Record, Schema};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct RecordStore {
    schema: Schema,
    records: Arc<[Record]>,
}

impl RecordStore {
    pub fn new(schema: Schema, records: Vec<Record>) -> Self {
        RecordStore {
            schema,
            records: records.into(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

const MAX_CACHED_LOADS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    digest: Vec<u8>,
    format: SourceFormat,
    opts: LoadOptions,
}

#[derive(Debug)]
struct CachedLoad {
    store: Arc<RecordStore>,
    report: LoadReport,
    last_used: u64,
}

#[derive(Debug, Default)]
struct LoadCache {
    entries: HashMap<CacheKey, CachedLoad>,
    tick: u64,
}

impl LoadCache {
    fn get(&mut self, key: &CacheKey) -> Option<(Arc<RecordStore>, LoadReport)> {
        self.tick += 1;
        let tick = self.tick;
        self.entries.get_mut(key).map(|entry| {
            entry.last_used = tick;
            (entry.store.clone(), entry.report.clone())
        })
    }

    fn insert(&mut self, key: CacheKey, store: Arc<RecordStore>, report: LoadReport) {
        if self.entries.len() >= MAX_CACHED_LOADS && !self.entries.contains_key(&key) {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                self.entries.remove(&oldest);
            }
        }
        self.tick += 1;
        let last_used = self.tick;
        self.entries.insert(
            key,
            CachedLoad {
                store,
                report,
                last_used,
            },
        );
    }
}

#[derive(Debug, Default)]
pub struct Session {
    current: RwLock<Option<Arc<RecordStore>>>,
    cache: Mutex<LoadCache>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the active store, if anything has been loaded.
    pub fn current(&self) -> Option<Arc<RecordStore>> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }

    /// Make `store` the active dataset. Existing snapshots stay valid.
    pub fn replace(&self, store: Arc<RecordStore>) {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(store);
    }

    pub fn load_path(&self, path: &Path, opts: &LoadOptions) -> Result<(Arc<RecordStore>, LoadReport)> {
        let format = SourceFormat::from_path(path)?;
        let bytes = std::fs::read(path)?;
        self.load_bytes(&bytes, format, opts)
    }

    /// Load a dataset and make it current. Identical bytes (with the same
    /// options) reuse the previously parsed store instead of parsing again.
    pub fn load_bytes(
        &self,
        bytes: &[u8],
        format: SourceFormat,
        opts: &LoadOptions,
    ) -> Result<(Arc<RecordStore>, LoadReport)> {
        let key = CacheKey {
            digest: Sha256::digest(bytes).to_vec(),
            format,
            opts: opts.clone(),
        };

        let cached = self.cache.lock().unwrap_or_else(|e| e.into_inner()).get(&key);
        let (store, report) = match cached {
            Some(hit) => {
                debug!(rows = hit.0.len(), "dataset unchanged, reusing parsed store");
                hit
            }
            None => {
                let (store, report) = loader::load_bytes(bytes, format, opts)?;
                let store = Arc::new(store);
                let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
                cache.insert(key, store.clone(), report.clone());
                (store, report)
            }
        };

        self.replace(store.clone());
        info!(rows = store.len(), "session dataset replaced");
        Ok((store, report))
    }
}
