use crate::text::tokenize;
use drift_types::{GraphNode, InferenceStrategy, InferredConnection};
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Snapshot of inference cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
    pub capacity: usize,
}

/// Bounded store of unfiltered inference candidates.
///
/// Reads use `peek`, so entries are never promoted and the oldest insert is evicted first.
pub(crate) struct InferenceCache {
    entries: Mutex<LruCache<String, Vec<InferredConnection>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl InferenceCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// md5 over strategy, sorted node ids and the normalized query.
    pub fn key(strategy: InferenceStrategy, nodes: &[GraphNode], query: &str) -> String {
        let mut ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        let normalized: Vec<String> = tokenize(query).collect();
        let material = format!("{}\n{}\n{}", strategy, ids.join("\u{1f}"), normalized.join(" "));
        format!("{:x}", md5::compute(material.as_bytes()))
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, Vec<InferredConnection>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<Vec<InferredConnection>> {
        let found = self.lock().peek(key).cloned();
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub fn put(&self, key: String, value: Vec<InferredConnection>) {
        self.lock().put(key, value);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn resize(&self, capacity: NonZeroUsize) {
        let mut guard = self.lock();
        if guard.cap() != capacity {
            guard.resize(capacity);
        }
    }

    pub fn stats(&self) -> CacheStats {
        let guard = self.lock();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            len: guard.len(),
            capacity: guard.cap().get(),
        }
    }
}
