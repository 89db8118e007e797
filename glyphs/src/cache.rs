//! Feature vector cache keyed by image identity and grid resolution.
//!
//! Entries are never evicted one at a time. Invalidation swaps the whole map
//! for a new generation under the write lock, so readers observe either the
//! old generation or the new one. Inserts computed against an older
//! generation are dropped.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::vector::FeatureVector;

/// Cache key: one vector per image per grid resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Image identifier.
    pub image_id: String,

    /// Grid resolution.
    pub grid: u32,
}

impl CacheKey {
    /// Create a new key.
    pub fn new(image_id: impl Into<String>, grid: u32) -> Self {
        Self {
            image_id: image_id.into(),
            grid,
        }
    }
}

/// A full set of entries, as staged by a clustering run.
pub type CacheEntries = HashMap<CacheKey, Arc<FeatureVector>>;

#[derive(Default)]
struct Generation {
    id: u64,
    entries: CacheEntries,
}

/// Shared cache of extracted feature vectors.
#[derive(Default)]
pub struct FeatureCache {
    state: RwLock<Generation>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl FeatureCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current generation number. Bumped by every invalidation.
    pub fn generation(&self) -> u64 {
        self.state.read().id
    }

    /// Look up a vector, recording a hit or miss.
    pub fn get(&self, image_id: &str, grid: u32) -> Option<Arc<FeatureVector>> {
        let key = CacheKey::new(image_id, grid);
        let found = self.state.read().entries.get(&key).cloned();
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store a vector computed while `generation` was current.
    ///
    /// Returns `false` and drops the vector if the cache was invalidated in
    /// the meantime.
    pub fn insert(&self, generation: u64, key: CacheKey, vector: Arc<FeatureVector>) -> bool {
        let mut state = self.state.write();
        if state.id != generation {
            debug!(
                "Dropping vector for {} computed against stale generation {generation}",
                key.image_id
            );
            return false;
        }
        state.entries.insert(key, vector);
        true
    }

    /// Check if a vector is cached, without touching hit/miss counters.
    pub fn contains(&self, image_id: &str, grid: u32) -> bool {
        self.state
            .read()
            .entries
            .contains_key(&CacheKey::new(image_id, grid))
    }

    /// Number of cached vectors.
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Whether the cache holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// Drop every entry and start a new generation.
    pub fn invalidate(&self) {
        self.replace(CacheEntries::new());
    }

    /// Swap in a complete set of entries as a new generation.
    pub fn replace(&self, entries: CacheEntries) {
        let count = entries.len();
        let mut state = self.state.write();
        let next = state.id + 1;
        let previous = std::mem::replace(
            &mut *state,
            Generation {
                id: next,
                entries,
            },
        );
        drop(state);
        info!(
            "Feature cache generation {next}: {count} entries (replaced {})",
            previous.entries.len()
        );
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let state = self.state.read();
        CacheStats {
            entries: state.entries.len(),
            generation: state.id,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            grids: state
                .entries
                .keys()
                .map(|k| k.grid)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
        }
    }
}

/// Statistics about the feature cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of entries in cache.
    pub entries: usize,

    /// Current generation.
    pub generation: u64,

    /// Lookups that found a vector.
    pub hits: u64,

    /// Lookups that missed.
    pub misses: u64,

    /// Grid resolutions with cached vectors.
    pub grids: Vec<u32>,
}
