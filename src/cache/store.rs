//! Mapping-routine cache storage.
//!
//! Bounded LRU keyed by gallery id. Reads past the TTL treat the entry as
//! absent; a refresh only ever happens through an explicit `put` from the
//! resolver, never through a read.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use lru::LruCache;
use metrics::counter;

use crate::domain::gallery::GalleryId;
use crate::domain::mapping::MappingRoutine;

use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

struct MappingEntry {
    routine: Arc<MappingRoutine>,
    inserted_at: Instant,
}

/// Bounded, time-expiring store of mapping routines.
pub struct MappingStore {
    ttl: Duration,
    entries: RwLock<LruCache<GalleryId, MappingEntry>>,
}

impl MappingStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            ttl: config.ttl(),
            entries: RwLock::new(LruCache::new(config.capacity_non_zero())),
        }
    }

    /// Look up the routine cached for `id`.
    ///
    /// Entries older than the TTL are absent regardless of capacity pressure.
    /// A hit refreshes recency, so frequently requested galleries outlive
    /// capacity eviction while the TTL check stays independent and
    /// authoritative. Never triggers a fetch.
    pub fn get(&self, id: &GalleryId) -> Option<Arc<MappingRoutine>> {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        match entries.get(id) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                counter!("vetrina_mapping_cache_hit_total").increment(1);
                return Some(entry.routine.clone());
            }
            Some(_) => {}
            None => {
                counter!("vetrina_mapping_cache_miss_total").increment(1);
                return None;
            }
        }

        // Stale: drop the entry so capacity is not held by dead weight.
        entries.pop(id);
        counter!("vetrina_mapping_cache_expired_total").increment(1);
        None
    }

    /// Insert or overwrite the routine for `id`, resetting its age to zero.
    /// Inserting a key past capacity evicts the least-recently-accessed entry.
    pub fn put(&self, id: GalleryId, routine: Arc<MappingRoutine>) {
        let entry = MappingEntry {
            routine,
            inserted_at: Instant::now(),
        };
        let evicted = rw_write(&self.entries, SOURCE, "put").push(id.clone(), entry);
        if let Some((evicted_id, _)) = evicted {
            // push also returns the old value on overwrite; only a different
            // key means a capacity eviction.
            if evicted_id != id {
                counter!("vetrina_mapping_cache_evict_total").increment(1);
            }
        }
    }

    /// Number of live entries, expired ones included until their next read.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
