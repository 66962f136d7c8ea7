//! The derived-asset cache: keyed store with at-most-once computation,
//! expiry, and least-frequently/least-recently-used capacity eviction.
//!
//! An [`AssetCache`] is an explicitly constructed instance with an explicit
//! [`clear`](AssetCache::clear); nothing here is process-global.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::codec;
use crate::error::Error;
use crate::pipeline::ProcessedAsset;
use crate::stats::StatsCollector;
use crate::store::{CacheAggregate, CacheFilter, CacheIndex};
use crate::types::{AssetVariant, CacheConfig, CacheRecord, now_secs};

use super::Result;
use super::disk::{self, DiskCache};
use super::memory::{HotEntry, MemoryCache};

const HOT_LAYER_BYTES: usize = 32 * 1024 * 1024;
const BYTES_PER_MB: u64 = 1_048_576;

/// Asset bytes plus mime as served to a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAsset {
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// One in-flight computation; followers block until the leader finishes.
#[derive(Debug, Default)]
struct Flight {
    done: Mutex<bool>,
    ready: Condvar,
}

impl Flight {
    fn wait(&self) {
        let mut done = self.done.lock();
        while !*done {
            self.ready.wait(&mut done);
        }
    }

    fn finish(&self) {
        *self.done.lock() = true;
        self.ready.notify_all();
    }
}

enum FlightRole {
    Leader(Arc<Flight>),
    Follower(Arc<Flight>),
}

/// Deterministic cache key for one (container, entry, variant) unit.
pub fn key_for(container: &Path, entry: &str, variant: AssetVariant) -> String {
    format!("{}::{}::{}", container.display(), entry, variant.as_str())
}

#[derive(Debug)]
pub struct AssetCache {
    disk: DiskCache,
    index: CacheIndex,
    hot: Mutex<MemoryCache>,
    inflight: Mutex<HashMap<String, Arc<Flight>>>,
    config: CacheConfig,
    stats: Arc<StatsCollector>,
}

impl AssetCache {
    pub fn new(
        root: impl Into<std::path::PathBuf>,
        config: CacheConfig,
        stats: Arc<StatsCollector>,
    ) -> Result<Self> {
        Ok(Self {
            disk: DiskCache::new(root)?,
            index: CacheIndex::new(),
            hot: Mutex::new(MemoryCache::new(HOT_LAYER_BYTES)),
            inflight: Mutex::new(HashMap::new()),
            config,
            stats,
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Serve the asset for `(container, entry, variant)`, computing it at
    /// most once per key under concurrent misses.
    ///
    /// A hit bumps the record's access count and last-access time without
    /// invoking `compute`. On a miss the first caller becomes the leader and
    /// runs `compute`; concurrent callers for the same key block on the
    /// in-flight result and re-read the stored record. A failed computation
    /// is not cached; the next caller retries.
    pub fn get_or_create<F>(
        &self,
        container: &Path,
        entry: &str,
        variant: AssetVariant,
        compute: F,
    ) -> Result<CachedAsset>
    where
        F: FnOnce() -> Result<ProcessedAsset>,
    {
        let key = key_for(container, entry, variant);
        let mut compute = Some(compute);

        loop {
            if let Some(record) = self.index.touch(&key, now_secs()) {
                self.stats.record_cache_lookup(true);
                return self.serve(&record);
            }

            let role = {
                let mut inflight = self.inflight.lock();
                match inflight.get(&key) {
                    Some(flight) => FlightRole::Follower(Arc::clone(flight)),
                    None => {
                        let flight = Arc::new(Flight::default());
                        inflight.insert(key.clone(), Arc::clone(&flight));
                        FlightRole::Leader(flight)
                    }
                }
            };

            match role {
                FlightRole::Follower(flight) => {
                    // Wait out the leader, then retry from the top; its
                    // stored record becomes a hit.
                    flight.wait();
                }
                FlightRole::Leader(flight) => {
                    self.stats.record_cache_lookup(false);
                    let compute = compute.take().expect("compute invoked once");
                    let outcome = compute()
                        .and_then(|asset| self.store(&key, container, entry, variant, asset));
                    self.inflight.lock().remove(&key);
                    flight.finish();
                    return outcome;
                }
            }
        }
    }

    fn serve(&self, record: &CacheRecord) -> Result<CachedAsset> {
        {
            let mut hot = self.hot.lock();
            if let Some(entry) = hot.get(&record.key) {
                return Ok(CachedAsset { bytes: entry.bytes.clone(), mime: entry.mime.clone() });
            }
        }

        match self.disk.read(&record.key)? {
            Some(bytes) => {
                let mime = record.mime.clone();
                self.hot
                    .lock()
                    .insert(record.key.clone(), HotEntry::new(bytes.clone(), mime.clone()));
                Ok(CachedAsset { bytes, mime })
            }
            // The entry raced a deletion: fail closed, never serve a
            // partial read.
            None => Err(Error::not_found(format!("cache entry {}", record.key))),
        }
    }

    fn store(
        &self,
        key: &str,
        container: &Path,
        entry: &str,
        variant: AssetVariant,
        asset: ProcessedAsset,
    ) -> Result<CachedAsset> {
        let file_path = self.disk.write(key, &asset.bytes)?;
        let now = now_secs();
        let mime = codec::detect(&asset.bytes).to_string();

        let record = CacheRecord {
            key: key.to_string(),
            container: container.to_path_buf(),
            entry: entry.to_string(),
            variant,
            file_path,
            size_bytes: asset.bytes.len() as u64,
            mime: mime.clone(),
            access_count: 1,
            last_access: now,
            expires_at: now + self.config.expiry_secs(),
        };
        self.index.insert(record)?;
        self.hot.lock().insert(key.to_string(), HotEntry::new(asset.bytes.clone(), mime.clone()));
        self.publish_usage();

        Ok(CachedAsset { bytes: asset.bytes, mime })
    }

    /// Delete every record whose expiry has passed. Returns how many were
    /// removed.
    pub fn expire_stale(&self) -> usize {
        let expired = self.index.find_expired(now_secs());
        for record in &expired {
            self.delete_record(record);
        }
        if !expired.is_empty() {
            debug!(target: "cache", count = expired.len(), "expired stale entries");
            self.publish_usage();
        }
        expired.len()
    }

    /// True when the stored bytes exceed the configured budget.
    pub fn needs_cleanup(&self) -> bool {
        self.index.total_bytes() / BYTES_PER_MB > self.config.budget_mb
    }

    /// Evict up to `limit` entries, least-frequently then least-recently
    /// used first. Returns how many were removed.
    pub fn cleanup(&self, limit: usize) -> usize {
        let victims = self.index.find_for_cleanup(limit);
        for record in &victims {
            self.delete_record(record);
        }
        if !victims.is_empty() {
            debug!(target: "cache", count = victims.len(), "evicted for capacity");
            self.publish_usage();
        }
        victims.len()
    }

    pub fn delete_by_key(&self, key: &str) -> bool {
        match self.index.get(key) {
            Some(record) => {
                self.delete_record(&record);
                self.publish_usage();
                true
            }
            None => false,
        }
    }

    pub fn delete_by_variant(&self, variant: AssetVariant) -> usize {
        self.delete_matching(&CacheFilter::default().variant(variant))
    }

    /// Drop every asset derived from one container.
    pub fn delete_for_container(&self, container: &Path) -> usize {
        self.delete_matching(&CacheFilter::default().container(container))
    }

    pub fn delete_by_mime(&self, mime: &str) -> usize {
        self.delete_matching(&CacheFilter::default().mime(mime))
    }

    fn delete_matching(&self, filter: &CacheFilter) -> usize {
        let matched = self.index.list(filter);
        for record in &matched {
            self.delete_record(record);
        }
        if !matched.is_empty() {
            self.publish_usage();
        }
        matched.len()
    }

    pub fn list(&self, filter: &CacheFilter) -> Vec<CacheRecord> {
        self.index.list(filter)
    }

    pub fn aggregates(&self) -> Vec<CacheAggregate> {
        self.index.aggregates()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.index.total_bytes()
    }

    /// Drop all records, backing files, and hot entries.
    pub fn clear(&self) -> usize {
        let records = self.index.clear();
        for record in &records {
            if let Err(err) = disk::remove_file(&record.file_path) {
                warn!(target: "cache", key = record.key.as_str(), "file delete failed: {err}");
            }
        }
        self.hot.lock().clear();
        self.publish_usage();
        records.len()
    }

    fn delete_record(&self, record: &CacheRecord) {
        // Backing file first, best effort; the record always goes.
        if let Err(err) = disk::remove_file(&record.file_path) {
            warn!(target: "cache", key = record.key.as_str(), "file delete failed: {err}");
        }
        self.index.remove(&record.key);
        self.hot.lock().remove(&record.key);
    }

    fn publish_usage(&self) {
        self.stats.update_cache_usage(self.index.total_bytes(), self.index.len() as u64);
    }
}
