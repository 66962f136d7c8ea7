//! Record store for cached derived assets.
//!
//! Holds one [`CacheRecord`] per cache key and answers the eviction and
//! administration queries. File contents live in the disk cache; deleting a
//! record and its backing file together is the cache service's job.

use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::error::Error;
use crate::types::{AssetVariant, CacheRecord};

use super::Result;

/// Record filter for the administrative listing queries. Unset fields match
/// everything.
#[derive(Debug, Clone, Default)]
pub struct CacheFilter {
    pub variant: Option<AssetVariant>,
    pub container: Option<PathBuf>,
    pub mime: Option<String>,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    pub min_access: Option<u64>,
    pub max_access: Option<u64>,
}

impl CacheFilter {
    pub fn variant(mut self, variant: AssetVariant) -> Self {
        self.variant = Some(variant);
        self
    }

    pub fn container(mut self, container: impl Into<PathBuf>) -> Self {
        self.container = Some(container.into());
        self
    }

    pub fn mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    pub fn size_range(mut self, min: Option<u64>, max: Option<u64>) -> Self {
        self.min_size = min;
        self.max_size = max;
        self
    }

    pub fn access_range(mut self, min: Option<u64>, max: Option<u64>) -> Self {
        self.min_access = min;
        self.max_access = max;
        self
    }

    fn matches(&self, record: &CacheRecord) -> bool {
        if let Some(variant) = self.variant {
            if record.variant != variant {
                return false;
            }
        }
        if let Some(container) = &self.container {
            if &record.container != container {
                return false;
            }
        }
        if let Some(mime) = &self.mime {
            if &record.mime != mime {
                return false;
            }
        }
        if self.min_size.is_some_and(|min| record.size_bytes < min) {
            return false;
        }
        if self.max_size.is_some_and(|max| record.size_bytes > max) {
            return false;
        }
        if self.min_access.is_some_and(|min| record.access_count < min) {
            return false;
        }
        if self.max_access.is_some_and(|max| record.access_count > max) {
            return false;
        }
        true
    }
}

/// Per-variant aggregate returned by [`CacheIndex::aggregates`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CacheAggregate {
    pub variant: AssetVariant,
    pub count: u64,
    pub bytes: u64,
}

#[derive(Debug, Default)]
pub struct CacheIndex {
    records: Mutex<HashMap<String, CacheRecord>>,
}

impl CacheIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh record. Keys are unique.
    pub fn insert(&self, record: CacheRecord) -> Result<()> {
        let mut records = self.records.lock();
        if records.contains_key(&record.key) {
            return Err(Error::Conflict(format!("cache key {} already present", record.key)));
        }
        records.insert(record.key.clone(), record);
        Ok(())
    }

    /// Hit bookkeeping: bump the access count and refresh last-access.
    pub fn touch(&self, key: &str, now: u64) -> Option<CacheRecord> {
        let mut records = self.records.lock();
        let record = records.get_mut(key)?;
        record.access_count += 1;
        record.last_access = now;
        Some(record.clone())
    }

    pub fn get(&self, key: &str) -> Option<CacheRecord> {
        self.records.lock().get(key).cloned()
    }

    pub fn remove(&self, key: &str) -> Option<CacheRecord> {
        self.records.lock().remove(key)
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.records.lock().values().map(|record| record.size_bytes).sum()
    }

    /// Records whose expiry has passed.
    pub fn find_expired(&self, now: u64) -> Vec<CacheRecord> {
        self.records.lock().values().filter(|record| record.expires_at <= now).cloned().collect()
    }

    /// Up to `limit` eviction candidates, least-frequently then
    /// least-recently used first.
    pub fn find_for_cleanup(&self, limit: usize) -> Vec<CacheRecord> {
        let mut candidates: Vec<CacheRecord> = self.records.lock().values().cloned().collect();
        candidates.sort_by_key(|record| (record.access_count, record.last_access));
        candidates.truncate(limit);
        candidates
    }

    pub fn list(&self, filter: &CacheFilter) -> Vec<CacheRecord> {
        let mut matched: Vec<CacheRecord> =
            self.records.lock().values().filter(|record| filter.matches(record)).cloned().collect();
        matched.sort_by(|a, b| a.key.cmp(&b.key));
        matched
    }

    pub fn aggregates(&self) -> Vec<CacheAggregate> {
        let records = self.records.lock();
        let mut by_variant: HashMap<AssetVariant, (u64, u64)> = HashMap::new();
        for record in records.values() {
            let slot = by_variant.entry(record.variant).or_default();
            slot.0 += 1;
            slot.1 += record.size_bytes;
        }

        let mut aggregates: Vec<CacheAggregate> = by_variant
            .into_iter()
            .map(|(variant, (count, bytes))| CacheAggregate { variant, count, bytes })
            .collect();
        aggregates.sort_by_key(|aggregate| aggregate.variant.as_str());
        aggregates
    }

    /// Drop every record, returning them so backing files can be removed.
    pub fn clear(&self) -> Vec<CacheRecord> {
        self.records.lock().drain().map(|(_, record)| record).collect()
    }
}

#[cfg(test)]
pub(crate) fn sample_record(key: &str, access: u64, last_access: u64) -> CacheRecord {
    CacheRecord {
        key: key.to_string(),
        container: PathBuf::from("/lib/book.cbz"),
        entry: "1.png".to_string(),
        variant: AssetVariant::Thumbnail,
        file_path: PathBuf::from("/cache").join(key),
        size_bytes: 100,
        mime: "image/jpeg".to_string(),
        access_count: access,
        last_access,
        expires_at: 1_000,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_unique() {
        let index = CacheIndex::new();
        index.insert(sample_record("k", 0, 0)).unwrap();
        let err = index.insert(sample_record("k", 0, 0)).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn touch_bumps_access_state() {
        let index = CacheIndex::new();
        index.insert(sample_record("k", 0, 0)).unwrap();

        let touched = index.touch("k", 42).unwrap();
        assert_eq!(touched.access_count, 1);
        assert_eq!(touched.last_access, 42);
        assert!(index.touch("missing", 42).is_none());
    }

    #[test]
    fn cleanup_order_is_access_count_then_recency() {
        let index = CacheIndex::new();
        index.insert(sample_record("cold-old", 1, 10)).unwrap();
        index.insert(sample_record("cold-new", 1, 20)).unwrap();
        index.insert(sample_record("hot", 9, 5)).unwrap();

        let victims = index.find_for_cleanup(2);
        let keys: Vec<&str> = victims.iter().map(|record| record.key.as_str()).collect();
        assert_eq!(keys, vec!["cold-old", "cold-new"]);
    }

    #[test]
    fn expiry_query_is_inclusive_of_past_deadlines() {
        let index = CacheIndex::new();
        let mut fresh = sample_record("fresh", 0, 0);
        fresh.expires_at = 2_000;
        index.insert(fresh).unwrap();
        index.insert(sample_record("stale", 0, 0)).unwrap();

        let expired = index.find_expired(1_500);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].key, "stale");
    }

    #[test]
    fn filters_compose() {
        let index = CacheIndex::new();
        let mut preview = sample_record("p", 3, 0);
        preview.variant = AssetVariant::Preview;
        preview.size_bytes = 900;
        index.insert(preview).unwrap();
        index.insert(sample_record("t", 1, 0)).unwrap();

        let filter = CacheFilter::default().variant(AssetVariant::Preview);
        assert_eq!(index.list(&filter).len(), 1);

        let filter = CacheFilter::default().size_range(Some(500), None).access_range(None, Some(5));
        let matched = index.list(&filter);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].key, "p");
    }

    #[test]
    fn aggregates_group_by_variant() {
        let index = CacheIndex::new();
        index.insert(sample_record("a", 0, 0)).unwrap();
        index.insert(sample_record("b", 0, 0)).unwrap();
        let mut preview = sample_record("c", 0, 0);
        preview.variant = AssetVariant::Preview;
        preview.size_bytes = 50;
        index.insert(preview).unwrap();

        let aggregates = index.aggregates();
        assert_eq!(aggregates.len(), 2);
        let thumbs =
            aggregates.iter().find(|aggregate| aggregate.variant == AssetVariant::Thumbnail);
        assert_eq!(thumbs.unwrap().count, 2);
        assert_eq!(thumbs.unwrap().bytes, 200);
    }
}
