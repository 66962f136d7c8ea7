//! Derived-asset cache: disk backing, hot memory layer, and the service
//! that ties them to the record index.

pub mod disk;
pub mod memory;
pub mod service;

pub use disk::DiskCache;
pub use memory::{HotEntry, MemoryCache};
pub use service::{AssetCache, CachedAsset, key_for};

pub type Result<T> = crate::Result<T>;
