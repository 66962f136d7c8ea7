//! Core library for the comic shelf: catalogs trees of books stored as
//! directories or archives, keeps the catalog in sync with the filesystem,
//! and serves pages as processed images through a derived-asset cache.

#![deny(missing_debug_implementations)]

pub mod cache;
pub mod catalog;
pub mod codec;
pub mod error;
pub mod fs;
pub mod log;
pub mod pages;
pub mod pipeline;
pub mod stats;
pub mod store;
pub mod types;

pub use error::Error;

pub type Result<T> = std::result::Result<T, Error>;

pub use types::{
    AssetVariant, CacheConfig, CacheRecord, CatalogEntry, ContainerKind, EntryId, ImageDimensions,
    LibraryId, LibraryRoot, PageRef, PipelineConfig, ReadingProgress, ScanConfig, ScanMode,
    ScanStatus,
};

/// Returns the version of the core crate for telemetry and debugging.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
