//! Shared data structures exchanged between the core and its consumers.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Identifier for a configured library root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LibraryId(u64);

impl LibraryId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for LibraryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a catalogued book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(u64);

impl EntryId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Container kinds a book can be stored as. Determines which accessor
/// implementation handles the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerKind {
    Directory,
    Zip,
    Rar,
    SevenZip,
}

impl ContainerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContainerKind::Directory => "directory",
            ContainerKind::Zip => "zip",
            ContainerKind::Rar => "rar",
            ContainerKind::SevenZip => "7z",
        }
    }
}

/// Scan lifecycle state of a library root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanStatus {
    Idle,
    Scanning,
    Error(String),
}

/// Full rescan or existence-only check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Full,
    Quick,
}

/// A configured library: one filesystem tree of books.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryRoot {
    pub id: LibraryId,
    pub root: PathBuf,
    pub status: ScanStatus,
    /// Epoch seconds of the last completed scan.
    pub last_scan: Option<u64>,
    pub entry_count: u64,
    pub total_bytes: u64,
}

/// Persisted record for one book (directory or archive) inside a library.
///
/// The path is unique within its library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: EntryId,
    pub library_id: LibraryId,
    pub path: PathBuf,
    pub kind: ContainerKind,
    pub title: String,
    pub size_bytes: u64,
    pub page_count: u32,
    /// Filesystem modification time, epoch seconds.
    pub mtime: u64,
    pub created_at: u64,
    pub updated_at: u64,
}

/// Non-persisted handle to one page inside a container, produced on demand.
/// The ordinal equals the externally exposed page number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRef {
    pub container: PathBuf,
    pub entry: String,
    pub ordinal: u32,
}

/// Derived-asset flavours produced by the pipeline and tracked by the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetVariant {
    Thumbnail,
    Preview,
}

impl AssetVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            AssetVariant::Thumbnail => "thumbnail",
            AssetVariant::Preview => "preview",
        }
    }
}

/// Bookkeeping record for one cached derived asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub key: String,
    pub container: PathBuf,
    pub entry: String,
    pub variant: AssetVariant,
    pub file_path: PathBuf,
    pub size_bytes: u64,
    pub mime: String,
    pub access_count: u64,
    /// Epoch seconds.
    pub last_access: u64,
    /// Epoch seconds.
    pub expires_at: u64,
}

/// Reading position for one book. The record itself belongs to the CRUD
/// layer; the scanner only creates stubs, clamps, and deletes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingProgress {
    pub entry_id: EntryId,
    pub page: u32,
    pub updated: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Derived-asset cache sizing and expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub budget_mb: u64,
    pub expiry_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { budget_mb: 512, expiry_hours: 72 }
    }
}

impl CacheConfig {
    pub fn with_budget_mb(mut self, budget_mb: u64) -> Self {
        self.budget_mb = budget_mb;
        self
    }

    pub fn with_expiry_hours(mut self, expiry_hours: u64) -> Self {
        self.expiry_hours = expiry_hours;
        self
    }

    pub fn expiry_secs(&self) -> u64 {
        self.expiry_hours.saturating_mul(3_600)
    }
}

/// Behaviour flags for the library scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Skip dot-prefixed files and directories while walking.
    pub skip_hidden: bool,
    /// Recompute unit content even when size and mtime are unchanged.
    pub deep_scan: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { skip_hidden: true, deep_scan: false }
    }
}

/// Geometry and encoding parameters for derived assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Thumbnails are scaled to fill this box and centre-cropped.
    pub thumbnail_box: ImageDimensions,
    /// Previews fit within this box, never upscaled.
    pub preview_box: ImageDimensions,
    pub jpeg_quality: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            thumbnail_box: ImageDimensions { width: 300, height: 400 },
            preview_box: ImageDimensions { width: 1200, height: 1600 },
            jpeg_quality: 85,
        }
    }
}

/// Current wall-clock time as epoch seconds. All record timestamps use this
/// resolution uniformly.
pub fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}
