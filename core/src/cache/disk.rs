//! Disk backing store for derived assets, sharded by key hash.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::Error;

use super::Result;

const SHARD_LEN: usize = 2;

/// Content files live under `root` in a two-level sharded layout derived
/// from the blake3 hash of the cache key.
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    /// Create or reuse a disk cache rooted at the provided path.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|err| Error::io(&root, err))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic on-disk location for a cache key.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let hash = blake3::hash(key.as_bytes());
        let hex = hash.to_hex();
        let hex = hex.as_str();

        let (shard_one, rest) = hex.split_at(SHARD_LEN);
        let (shard_two, rest) = rest.split_at(SHARD_LEN);
        self.root.join(shard_one).join(shard_two).join(format!("{rest}.bin"))
    }

    /// Read cached bytes, `None` when the file does not exist (a racing
    /// eviction may have removed it).
    pub fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::io(path, err)),
        }
    }

    /// Persist bytes atomically, returning the final path.
    pub fn write(&self, key: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(key);
        let parent = path
            .parent()
            .ok_or_else(|| Error::Validation(format!("{} has no parent", path.display())))?;
        fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;

        let mut temp = NamedTempFile::new_in(parent).map_err(|err| Error::io(parent, err))?;
        temp.write_all(bytes).map_err(|err| Error::io(&path, err))?;
        temp.flush().map_err(|err| Error::io(&path, err))?;
        temp.persist(&path).map_err(|err| Error::io(&path, err.error))?;
        Ok(path)
    }

    /// Remove the file for a key; missing files are fine.
    pub fn remove(&self, key: &str) -> Result<()> {
        remove_file(&self.path_for(key))
    }
}

/// Best-effort file removal used when deleting by stored record path.
pub fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(Error::io(path, err)),
    }
}
