//! Reading-progress records, persisted as a JSON file.
//!
//! The record content belongs to the CRUD layer; the scanner drives the
//! lifecycle side effects (stub on create, clamp on shrink, delete with the
//! entry), so the store lives here.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use directories::ProjectDirs;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::Error;
use crate::types::{EntryId, ReadingProgress, now_secs};

use super::Result;

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProgressFile {
    entries: HashMap<String, StoredProgress>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredProgress {
    page: u32,
    updated: u64,
}

/// File-backed progress store. The file is the source of truth; the mutex
/// serializes read-modify-write cycles.
#[derive(Debug)]
pub struct ProgressStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    /// Store rooted in the platform data directory.
    pub fn open_default() -> Result<Self> {
        let dirs = ProjectDirs::from("com", "ComicShelf", "comic-shelf").ok_or_else(|| {
            Error::Validation("unable to resolve application data directory".to_string())
        })?;
        let dir = dirs.data_dir().join("state");
        fs::create_dir_all(&dir).map_err(|err| Error::io(&dir, err))?;
        Ok(Self::new(dir.join("progress.json")))
    }

    /// Create a zero stub unless a record already exists.
    pub fn ensure_stub(&self, entry_id: EntryId) -> Result<()> {
        let _guard = self.lock.lock();
        let mut file = self.read_file()?;
        file.entries
            .entry(entry_id.to_string())
            .or_insert_with(|| StoredProgress { page: 0, updated: now_secs() });
        self.write_file(&file)
    }

    pub fn get(&self, entry_id: EntryId) -> Result<Option<ReadingProgress>> {
        let _guard = self.lock.lock();
        let file = self.read_file()?;
        Ok(file.entries.get(&entry_id.to_string()).map(|stored| ReadingProgress {
            entry_id,
            page: stored.page,
            updated: stored.updated,
        }))
    }

    pub fn save(&self, entry_id: EntryId, page: u32) -> Result<()> {
        let _guard = self.lock.lock();
        let mut file = self.read_file()?;
        file.entries.insert(entry_id.to_string(), StoredProgress { page, updated: now_secs() });
        self.write_file(&file)
    }

    /// Pull the stored page back inside `[0, max_page]` after a book shrank.
    pub fn clamp(&self, entry_id: EntryId, max_page: u32) -> Result<()> {
        let _guard = self.lock.lock();
        let mut file = self.read_file()?;
        if let Some(stored) = file.entries.get_mut(&entry_id.to_string()) {
            if stored.page > max_page {
                stored.page = max_page;
                stored.updated = now_secs();
                return self.write_file(&file);
            }
        }
        Ok(())
    }

    pub fn remove(&self, entry_id: EntryId) -> Result<()> {
        let _guard = self.lock.lock();
        let mut file = self.read_file()?;
        if file.entries.remove(&entry_id.to_string()).is_some() {
            return self.write_file(&file);
        }
        Ok(())
    }

    fn read_file(&self) -> Result<ProgressFile> {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|err| Error::Decode(format!("progress file: {err}"))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(ProgressFile::default()),
            Err(err) => Err(Error::io(&self.path, err)),
        }
    }

    fn write_file(&self, file: &ProgressFile) -> Result<()> {
        let parent = self.path.parent().ok_or_else(|| {
            Error::Validation(format!("progress path {} has no parent", self.path.display()))
        })?;
        fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;

        let data = serde_json::to_vec_pretty(file)
            .map_err(|err| Error::Decode(format!("progress file: {err}")))?;
        let mut temp = NamedTempFile::new_in(parent).map_err(|err| Error::io(parent, err))?;
        temp.write_all(&data).map_err(|err| Error::io(&self.path, err))?;
        temp.flush().map_err(|err| Error::io(&self.path, err))?;
        temp.persist(&self.path).map(|_| ()).map_err(|err| Error::io(&self.path, err.error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store(dir: &tempfile::TempDir) -> ProgressStore {
        ProgressStore::new(dir.path().join("progress.json"))
    }

    #[test]
    fn stub_then_save_then_read() {
        let dir = tempdir().unwrap();
        let store = store(&dir);
        let id = EntryId::new(1);

        store.ensure_stub(id).unwrap();
        assert_eq!(store.get(id).unwrap().unwrap().page, 0);

        store.save(id, 12).unwrap();
        assert_eq!(store.get(id).unwrap().unwrap().page, 12);

        // A later stub does not reset progress.
        store.ensure_stub(id).unwrap();
        assert_eq!(store.get(id).unwrap().unwrap().page, 12);
    }

    #[test]
    fn clamp_only_lowers() {
        let dir = tempdir().unwrap();
        let store = store(&dir);
        let id = EntryId::new(2);

        store.save(id, 40).unwrap();
        store.clamp(id, 9).unwrap();
        assert_eq!(store.get(id).unwrap().unwrap().page, 9);

        store.clamp(id, 30).unwrap();
        assert_eq!(store.get(id).unwrap().unwrap().page, 9);
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = store(&dir);
        let id = EntryId::new(3);

        store.save(id, 1).unwrap();
        store.remove(id).unwrap();
        store.remove(id).unwrap();
        assert!(store.get(id).unwrap().is_none());
    }

    #[test]
    fn survives_reopening() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("progress.json");
        ProgressStore::new(&path).save(EntryId::new(4), 7).unwrap();

        let reopened = ProgressStore::new(&path);
        assert_eq!(reopened.get(EntryId::new(4)).unwrap().unwrap().page, 7);
    }
}
