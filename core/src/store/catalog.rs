//! In-process store for library roots and catalog entries.
//!
//! Persistence technology is a collaborator concern; this store carries the
//! record shapes and the queries the scanner and page service need.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::error::Error;
use crate::types::{
    CatalogEntry, ContainerKind, EntryId, LibraryId, LibraryRoot, ScanStatus, now_secs,
};

use super::Result;

/// Field set for creating a new catalog entry; the store assigns the id and
/// timestamps.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub library_id: LibraryId,
    pub path: PathBuf,
    pub kind: ContainerKind,
    pub title: String,
    pub size_bytes: u64,
    pub page_count: u32,
    pub mtime: u64,
}

#[derive(Debug, Default)]
struct CatalogInner {
    next_library: u64,
    next_entry: u64,
    libraries: HashMap<LibraryId, LibraryRoot>,
    entries: HashMap<EntryId, CatalogEntry>,
    by_path: HashMap<(LibraryId, PathBuf), EntryId>,
}

/// Store of [`LibraryRoot`] and [`CatalogEntry`] records.
#[derive(Debug, Default)]
pub struct CatalogStore {
    inner: RwLock<CatalogInner>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a library root, starting Idle with empty stats.
    pub fn add_library(&self, root: impl Into<PathBuf>) -> LibraryRoot {
        let mut inner = self.inner.write();
        inner.next_library += 1;
        let library = LibraryRoot {
            id: LibraryId::new(inner.next_library),
            root: root.into(),
            status: ScanStatus::Idle,
            last_scan: None,
            entry_count: 0,
            total_bytes: 0,
        };
        inner.libraries.insert(library.id, library.clone());
        library
    }

    pub fn library(&self, id: LibraryId) -> Option<LibraryRoot> {
        self.inner.read().libraries.get(&id).cloned()
    }

    pub fn libraries(&self) -> Vec<LibraryRoot> {
        let mut all: Vec<LibraryRoot> = self.inner.read().libraries.values().cloned().collect();
        all.sort_by_key(|library| library.id.get());
        all
    }

    /// Atomic Idle→Scanning transition. Returns `false` when the library is
    /// already Scanning; an Error status counts as completed and may rescan.
    pub fn try_begin_scan(&self, id: LibraryId) -> Result<bool> {
        let mut inner = self.inner.write();
        let library = inner
            .libraries
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("library {id}")))?;

        if library.status == ScanStatus::Scanning {
            return Ok(false);
        }
        library.status = ScanStatus::Scanning;
        Ok(true)
    }

    /// Record the terminal state of a scan.
    pub fn finish_scan(&self, id: LibraryId, status: ScanStatus) {
        let mut inner = self.inner.write();
        if let Some(library) = inner.libraries.get_mut(&id) {
            library.status = status;
        }
    }

    pub fn touch_last_scan(&self, id: LibraryId, when: u64) {
        let mut inner = self.inner.write();
        if let Some(library) = inner.libraries.get_mut(&id) {
            library.last_scan = Some(when);
        }
    }

    /// Refresh a library's aggregate stats from its current entries.
    pub fn refresh_library_stats(&self, id: LibraryId) {
        let mut inner = self.inner.write();
        let (count, bytes) = inner
            .entries
            .values()
            .filter(|entry| entry.library_id == id)
            .fold((0u64, 0u64), |(count, bytes), entry| (count + 1, bytes + entry.size_bytes));
        if let Some(library) = inner.libraries.get_mut(&id) {
            library.entry_count = count;
            library.total_bytes = bytes;
        }
    }

    /// Insert a new entry. The path must be unique within its library.
    pub fn insert_entry(&self, new: NewEntry) -> Result<CatalogEntry> {
        let mut inner = self.inner.write();
        let path_key = (new.library_id, new.path.clone());
        if inner.by_path.contains_key(&path_key) {
            return Err(Error::Conflict(format!(
                "path {} already catalogued in library {}",
                new.path.display(),
                new.library_id
            )));
        }

        inner.next_entry += 1;
        let now = now_secs();
        let entry = CatalogEntry {
            id: EntryId::new(inner.next_entry),
            library_id: new.library_id,
            path: new.path,
            kind: new.kind,
            title: new.title,
            size_bytes: new.size_bytes,
            page_count: new.page_count,
            mtime: new.mtime,
            created_at: now,
            updated_at: now,
        };
        inner.by_path.insert(path_key, entry.id);
        inner.entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    /// Replace the content-derived fields of an existing entry.
    pub fn update_entry_content(
        &self,
        id: EntryId,
        size_bytes: u64,
        page_count: u32,
        mtime: u64,
    ) -> Result<CatalogEntry> {
        let mut inner = self.inner.write();
        let entry =
            inner.entries.get_mut(&id).ok_or_else(|| Error::not_found(format!("entry {id}")))?;
        entry.size_bytes = size_bytes;
        entry.page_count = page_count;
        entry.mtime = mtime;
        entry.updated_at = now_secs();
        Ok(entry.clone())
    }

    pub fn entry(&self, id: EntryId) -> Option<CatalogEntry> {
        self.inner.read().entries.get(&id).cloned()
    }

    pub fn find_by_path(&self, library: LibraryId, path: &Path) -> Option<CatalogEntry> {
        let inner = self.inner.read();
        let id = inner.by_path.get(&(library, path.to_path_buf()))?;
        inner.entries.get(id).cloned()
    }

    /// All catalogued paths of a library, for reconciliation diffs.
    pub fn entry_paths(&self, library: LibraryId) -> HashSet<PathBuf> {
        self.inner
            .read()
            .entries
            .values()
            .filter(|entry| entry.library_id == library)
            .map(|entry| entry.path.clone())
            .collect()
    }

    pub fn entries_for_library(&self, library: LibraryId) -> Vec<CatalogEntry> {
        let mut entries: Vec<CatalogEntry> = self
            .inner
            .read()
            .entries
            .values()
            .filter(|entry| entry.library_id == library)
            .cloned()
            .collect();
        entries.sort_by_key(|entry| entry.id.get());
        entries
    }

    pub fn remove_entry(&self, id: EntryId) -> Option<CatalogEntry> {
        let mut inner = self.inner.write();
        let entry = inner.entries.remove(&id)?;
        inner.by_path.remove(&(entry.library_id, entry.path.clone()));
        Some(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_entry(library: LibraryId, path: &str) -> NewEntry {
        NewEntry {
            library_id: library,
            path: PathBuf::from(path),
            kind: ContainerKind::Zip,
            title: "T".to_string(),
            size_bytes: 10,
            page_count: 3,
            mtime: 100,
        }
    }

    #[test]
    fn paths_are_unique_within_a_library() {
        let store = CatalogStore::new();
        let a = store.add_library("/lib/a");
        let b = store.add_library("/lib/b");

        store.insert_entry(new_entry(a.id, "/lib/a/book.cbz")).unwrap();
        let err = store.insert_entry(new_entry(a.id, "/lib/a/book.cbz")).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // The same path in a different library is fine.
        store.insert_entry(new_entry(b.id, "/lib/a/book.cbz")).unwrap();
    }

    #[test]
    fn begin_scan_is_a_compare_and_set() {
        let store = CatalogStore::new();
        let library = store.add_library("/lib");

        assert!(store.try_begin_scan(library.id).unwrap());
        assert!(!store.try_begin_scan(library.id).unwrap());

        store.finish_scan(library.id, ScanStatus::Error("boom".into()));
        // Error is a completed state; a new scan may start.
        assert!(store.try_begin_scan(library.id).unwrap());
    }

    #[test]
    fn removal_clears_the_path_index() {
        let store = CatalogStore::new();
        let library = store.add_library("/lib");
        let entry = store.insert_entry(new_entry(library.id, "/lib/x.cbz")).unwrap();

        store.remove_entry(entry.id).unwrap();
        assert!(store.find_by_path(library.id, Path::new("/lib/x.cbz")).is_none());
        // Path can be catalogued again after removal.
        store.insert_entry(new_entry(library.id, "/lib/x.cbz")).unwrap();
    }

    #[test]
    fn stats_reflect_current_entries() {
        let store = CatalogStore::new();
        let library = store.add_library("/lib");
        store.insert_entry(new_entry(library.id, "/lib/a.cbz")).unwrap();
        store.insert_entry(new_entry(library.id, "/lib/b.cbz")).unwrap();

        store.refresh_library_stats(library.id);
        let library = store.library(library.id).unwrap();
        assert_eq!(library.entry_count, 2);
        assert_eq!(library.total_bytes, 20);
    }
}
