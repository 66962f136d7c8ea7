//! Library tree walking and catalog reconciliation.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::fs as containers;
use crate::store::{CatalogStore, NewEntry, ProgressStore};
use crate::types::{ContainerKind, LibraryId, ScanConfig, now_secs};

use super::{Result, title};

/// Counters for one completed scan. Units that failed to process appear in
/// none of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanOutcome {
    pub added: u64,
    pub updated: u64,
    pub deleted: u64,
}

enum UnitChange {
    Added,
    Updated,
    Unchanged,
}

/// Walks a library root, classifies book units, and reconciles the
/// persisted catalog against what the filesystem holds.
#[derive(Debug)]
pub struct Scanner {
    catalog: Arc<CatalogStore>,
    progress: Arc<ProgressStore>,
    config: ScanConfig,
}

impl Scanner {
    pub fn new(
        catalog: Arc<CatalogStore>,
        progress: Arc<ProgressStore>,
        config: ScanConfig,
    ) -> Self {
        Self { catalog, progress, config }
    }

    /// Full scan: walk, create/update entries, delete absentees, refresh
    /// library stats.
    ///
    /// An unreadable root aborts with the catalog untouched. A failure on a
    /// single unit is logged and skipped; the unit still counts as observed
    /// so an existing entry for it survives the deletion pass.
    pub fn scan(&self, library_id: LibraryId) -> Result<ScanOutcome> {
        let library = self
            .catalog
            .library(library_id)
            .ok_or_else(|| Error::not_found(format!("library {library_id}")))?;

        let units = self.collect_units(&library.root)?;
        debug!(target: "scanner", library = %library_id, units = units.len(), "walk finished");

        let mut outcome = ScanOutcome::default();
        let mut observed: HashSet<PathBuf> = HashSet::with_capacity(units.len());

        for unit in units {
            observed.insert(unit.clone());
            match self.process_unit(library_id, &unit) {
                Ok(UnitChange::Added) => outcome.added += 1,
                Ok(UnitChange::Updated) => outcome.updated += 1,
                Ok(UnitChange::Unchanged) => {}
                Err(err) => {
                    warn!(target: "scanner", unit = %unit.display(), "skipping unit: {err}");
                }
            }
        }

        outcome.deleted = self.delete_absent(library_id, &observed);

        self.catalog.refresh_library_stats(library_id);
        self.catalog.touch_last_scan(library_id, now_secs());
        info!(
            target: "scanner",
            library = %library_id,
            added = outcome.added,
            updated = outcome.updated,
            deleted = outcome.deleted,
            "scan reconciled"
        );
        Ok(outcome)
    }

    /// Existence-only pass: drop entries whose path is gone, refresh stats.
    /// No content is re-examined.
    pub fn quick_scan(&self, library_id: LibraryId) -> Result<ScanOutcome> {
        let library = self
            .catalog
            .library(library_id)
            .ok_or_else(|| Error::not_found(format!("library {library_id}")))?;

        // The root itself must still be readable.
        fs::read_dir(&library.root).map_err(|err| Error::io(&library.root, err))?;

        let mut outcome = ScanOutcome::default();
        for entry in self.catalog.entries_for_library(library_id) {
            if !entry.path.exists() {
                self.catalog.remove_entry(entry.id);
                if let Err(err) = self.progress.remove(entry.id) {
                    warn!(target: "scanner", entry = %entry.id, "progress delete failed: {err}");
                }
                outcome.deleted += 1;
            }
        }

        self.catalog.refresh_library_stats(library_id);
        self.catalog.touch_last_scan(library_id, now_secs());
        Ok(outcome)
    }

    /// Walk the tree once and return every terminal book unit.
    ///
    /// A directory whose immediate children include an image is itself a
    /// unit and is not descended into; archive files are units wherever they
    /// are encountered; other files are ignored. Failures below the root
    /// skip that subtree only.
    fn collect_units(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut units = Vec::new();
        self.visit_dir(root, &mut units).map_err(|err| Error::io(root, err))?;
        Ok(units)
    }

    fn visit_dir(&self, dir: &Path, units: &mut Vec<PathBuf>) -> std::io::Result<()> {
        let mut archives: Vec<PathBuf> = Vec::new();
        let mut subdirs: Vec<PathBuf> = Vec::new();
        let mut has_images = false;

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if self.config.skip_hidden && containers::is_hidden(&path) {
                continue;
            }

            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                subdirs.push(path);
            } else if file_type.is_file() {
                if containers::is_supported_image(&path) {
                    has_images = true;
                } else if containers::is_supported_archive(&path) {
                    archives.push(path);
                }
            }
        }

        if has_images {
            // Terminal book: everything beneath belongs to it.
            units.push(dir.to_path_buf());
            return Ok(());
        }

        units.append(&mut archives);
        for subdir in subdirs {
            if let Err(err) = self.visit_dir(&subdir, units) {
                warn!(target: "scanner", dir = %subdir.display(), "skipping subtree: {err}");
            }
        }
        Ok(())
    }

    fn process_unit(&self, library_id: LibraryId, path: &Path) -> Result<UnitChange> {
        let kind = containers::detect_kind(path)?;
        let (size_bytes, mtime) = self.measure_unit(path, kind)?;

        let Some(existing) = self.catalog.find_by_path(library_id, path) else {
            let page_count = containers::count_image_pages(path)?;
            let entry = self.catalog.insert_entry(NewEntry {
                library_id,
                path: path.to_path_buf(),
                kind,
                title: title::title_for_unit(path, kind),
                size_bytes,
                page_count,
                mtime,
            })?;
            if let Err(err) = self.progress.ensure_stub(entry.id) {
                warn!(target: "scanner", entry = %entry.id, "progress stub failed: {err}");
            }
            debug!(target: "scanner", unit = %path.display(), pages = page_count, "catalogued");
            return Ok(UnitChange::Added);
        };

        if !self.config.deep_scan && existing.size_bytes == size_bytes && existing.mtime == mtime {
            return Ok(UnitChange::Unchanged);
        }

        let page_count = containers::count_image_pages(path)?;
        if existing.size_bytes == size_bytes
            && existing.mtime == mtime
            && existing.page_count == page_count
        {
            return Ok(UnitChange::Unchanged);
        }

        self.catalog.update_entry_content(existing.id, size_bytes, page_count, mtime)?;
        if page_count < existing.page_count {
            let max_page = page_count.saturating_sub(1);
            if let Err(err) = self.progress.clamp(existing.id, max_page) {
                warn!(target: "scanner", entry = %existing.id, "progress clamp failed: {err}");
            }
        }
        debug!(target: "scanner", unit = %path.display(), pages = page_count, "refreshed");
        Ok(UnitChange::Updated)
    }

    /// Size and mtime of a unit, at second resolution. Directory units are
    /// sized by their image children.
    fn measure_unit(&self, path: &Path, kind: ContainerKind) -> Result<(u64, u64)> {
        let metadata = fs::metadata(path).map_err(|err| Error::io(path, err))?;
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0);

        let size_bytes = match kind {
            ContainerKind::Directory => {
                let mut total = 0u64;
                for entry in fs::read_dir(path).map_err(|err| Error::io(path, err))? {
                    let entry = entry.map_err(|err| Error::io(path, err))?;
                    let child = entry.path();
                    if child.is_file() && containers::is_supported_image(&child) {
                        total += fs::metadata(&child).map_err(|err| Error::io(&child, err))?.len();
                    }
                }
                total
            }
            _ => metadata.len(),
        };

        Ok((size_bytes, mtime))
    }

    fn delete_absent(&self, library_id: LibraryId, observed: &HashSet<PathBuf>) -> u64 {
        let mut deleted = 0;
        for path in self.catalog.entry_paths(library_id).difference(observed) {
            let Some(entry) = self.catalog.find_by_path(library_id, path) else {
                continue;
            };
            self.catalog.remove_entry(entry.id);
            if let Err(err) = self.progress.remove(entry.id) {
                warn!(target: "scanner", entry = %entry.id, "progress delete failed: {err}");
            }
            debug!(target: "scanner", unit = %path.display(), "removed from catalog");
            deleted += 1;
        }
        deleted
    }
}
