//! Background scan orchestration.
//!
//! A library's scan status is the mutual-exclusion guard: a scan starts only
//! through an atomic Idle→Scanning transition, runs on its own thread to
//! completion or failure, and ends Idle or Error. There is no cancellation,
//! and a request against a Scanning library is rejected, never queued.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::Error;
use crate::stats::StatsCollector;
use crate::store::{CatalogStore, ProgressStore};
use crate::types::{LibraryId, ScanConfig, ScanMode, ScanStatus};

use super::scanner::Scanner;
use super::Result;

/// Immediate acknowledgement for a scan request. Results are observed
/// asynchronously through the library's status and stats fields.
#[derive(Debug)]
pub enum ScanRequest {
    /// The scan was accepted and is running on the contained thread.
    Accepted(JoinHandle<()>),
    /// The library is already Scanning.
    Rejected,
}

impl ScanRequest {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ScanRequest::Accepted(_))
    }

    /// Block until the background scan finishes. Intended for tests and
    /// shutdown paths; normal callers poll the library status instead.
    pub fn join(self) {
        if let ScanRequest::Accepted(handle) = self {
            let _ = handle.join();
        }
    }
}

/// Accepts scan requests and runs each accepted scan on a named background
/// thread. Scans of different libraries run fully concurrently.
#[derive(Debug)]
pub struct ScanService {
    catalog: Arc<CatalogStore>,
    scanner: Arc<Scanner>,
    stats: Arc<StatsCollector>,
}

impl ScanService {
    pub fn new(
        catalog: Arc<CatalogStore>,
        progress: Arc<ProgressStore>,
        config: ScanConfig,
        stats: Arc<StatsCollector>,
    ) -> Self {
        let scanner = Arc::new(Scanner::new(Arc::clone(&catalog), progress, config));
        Self { catalog, scanner, stats }
    }

    /// Try to start a scan, returning immediately.
    pub fn request_scan(&self, library_id: LibraryId, mode: ScanMode) -> Result<ScanRequest> {
        if !self.catalog.try_begin_scan(library_id)? {
            debug!(target: "scanner", library = %library_id, "scan rejected: already running");
            return Ok(ScanRequest::Rejected);
        }

        let catalog = Arc::clone(&self.catalog);
        let scanner = Arc::clone(&self.scanner);
        let stats = Arc::clone(&self.stats);

        let spawned = thread::Builder::new().name(format!("scan-{library_id}")).spawn(move || {
            let started = Instant::now();
            let result = match mode {
                ScanMode::Full => scanner.scan(library_id),
                ScanMode::Quick => scanner.quick_scan(library_id),
            };

            match result {
                Ok(outcome) => {
                    stats.record_scan(started.elapsed(), true);
                    info!(
                        target: "scanner",
                        library = %library_id,
                        added = outcome.added,
                        updated = outcome.updated,
                        deleted = outcome.deleted,
                        "scan finished"
                    );
                    catalog.finish_scan(library_id, ScanStatus::Idle);
                }
                Err(err) => {
                    stats.record_scan(started.elapsed(), false);
                    warn!(target: "scanner", library = %library_id, "scan failed: {err}");
                    catalog.finish_scan(library_id, ScanStatus::Error(err.to_string()));
                }
            }
        });

        match spawned {
            Ok(handle) => Ok(ScanRequest::Accepted(handle)),
            Err(err) => {
                // Roll the guard back so the library is not stuck Scanning.
                self.catalog.finish_scan(library_id, ScanStatus::Idle);
                let root =
                    self.catalog.library(library_id).map(|l| l.root).unwrap_or_default();
                Err(Error::io(root, err))
            }
        }
    }
}
