//! Catalog records, title derivation, scanning, and scan orchestration.

pub mod scanner;
pub mod service;
pub mod title;

pub use scanner::{ScanOutcome, Scanner};
pub use service::{ScanRequest, ScanService};
pub use title::{derive_title, title_for_unit};

pub type Result<T> = crate::Result<T>;
