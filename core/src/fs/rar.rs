//! RAR/CBR containers.
//!
//! The underlying reader is forward-only: every logical operation opens its
//! own archive handle and walks headers from the start. Handles are never
//! shared between a listing and a later extraction.

use std::path::{Path, PathBuf};

use unrar::Archive;

use crate::error::Error;

use super::{ContainerAccess, Result, util};

/// Book stored as a rar/cbr archive.
#[derive(Debug, Clone)]
pub struct RarContainer {
    path: PathBuf,
}

impl RarContainer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Archived names may carry backslash separators depending on the packer.
fn normalize_name(raw: &Path) -> String {
    raw.to_string_lossy().replace('\\', "/")
}

impl ContainerAccess for RarContainer {
    fn path(&self) -> &Path {
        &self.path
    }

    fn list_page_entries(&self) -> Result<Vec<String>> {
        let archive = Archive::new(&self.path)
            .open_for_listing()
            .map_err(|err| Error::archive(&self.path, err))?;

        let mut names: Vec<String> = Vec::new();
        for header in archive {
            let header = header.map_err(|err| Error::archive(&self.path, err))?;
            if !header.is_file() {
                continue;
            }

            let name = normalize_name(&header.filename);
            if util::is_hidden_name(&name) || !util::is_supported_image_name(&name) {
                continue;
            }
            names.push(name);
        }

        names.sort_by(|a, b| util::natural_cmp(a, b));
        Ok(names)
    }

    fn extract_entry(&self, name: &str) -> Result<Vec<u8>> {
        // Fresh handle per extraction; the cursor cannot rewind.
        let mut archive = Archive::new(&self.path)
            .open_for_processing()
            .map_err(|err| Error::archive(&self.path, err))?;

        loop {
            let Some(before_file) =
                archive.read_header().map_err(|err| Error::archive(&self.path, err))?
            else {
                break;
            };

            let matches = before_file.entry().is_file()
                && normalize_name(&before_file.entry().filename) == name;

            archive = if matches {
                let (bytes, _rest) =
                    before_file.read().map_err(|err| Error::archive(&self.path, err))?;
                return Ok(bytes);
            } else {
                before_file.skip().map_err(|err| Error::archive(&self.path, err))?
            };
        }

        Err(Error::not_found(format!("entry {name} in {}", self.path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // No pure-Rust rar writer exists, so behaviour against real archives is
    // covered by the zip/directory/7z grids; here only the failure paths.

    #[test]
    fn missing_archive_is_an_io_failure() {
        let container = RarContainer::new("/nope/missing.cbr");
        let err = container.list_page_entries().unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn corrupt_archive_is_an_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.rar");
        std::fs::write(&path, b"not really rar data").unwrap();

        let container = RarContainer::new(&path);
        assert!(matches!(container.list_page_entries().unwrap_err(), Error::Io { .. }));
        assert!(matches!(container.extract_entry("1.jpg").unwrap_err(), Error::Io { .. }));
    }

    #[test]
    fn backslash_names_are_normalized() {
        assert_eq!(normalize_name(Path::new("pages\\001.jpg")), "pages/001.jpg");
    }
}
