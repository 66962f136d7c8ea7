//! ZIP/CBZ containers backed by random-access reads.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use zip::read::ZipArchive;
use zip::result::ZipError;

use crate::error::Error;

use super::{ContainerAccess, Result, util};

/// Book stored as a zip/cbz archive. Entries are addressed by their stored
/// name, random access.
#[derive(Debug, Clone)]
pub struct ZipContainer {
    path: PathBuf,
}

impl ZipContainer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn open(&self) -> Result<ZipArchive<File>> {
        let file = File::open(&self.path).map_err(|err| Error::io(&self.path, err))?;
        ZipArchive::new(file).map_err(|err| Error::archive(&self.path, err))
    }
}

impl ContainerAccess for ZipContainer {
    fn path(&self) -> &Path {
        &self.path
    }

    fn list_page_entries(&self) -> Result<Vec<String>> {
        let mut archive = self.open()?;
        let mut names: Vec<String> = Vec::new();

        for index in 0..archive.len() {
            let entry = archive.by_index(index).map_err(|err| Error::archive(&self.path, err))?;
            if entry.is_dir() {
                continue;
            }
            // Entries escaping the archive root are ignored outright.
            if entry.enclosed_name().is_none() {
                continue;
            }

            let name = entry.name().to_string();
            if util::is_hidden_name(&name) || !util::is_supported_image_name(&name) {
                continue;
            }
            names.push(name);
        }

        names.sort_by(|a, b| util::natural_cmp(a, b));
        Ok(names)
    }

    fn extract_entry(&self, name: &str) -> Result<Vec<u8>> {
        let mut archive = self.open()?;
        let mut entry = match archive.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => {
                return Err(Error::not_found(format!("entry {name} in {}", self.path.display())));
            }
            Err(err) => return Err(Error::archive(&self.path, err)),
        };

        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes).map_err(|err| Error::io(&self.path, err))?;
        Ok(bytes)
    }
}
