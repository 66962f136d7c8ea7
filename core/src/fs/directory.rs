//! Directory containers: a folder whose image children are the pages.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;

use super::{ContainerAccess, Result, util};

/// Book stored as a plain directory. Pages are the direct children only;
/// subdirectories are never descended into.
#[derive(Debug, Clone)]
pub struct DirectoryContainer {
    root: PathBuf,
}

impl DirectoryContainer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ContainerAccess for DirectoryContainer {
    fn path(&self) -> &Path {
        &self.root
    }

    fn list_page_entries(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = Vec::new();

        for entry in fs::read_dir(&self.root).map_err(|err| Error::io(&self.root, err))? {
            let entry = entry.map_err(|err| Error::io(&self.root, err))?;
            let file_type = entry.file_type().map_err(|err| Error::io(entry.path(), err))?;
            if !file_type.is_file() {
                continue;
            }

            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if util::is_hidden_name(&name) || !util::is_supported_image_name(&name) {
                continue;
            }
            names.push(name);
        }

        names.sort_by(|a, b| util::natural_cmp(a, b));
        Ok(names)
    }

    fn extract_entry(&self, name: &str) -> Result<Vec<u8>> {
        // Entry names come from the listing and are single path components.
        if name.contains('/') || name.contains('\\') || name == ".." {
            return Err(Error::not_found(format!("entry {name} in {}", self.root.display())));
        }

        let path = self.root.join(name);
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::not_found(format!("entry {name} in {}", self.root.display())))
            }
            Err(err) => Err(Error::io(path, err)),
        }
    }
}
