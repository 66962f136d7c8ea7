//! 7z/CB7 containers.
//!
//! The reader decodes entry streams sequentially; extraction walks the
//! archive and matches by stored name.

use std::io::Read;
use std::path::{Path, PathBuf};

use sevenz_rust::{Password, SevenZReader};

use crate::error::Error;

use super::{ContainerAccess, Result, util};

/// Book stored as a 7z/cb7 archive.
#[derive(Debug, Clone)]
pub struct SevenZipContainer {
    path: PathBuf,
}

impl SevenZipContainer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn open(&self) -> Result<SevenZReader<std::fs::File>> {
        SevenZReader::open(&self.path, Password::empty())
            .map_err(|err| Error::archive(&self.path, err))
    }
}

impl ContainerAccess for SevenZipContainer {
    fn path(&self) -> &Path {
        &self.path
    }

    fn list_page_entries(&self) -> Result<Vec<String>> {
        // Entry metadata lives in the archive header; listing does not
        // decompress any streams.
        let reader = self.open()?;
        let mut names: Vec<String> = Vec::new();

        for entry in &reader.archive().files {
            if entry.is_directory() {
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
        let mut reader = self.open()?;
        let mut found: Option<Vec<u8>> = None;
        let mut read_failure: Option<std::io::Error> = None;

        reader
            .for_each_entries(|entry, stream| {
                if entry.is_directory() || entry.name() != name {
                    return Ok(true);
                }
                let mut bytes = Vec::new();
                match stream.read_to_end(&mut bytes) {
                    Ok(_) => found = Some(bytes),
                    Err(err) => read_failure = Some(err),
                }
                Ok(false)
            })
            .map_err(|err| Error::archive(&self.path, err))?;

        if let Some(err) = read_failure {
            return Err(Error::io(&self.path, err));
        }
        found.ok_or_else(|| Error::not_found(format!("entry {name} in {}", self.path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn create_7z(dir: &Path, files: &[(&str, &[u8])]) -> PathBuf {
        let staging = dir.join("staging");
        fs::create_dir_all(&staging).unwrap();
        for (name, bytes) in files {
            let target = staging.join(name);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(target, bytes).unwrap();
        }

        let archive = dir.join("book.cb7");
        sevenz_rust::compress_to_path(&staging, &archive).unwrap();
        archive
    }

    #[test]
    fn lists_and_extracts_image_entries() {
        let dir = tempdir().unwrap();
        let archive = create_7z(
            dir.path(),
            &[("10.jpg", b"ten" as &[u8]), ("2.png", b"two"), ("cover.txt", b"skip")],
        );

        let container = SevenZipContainer::new(&archive);
        let names = container.list_page_entries().unwrap();
        assert_eq!(names, vec!["2.png", "10.jpg"]);

        assert_eq!(container.extract_entry("2.png").unwrap(), b"two");
        assert_eq!(container.extract_entry("10.jpg").unwrap(), b"ten");
        assert!(container.extract_entry("cover.txt").unwrap_err().is_not_found());
    }

    #[test]
    fn corrupt_archive_is_an_io_failure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.cb7");
        fs::write(&path, b"junk bytes").unwrap();

        let container = SevenZipContainer::new(&path);
        assert!(matches!(container.list_page_entries().unwrap_err(), Error::Io { .. }));
    }
}
