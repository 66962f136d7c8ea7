//! Container access layer: directories and archives behind one interface.
//!
//! Every consumer (scanner, page service, pipeline) goes through
//! [`open_container`]; the container kind is decided in exactly one place.

use std::path::Path;

mod util;

pub mod directory;
pub mod rar;
pub mod sevenzip;
pub mod zip;

pub use self::directory::DirectoryContainer;
pub use self::rar::RarContainer;
pub use self::sevenzip::SevenZipContainer;
pub use self::zip::ZipContainer;
pub use util::{
    ARCHIVE_EXTENSIONS, IMAGE_EXTENSIONS, is_hidden, is_hidden_name, is_supported_archive,
    is_supported_image, is_supported_image_name, natural_cmp,
};

use crate::error::Error;
use crate::types::ContainerKind;

/// Shared result type for container operations.
pub type Result<T> = crate::Result<T>;

/// Uniform listing and extraction over one book container.
///
/// `list_page_entries` returns the non-directory entries whose lowercase
/// name carries a supported image extension, in natural order; the position
/// in that list is the page ordinal.
pub trait ContainerAccess: std::fmt::Debug + Send + Sync {
    fn path(&self) -> &Path;

    fn list_page_entries(&self) -> Result<Vec<String>>;

    fn extract_entry(&self, name: &str) -> Result<Vec<u8>>;
}

/// Classify a unit path by directory test or extension.
pub fn detect_kind(path: &Path) -> Result<ContainerKind> {
    if path.is_dir() {
        return Ok(ContainerKind::Directory);
    }

    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "zip" | "cbz" => Ok(ContainerKind::Zip),
        "rar" | "cbr" => Ok(ContainerKind::Rar),
        "7z" | "cb7" => Ok(ContainerKind::SevenZip),
        _ => Err(Error::UnsupportedFormat(format!(
            "{} is not a supported book container",
            path.display()
        ))),
    }
}

/// The single dispatch point selecting an accessor implementation.
pub fn open_container(path: &Path) -> Result<Box<dyn ContainerAccess>> {
    Ok(match detect_kind(path)? {
        ContainerKind::Directory => Box::new(DirectoryContainer::new(path)),
        ContainerKind::Zip => Box::new(ZipContainer::new(path)),
        ContainerKind::Rar => Box::new(RarContainer::new(path)),
        ContainerKind::SevenZip => Box::new(SevenZipContainer::new(path)),
    })
}

/// List the naturally ordered page entry names of a container.
pub fn list_page_entries(path: &Path) -> Result<Vec<String>> {
    open_container(path)?.list_page_entries()
}

/// Extract the raw bytes of one entry.
pub fn extract_entry(path: &Path, name: &str) -> Result<Vec<u8>> {
    open_container(path)?.extract_entry(name)
}

/// Number of pages a container holds.
pub fn count_image_pages(path: &Path) -> Result<u32> {
    Ok(list_page_entries(path)?.len() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn detects_kind_by_directory_test_and_extension() {
        let dir = tempdir().unwrap();
        assert_eq!(detect_kind(dir.path()).unwrap(), ContainerKind::Directory);
        assert_eq!(detect_kind(Path::new("b.cbz")).unwrap(), ContainerKind::Zip);
        assert_eq!(detect_kind(Path::new("b.CBR")).unwrap(), ContainerKind::Rar);
        assert_eq!(detect_kind(Path::new("b.cb7")).unwrap(), ContainerKind::SevenZip);
    }

    #[test]
    fn unsupported_extension_is_an_explicit_error() {
        let err = detect_kind(Path::new("book.tar")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
        let err = open_container(Path::new("book.pdf")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn counts_pages_through_the_dispatch_point() {
        let dir = tempdir().unwrap();
        for name in ["a.jpg", "b.jpg", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        assert_eq!(count_image_pages(dir.path()).unwrap(), 2);
    }
}
