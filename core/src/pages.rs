//! Page serving: ordinal lookup through the container layer, processed
//! bytes through the asset cache.

use std::sync::Arc;

use crate::cache::{AssetCache, CachedAsset};
use crate::error::Error;
use crate::fs;
use crate::pipeline::AssetPipeline;
use crate::store::CatalogStore;
use crate::types::{AssetVariant, EntryId, PageRef};

use crate::Result;

/// Resolves `(book, page number)` requests against the catalog and serves
/// pages as cached JPEG assets.
#[derive(Debug)]
pub struct PageService {
    catalog: Arc<CatalogStore>,
    cache: Arc<AssetCache>,
    pipeline: AssetPipeline,
}

impl PageService {
    pub fn new(catalog: Arc<CatalogStore>, cache: Arc<AssetCache>, pipeline: AssetPipeline) -> Self {
        Self { catalog, cache, pipeline }
    }

    /// The naturally ordered pages of a book; the position in the returned
    /// list is the page number.
    pub fn page_refs(&self, book: EntryId) -> Result<Vec<PageRef>> {
        let entry = self
            .catalog
            .entry(book)
            .ok_or_else(|| Error::not_found(format!("book {book}")))?;
        let names = fs::list_page_entries(&entry.path)?;
        Ok(names
            .into_iter()
            .enumerate()
            .map(|(ordinal, name)| PageRef {
                container: entry.path.clone(),
                entry: name,
                ordinal: ordinal as u32,
            })
            .collect())
    }

    /// Serve one page, 0-based. Unknown books and out-of-range page numbers
    /// are NotFound; decode and format failures surface as-is — no
    /// placeholder image is ever substituted.
    pub fn fetch_page(
        &self,
        book: EntryId,
        page_number: u32,
        thumbnail: bool,
    ) -> Result<CachedAsset> {
        let entry = self
            .catalog
            .entry(book)
            .ok_or_else(|| Error::not_found(format!("book {book}")))?;

        let names = fs::list_page_entries(&entry.path)?;
        let Some(name) = names.get(page_number as usize) else {
            return Err(Error::not_found(format!(
                "page {page_number} of book {book} ({} pages)",
                names.len()
            )));
        };

        let variant = if thumbnail { AssetVariant::Thumbnail } else { AssetVariant::Preview };
        self.cache.get_or_create(&entry.path, name, variant, || {
            self.pipeline.extract_and_process(&entry.path, name, variant)
        })
    }
}
