//! Decode, transform, and encode operations for derived page assets.

pub mod assets;
pub mod resize;
pub mod transform;

pub use assets::{AssetPipeline, ProcessedAsset};
pub use resize::{ResizeFilter, cover_box, crop_center, fit_within, resize_rgba};
pub use transform::{adjust_brightness, adjust_contrast, rotate};

/// Every pipeline operation encodes to this single output codec.
pub const OUTPUT_MIME: &str = "image/jpeg";

pub type Result<T> = crate::Result<T>;
