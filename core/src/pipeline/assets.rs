//! Derived-asset pipeline: extract, transform, encode.
//!
//! Every operation is byte-in, byte-out, with one fixed output codec
//! (JPEG at the configured quality).

use std::path::Path;

use crate::codec::{self, DecodedImage};
use crate::error::Error;
use crate::fs;
use crate::types::{AssetVariant, ImageDimensions, PipelineConfig};

use super::resize::{ResizeFilter, cover_box, crop_center, fit_within, resize_rgba};
use super::{OUTPUT_MIME, Result, transform};

/// Finished asset bytes plus their mime type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedAsset {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
}

/// Stateless processor configured with the variant geometry.
#[derive(Debug, Clone, Default)]
pub struct AssetPipeline {
    config: PipelineConfig,
}

impl AssetPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Pull one entry out of its container and produce the requested
    /// variant. This is the unit the asset cache stores.
    pub fn extract_and_process(
        &self,
        container: &Path,
        entry: &str,
        variant: AssetVariant,
    ) -> Result<ProcessedAsset> {
        let raw = fs::extract_entry(container, entry)?;
        let decoded = codec::decode(entry, &raw)?;
        let transformed = match variant {
            AssetVariant::Thumbnail => self.thumbnail_image(&decoded)?,
            AssetVariant::Preview => self.preview_image(&decoded)?,
        };
        self.finish(&transformed)
    }

    /// Fixed-box thumbnail: scaled to fill, centre-cropped.
    pub fn thumbnail(&self, data: &[u8]) -> Result<ProcessedAsset> {
        let decoded = codec::decode("asset", data)?;
        let out = self.thumbnail_image(&decoded)?;
        self.finish(&out)
    }

    /// Fit-within-box preview, never upscaled.
    pub fn preview(&self, data: &[u8]) -> Result<ProcessedAsset> {
        let decoded = codec::decode("asset", data)?;
        let out = self.preview_image(&decoded)?;
        self.finish(&out)
    }

    /// Resize to `width`x`height`; with `keep_aspect` the image is scaled to
    /// fit inside that box instead.
    pub fn resize(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        keep_aspect: bool,
    ) -> Result<ProcessedAsset> {
        if width == 0 || height == 0 {
            return Err(Error::Validation("resize dimensions must be non-zero".to_string()));
        }

        let decoded = codec::decode("asset", data)?;
        let bounds = ImageDimensions { width, height };
        let target = if keep_aspect {
            let scale = f64::min(
                width as f64 / decoded.width().max(1) as f64,
                height as f64 / decoded.height().max(1) as f64,
            );
            ImageDimensions {
                width: ((decoded.width() as f64 * scale).round() as u32).max(1),
                height: ((decoded.height() as f64 * scale).round() as u32).max(1),
            }
        } else {
            bounds
        };

        let out = resize_rgba(&decoded, target, ResizeFilter::default())?;
        self.finish(&out)
    }

    /// Rotate by 90, 180, or 270 degrees.
    pub fn rotate(&self, data: &[u8], degrees: u16) -> Result<ProcessedAsset> {
        let decoded = codec::decode("asset", data)?;
        let out = transform::rotate(&decoded, degrees)?;
        self.finish(&out)
    }

    pub fn adjust_brightness(&self, data: &[u8], factor: f32) -> Result<ProcessedAsset> {
        let decoded = codec::decode("asset", data)?;
        let out = transform::adjust_brightness(&decoded, factor);
        self.finish(&out)
    }

    pub fn adjust_contrast(&self, data: &[u8], factor: f32) -> Result<ProcessedAsset> {
        let decoded = codec::decode("asset", data)?;
        let out = transform::adjust_contrast(&decoded, factor);
        self.finish(&out)
    }

    fn thumbnail_image(&self, decoded: &DecodedImage) -> Result<DecodedImage> {
        let box_dims = self.config.thumbnail_box;
        let covering = cover_box(decoded.dimensions, box_dims);
        let scaled = resize_rgba(decoded, covering, ResizeFilter::default())?;
        crop_center(&scaled, box_dims)
    }

    fn preview_image(&self, decoded: &DecodedImage) -> Result<DecodedImage> {
        let target = fit_within(decoded.dimensions, self.config.preview_box);
        if target == decoded.dimensions {
            return Ok(decoded.clone());
        }
        resize_rgba(decoded, target, ResizeFilter::default())
    }

    fn finish(&self, image: &DecodedImage) -> Result<ProcessedAsset> {
        let bytes = codec::encode_jpeg(image, self.config.jpeg_quality)?;
        Ok(ProcessedAsset { bytes, mime: OUTPUT_MIME })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let buffer = ImageBuffer::from_fn(width, height, |x, _| {
            Rgba([(x * 40 % 256) as u8, 80, 120, 255])
        });
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(buffer).write_to(&mut cursor, ImageFormat::Png).unwrap();
        cursor.into_inner()
    }

    fn pipeline_with_boxes() -> AssetPipeline {
        AssetPipeline::new(PipelineConfig {
            thumbnail_box: ImageDimensions { width: 10, height: 14 },
            preview_box: ImageDimensions { width: 40, height: 40 },
            jpeg_quality: 85,
        })
    }

    fn decoded_dims(asset: &ProcessedAsset) -> ImageDimensions {
        crate::codec::decode("out.jpg", &asset.bytes).unwrap().dimensions
    }

    #[test]
    fn thumbnails_fill_the_box_exactly() {
        let pipeline = pipeline_with_boxes();
        let asset = pipeline.thumbnail(&png_bytes(100, 50)).unwrap();
        assert_eq!(asset.mime, "image/jpeg");
        assert_eq!(decoded_dims(&asset), ImageDimensions { width: 10, height: 14 });
    }

    #[test]
    fn previews_fit_within_and_never_upscale() {
        let pipeline = pipeline_with_boxes();

        let asset = pipeline.preview(&png_bytes(80, 160)).unwrap();
        assert_eq!(decoded_dims(&asset), ImageDimensions { width: 20, height: 40 });

        let asset = pipeline.preview(&png_bytes(16, 8)).unwrap();
        assert_eq!(decoded_dims(&asset), ImageDimensions { width: 16, height: 8 });
    }

    #[test]
    fn resize_honours_keep_aspect() {
        let pipeline = pipeline_with_boxes();

        let stretched = pipeline.resize(&png_bytes(20, 20), 10, 6, false).unwrap();
        assert_eq!(decoded_dims(&stretched), ImageDimensions { width: 10, height: 6 });

        let kept = pipeline.resize(&png_bytes(20, 20), 10, 6, true).unwrap();
        assert_eq!(decoded_dims(&kept), ImageDimensions { width: 6, height: 6 });

        assert!(matches!(
            pipeline.resize(&png_bytes(4, 4), 0, 6, true).unwrap_err(),
            Error::Validation(_)
        ));
    }

    #[test]
    fn decode_failures_surface_as_decode_errors() {
        let pipeline = pipeline_with_boxes();
        assert!(matches!(pipeline.thumbnail(b"garbage").unwrap_err(), Error::Decode(_)));
        assert!(matches!(
            pipeline.adjust_brightness(&[], 1.2).unwrap_err(),
            Error::Decode(_)
        ));
    }
}
