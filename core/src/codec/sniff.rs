//! Mime detection from raw bytes.

use image::ImageFormat;

/// Classify image bytes by their magic numbers. Unknown content is
/// `application/octet-stream`.
pub fn detect(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => "image/jpeg",
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::Gif) => "image/gif",
        Ok(ImageFormat::Bmp) => "image/bmp",
        Ok(ImageFormat::WebP) => "image/webp",
        _ => "application/octet-stream",
    }
}
