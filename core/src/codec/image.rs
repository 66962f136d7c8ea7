//! Image decoding and encoding primitives.

use std::io::Cursor;
use std::path::Path;

use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder as _, ImageFormat, ImageReader, RgbaImage};
use moxcms::{ColorProfile, Layout, TransformOptions};
use tracing::warn;

use crate::error::Error;
use crate::types::ImageDimensions;

use super::Result;

/// RGBA8888 pixel buffer, row-major from the top-left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub dimensions: ImageDimensions,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.dimensions.width
    }

    pub fn height(&self) -> u32 {
        self.dimensions.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Decode raw page bytes into an RGBA buffer.
///
/// Supports JPEG, PNG, GIF (first frame), BMP, and WebP. EXIF orientation is
/// applied; embedded ICC profiles are converted to sRGB where possible. Any
/// codec failure is a [`Error::Decode`] — partial output is never returned.
pub fn decode(name: &str, data: &[u8]) -> Result<DecodedImage> {
    if data.is_empty() {
        return Err(Error::Decode(format!("empty image data for {name}")));
    }

    let reader = match infer_format(name) {
        Some(format) => ImageReader::with_format(Cursor::new(data), format),
        None => ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|err| Error::Decode(format!("{name}: {err}")))?,
    };

    let mut decoder =
        reader.into_decoder().map_err(|err| Error::Decode(format!("{name}: {err}")))?;

    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let icc_profile = decoder.icc_profile().unwrap_or(None);

    let mut image = DynamicImage::from_decoder(decoder)
        .map_err(|err| Error::Decode(format!("{name}: {err}")))?;

    if orientation != Orientation::NoTransforms {
        image.apply_orientation(orientation);
    }

    let mut rgba = image.into_rgba8();

    if let Some(profile) = icc_profile {
        // A bad profile degrades colour, not availability.
        if let Err(err) = convert_to_srgb_in_place(&mut rgba, &profile) {
            warn!(target: "codec", page = name, "icc conversion skipped: {err}");
        }
    }

    let dimensions = ImageDimensions { width: rgba.width(), height: rgba.height() };
    Ok(DecodedImage { dimensions, pixels: rgba.into_raw() })
}

/// Encode an RGBA buffer as JPEG at the given quality.
pub fn encode_jpeg(image: &DecodedImage, quality: u8) -> Result<Vec<u8>> {
    let rgba = RgbaImage::from_raw(image.width(), image.height(), image.pixels.clone())
        .ok_or_else(|| Error::Decode("pixel buffer does not match dimensions".to_string()))?;
    let rgb = DynamicImage::ImageRgba8(rgba).into_rgb8();

    let mut cursor = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality);
    rgb.write_with_encoder(encoder).map_err(|err| Error::Decode(format!("jpeg encode: {err}")))?;
    Ok(cursor.into_inner())
}

fn infer_format(name: &str) -> Option<ImageFormat> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .and_then(|ext| ImageFormat::from_extension(ext))
}

fn convert_to_srgb_in_place(image: &mut RgbaImage, profile_bytes: &[u8]) -> Result<()> {
    let src_profile = ColorProfile::new_from_slice(profile_bytes)
        .map_err(|err| Error::Decode(format!("invalid icc profile: {err}")))?;
    let dest_profile = ColorProfile::new_srgb();

    let transform = src_profile
        .create_transform_8bit(Layout::Rgba, &dest_profile, Layout::Rgba, TransformOptions::default())
        .map_err(|err| Error::Decode(format!("icc transform setup: {err}")))?;

    let raw = image.as_mut();
    let mut converted = vec![0u8; raw.len()];
    transform
        .transform(&raw[..], &mut converted)
        .map_err(|err| Error::Decode(format!("icc transform: {err}")))?;
    raw.copy_from_slice(&converted);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    fn sample_image() -> ImageBuffer<Rgba<u8>, Vec<u8>> {
        ImageBuffer::from_fn(2, 2, |x, y| match (x, y) {
            (0, 0) => Rgba([255, 0, 0, 255]),
            (1, 0) => Rgba([0, 255, 0, 255]),
            (0, 1) => Rgba([0, 0, 255, 255]),
            _ => Rgba([255, 255, 0, 255]),
        })
    }

    fn encode_as(format: ImageFormat) -> Vec<u8> {
        let dynamic = DynamicImage::ImageRgba8(sample_image());
        let mut cursor = Cursor::new(Vec::new());
        dynamic.write_to(&mut cursor, format).expect("encode sample");
        cursor.into_inner()
    }

    #[test]
    fn decodes_png() {
        let decoded = decode("page.png", &encode_as(ImageFormat::Png)).expect("decode png");
        assert_eq!(decoded.dimensions, ImageDimensions { width: 2, height: 2 });
        assert_eq!(&decoded.pixels[..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn decodes_despite_misleading_extension() {
        // PNG bytes under a txt-ish name: format guessing takes over.
        let decoded = decode("page", &encode_as(ImageFormat::Png)).expect("decode");
        assert_eq!(decoded.dimensions, ImageDimensions { width: 2, height: 2 });
    }

    #[test]
    fn rejects_empty_and_garbage_input() {
        assert!(matches!(decode("x.png", &[]).unwrap_err(), Error::Decode(_)));
        assert!(matches!(decode("x.png", b"not an image").unwrap_err(), Error::Decode(_)));
    }

    #[test]
    fn jpeg_round_trip_preserves_dimensions() {
        let decoded = decode("page.png", &encode_as(ImageFormat::Png)).unwrap();
        let jpeg = encode_jpeg(&decoded, 85).expect("encode jpeg");
        let again = decode("page.jpg", &jpeg).expect("decode jpeg");
        assert_eq!(again.dimensions, decoded.dimensions);
    }
}
