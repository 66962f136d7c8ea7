//! Pixel-level transforms: rotation and tone adjustments.

use image::RgbaImage;

use crate::codec::DecodedImage;
use crate::error::Error;
use crate::types::ImageDimensions;

use super::Result;

/// Rotate clockwise by 90, 180, or 270 degrees. Any other angle is rejected.
pub fn rotate(source: &DecodedImage, degrees: u16) -> Result<DecodedImage> {
    let image =
        RgbaImage::from_raw(source.width(), source.height(), source.pixels().to_vec())
            .ok_or_else(|| Error::Decode("pixel buffer does not match dimensions".to_string()))?;

    let rotated = match degrees {
        90 => image::imageops::rotate90(&image),
        180 => image::imageops::rotate180(&image),
        270 => image::imageops::rotate270(&image),
        other => {
            return Err(Error::Validation(format!(
                "rotation must be 90, 180, or 270 degrees, got {other}"
            )));
        }
    };

    let dimensions = ImageDimensions { width: rotated.width(), height: rotated.height() };
    Ok(DecodedImage { dimensions, pixels: rotated.into_raw() })
}

/// Multiply every colour channel by `factor`, clamped to `[0, 255]`. Alpha
/// passes through.
pub fn adjust_brightness(source: &DecodedImage, factor: f32) -> DecodedImage {
    map_channels(source, |channel| channel as f32 * factor)
}

/// Linear contrast around mid-grey: `factor * channel + (1 - factor) * 128`,
/// clamped to `[0, 255]`. Alpha passes through.
pub fn adjust_contrast(source: &DecodedImage, factor: f32) -> DecodedImage {
    map_channels(source, |channel| factor * channel as f32 + (1.0 - factor) * 128.0)
}

fn map_channels(source: &DecodedImage, op: impl Fn(u8) -> f32) -> DecodedImage {
    let mut pixels = source.pixels().to_vec();
    for pixel in pixels.chunks_exact_mut(4) {
        for channel in &mut pixel[..3] {
            *channel = op(*channel).clamp(0.0, 255.0).round() as u8;
        }
    }
    DecodedImage { dimensions: source.dimensions, pixels }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_one(left: [u8; 4], right: [u8; 4]) -> DecodedImage {
        let mut pixels = Vec::new();
        pixels.extend_from_slice(&left);
        pixels.extend_from_slice(&right);
        DecodedImage { dimensions: ImageDimensions { width: 2, height: 1 }, pixels }
    }

    #[test]
    fn rotation_swaps_dimensions_and_rejects_odd_angles() {
        let src = two_by_one([1, 2, 3, 255], [4, 5, 6, 255]);

        let out = rotate(&src, 90).unwrap();
        assert_eq!(out.dimensions, ImageDimensions { width: 1, height: 2 });

        let out = rotate(&src, 180).unwrap();
        assert_eq!(out.dimensions, src.dimensions);
        assert_eq!(&out.pixels()[..4], &[4, 5, 6, 255]);

        assert!(matches!(rotate(&src, 45).unwrap_err(), Error::Validation(_)));
        assert!(matches!(rotate(&src, 0).unwrap_err(), Error::Validation(_)));
    }

    #[test]
    fn brightness_multiplies_and_clamps() {
        let src = two_by_one([10, 100, 200, 128], [0, 255, 50, 7]);
        let out = adjust_brightness(&src, 2.0);

        assert_eq!(&out.pixels()[..4], &[20, 200, 255, 128]);
        assert_eq!(&out.pixels()[4..], &[0, 255, 100, 7]);
    }

    #[test]
    fn contrast_pivots_around_mid_grey() {
        let src = two_by_one([128, 0, 255, 9], [64, 192, 128, 9]);
        let out = adjust_contrast(&src, 2.0);

        // 128 is the fixed point; extremes clamp.
        assert_eq!(&out.pixels()[..4], &[128, 0, 255, 9]);
        assert_eq!(&out.pixels()[4..], &[0, 255, 128, 9]);
    }

    #[test]
    fn unit_factor_is_identity() {
        let src = two_by_one([12, 34, 56, 78], [90, 11, 22, 33]);
        assert_eq!(adjust_brightness(&src, 1.0).pixels(), src.pixels());
        assert_eq!(adjust_contrast(&src, 1.0).pixels(), src.pixels());
    }
}
