//! Resampling and crop geometry built on `fast_image_resize`.

use fast_image_resize as fir;

use crate::codec::DecodedImage;
use crate::error::Error;
use crate::types::ImageDimensions;

use super::Result;

/// Filtering kernels supported by the resizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeFilter {
    /// Fastest option, mostly useful for tests.
    Nearest,
    Bilinear,
    /// Catmull-Rom bicubic interpolation.
    CatmullRom,
    /// High quality down/up scaling.
    #[default]
    Lanczos3,
}

impl From<ResizeFilter> for fir::ResizeAlg {
    fn from(value: ResizeFilter) -> Self {
        use fir::FilterType;
        match value {
            ResizeFilter::Nearest => fir::ResizeAlg::Nearest,
            ResizeFilter::Bilinear => fir::ResizeAlg::Convolution(FilterType::Bilinear),
            ResizeFilter::CatmullRom => fir::ResizeAlg::Convolution(FilterType::CatmullRom),
            ResizeFilter::Lanczos3 => fir::ResizeAlg::Convolution(FilterType::Lanczos3),
        }
    }
}

/// Resize an RGBA8888 buffer to exactly `target`.
pub fn resize_rgba(
    source: &DecodedImage,
    target: ImageDimensions,
    filter: ResizeFilter,
) -> Result<DecodedImage> {
    let (src_width, src_height) = (source.width(), source.height());
    if src_width == 0 || src_height == 0 {
        return Err(Error::Decode("source image has zero dimensions".to_string()));
    }
    if target.width == 0 || target.height == 0 {
        return Err(Error::Validation("target dimensions must be non-zero".to_string()));
    }

    if src_width == target.width && src_height == target.height {
        return Ok(source.clone());
    }

    let expected = src_width as usize * src_height as usize * 4;
    if source.pixels().len() < expected {
        return Err(Error::Decode("source buffer is smaller than expected".to_string()));
    }

    let src_view =
        fir::images::ImageRef::new(src_width, src_height, source.pixels(), fir::PixelType::U8x4)
            .map_err(|err| Error::Decode(format!("preparing source image: {err}")))?;
    let mut dst_image = fir::images::Image::new(target.width, target.height, fir::PixelType::U8x4);

    let options = fir::ResizeOptions::new().resize_alg(filter.into()).use_alpha(true);
    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_view, &mut dst_image, Some(&options))
        .map_err(|err| Error::Decode(format!("resize failed: {err}")))?;

    Ok(DecodedImage { dimensions: target, pixels: dst_image.into_vec() })
}

/// Largest dimensions of `source`'s aspect that fit inside `bounds`, never
/// upscaled.
pub fn fit_within(source: ImageDimensions, bounds: ImageDimensions) -> ImageDimensions {
    let scale = f64::min(
        bounds.width as f64 / source.width.max(1) as f64,
        bounds.height as f64 / source.height.max(1) as f64,
    )
    .min(1.0);
    scaled(source, scale)
}

/// Smallest dimensions of `source`'s aspect that fully cover `bounds`.
pub fn cover_box(source: ImageDimensions, bounds: ImageDimensions) -> ImageDimensions {
    let scale = f64::max(
        bounds.width as f64 / source.width.max(1) as f64,
        bounds.height as f64 / source.height.max(1) as f64,
    );
    let covered = scaled(source, scale);
    // Rounding must not undershoot the box.
    ImageDimensions {
        width: covered.width.max(bounds.width),
        height: covered.height.max(bounds.height),
    }
}

fn scaled(source: ImageDimensions, scale: f64) -> ImageDimensions {
    ImageDimensions {
        width: ((source.width as f64 * scale).round() as u32).max(1),
        height: ((source.height as f64 * scale).round() as u32).max(1),
    }
}

/// Cut a centred `target` window out of `source`. The source must be at
/// least as large as the target on both axes.
pub fn crop_center(source: &DecodedImage, target: ImageDimensions) -> Result<DecodedImage> {
    let (src_width, src_height) = (source.width(), source.height());
    if target.width > src_width || target.height > src_height {
        return Err(Error::Validation(format!(
            "crop {}x{} exceeds source {src_width}x{src_height}",
            target.width, target.height
        )));
    }

    let left = ((src_width - target.width) / 2) as usize;
    let top = ((src_height - target.height) / 2) as usize;
    let src_stride = src_width as usize * 4;
    let row_bytes = target.width as usize * 4;

    let mut pixels = Vec::with_capacity(row_bytes * target.height as usize);
    for row in 0..target.height as usize {
        let start = (top + row) * src_stride + left * 4;
        pixels.extend_from_slice(&source.pixels()[start..start + row_bytes]);
    }

    Ok(DecodedImage { dimensions: target, pixels })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> DecodedImage {
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&[(x % 256) as u8, (y % 256) as u8, 0, 255]);
            }
        }
        DecodedImage { dimensions: ImageDimensions { width, height }, pixels }
    }

    #[test]
    fn resizes_to_exact_dimensions() {
        let src = gradient(4, 4);
        let out =
            resize_rgba(&src, ImageDimensions { width: 8, height: 8 }, ResizeFilter::default())
                .unwrap();
        assert_eq!(out.width(), 8);
        assert_eq!(out.pixels().len(), 8 * 8 * 4);
    }

    #[test]
    fn zero_target_is_a_validation_error() {
        let src = gradient(4, 4);
        let err = resize_rgba(&src, ImageDimensions { width: 0, height: 4 }, ResizeFilter::Nearest)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn fit_preserves_aspect_and_never_upscales() {
        let bounds = ImageDimensions { width: 100, height: 100 };
        let tall = fit_within(ImageDimensions { width: 200, height: 400 }, bounds);
        assert_eq!(tall, ImageDimensions { width: 50, height: 100 });

        let small = fit_within(ImageDimensions { width: 30, height: 40 }, bounds);
        assert_eq!(small, ImageDimensions { width: 30, height: 40 });
    }

    #[test]
    fn cover_reaches_both_axes() {
        let bounds = ImageDimensions { width: 100, height: 100 };
        let covered = cover_box(ImageDimensions { width: 200, height: 400 }, bounds);
        assert_eq!(covered.width, 100);
        assert_eq!(covered.height, 200);

        let upscaled = cover_box(ImageDimensions { width: 50, height: 25 }, bounds);
        assert!(upscaled.width >= 100 && upscaled.height >= 100);
    }

    #[test]
    fn center_crop_takes_the_middle_window() {
        let src = gradient(6, 4);
        let out = crop_center(&src, ImageDimensions { width: 2, height: 2 }).unwrap();
        assert_eq!(out.width(), 2);
        // First cropped pixel sits at source (2, 1).
        assert_eq!(&out.pixels()[..4], &[2, 1, 0, 255]);

        let err = crop_center(&src, ImageDimensions { width: 10, height: 2 }).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
