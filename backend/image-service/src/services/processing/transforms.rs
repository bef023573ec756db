//! Byte-to-byte image transforms
//!
//! Every transform decodes its input, works on the pixels and re-encodes as
//! JPEG. Callers run these on a blocking thread.

use super::smart_crop::smart_crop;
use crate::error::{AppError, Result};
use crate::models::Action;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GenericImageView, ImageOutputFormat};
use std::io::Cursor;
use tracing::debug;

/// Bounding box for Resize and exact size for Miniature
pub const TARGET_WIDTH: u32 = 1600;
pub const TARGET_HEIGHT: u32 = 900;

pub const RESIZE_QUALITY: u8 = 85;
pub const DERIVED_QUALITY: u8 = 90;

pub fn apply(action: Action, input: &[u8]) -> Result<Vec<u8>> {
    match action {
        Action::Resize => resize(input),
        Action::Miniature => miniature(input),
        Action::Watermark => watermark(input),
        Action::Grayscale => grayscale(input),
    }
}

/// Fit inside 1600x900 keeping aspect ratio. Smaller images are not enlarged.
pub fn resize(input: &[u8]) -> Result<Vec<u8>> {
    let img = decode(input)?;
    let (width, height) = img.dimensions();
    let (new_width, new_height) = fit_within(width, height, TARGET_WIDTH, TARGET_HEIGHT);

    let resized = if (new_width, new_height) == (width, height) {
        img
    } else {
        img.resize_exact(new_width, new_height, FilterType::Triangle)
    };

    debug!(width, height, new_width, new_height, "Resize applied");
    encode_jpeg(&resized, RESIZE_QUALITY)
}

/// Exactly 1600x900, cropped around the most detailed region
pub fn miniature(input: &[u8]) -> Result<Vec<u8>> {
    let img = decode(input)?;
    let cropped = smart_crop(&img, TARGET_WIDTH, TARGET_HEIGHT);
    encode_jpeg(&cropped, DERIVED_QUALITY)
}

/// Re-encode only; no overlay is drawn
pub fn watermark(input: &[u8]) -> Result<Vec<u8>> {
    let img = decode(input)?;
    encode_jpeg(&img, DERIVED_QUALITY)
}

pub fn grayscale(input: &[u8]) -> Result<Vec<u8>> {
    let img = decode(input)?;
    encode_jpeg(&img.grayscale(), DERIVED_QUALITY)
}

fn decode(input: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(input)
        .map_err(|e| AppError::Transform(format!("Failed to decode image: {e}")))
}

/// JPEG has no alpha channel; anything that is not plain luma goes out as RGB
fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let flattened = match img.color() {
        ColorType::L8 => img.clone(),
        ColorType::L16 | ColorType::La8 | ColorType::La16 => {
            DynamicImage::ImageLuma8(img.to_luma8())
        }
        _ => DynamicImage::ImageRgb8(img.to_rgb8()),
    };

    let mut buf = Vec::new();
    flattened
        .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Jpeg(quality))
        .map_err(|e| AppError::Transform(format!("Failed to encode JPEG: {e}")))?;

    Ok(buf)
}

fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let ratio = f64::min(
        max_width as f64 / width as f64,
        max_height as f64 / height as f64,
    );

    (
        ((width as f64 * ratio).round() as u32).clamp(1, max_width),
        ((height as f64 * ratio).round() as u32).clamp(1, max_height),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 200])
        });
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_fit_within() {
        assert_eq!(fit_within(3200, 1800, 1600, 900), (1600, 900));
        assert_eq!(fit_within(1800, 1800, 1600, 900), (900, 900));
        assert_eq!(fit_within(4000, 500, 1600, 900), (1600, 200));
        assert_eq!(fit_within(640, 480, 1600, 900), (640, 480));
    }

    #[test]
    fn test_resize_shrinks_to_bounding_box() {
        let out = resize(&png(2000, 1000)).unwrap();
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Jpeg);

        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.dimensions(), (1600, 800));
    }

    #[test]
    fn test_resize_keeps_small_image_size() {
        let out = resize(&png(64, 48)).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.dimensions(), (64, 48));
    }

    #[test]
    fn test_miniature_is_exact_size() {
        let out = miniature(&png(320, 320)).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.dimensions(), (TARGET_WIDTH, TARGET_HEIGHT));
    }

    #[test]
    fn test_grayscale_has_equal_channels() {
        let out = grayscale(&png(40, 30)).unwrap();
        let decoded = image::load_from_memory(&out).unwrap().to_rgb8();
        assert!(decoded.pixels().all(|p| p[0] == p[1] && p[1] == p[2]));
    }

    #[test]
    fn test_watermark_reencodes_as_jpeg() {
        let out = watermark(&png(40, 30)).unwrap();
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Jpeg);
        assert_eq!(image::load_from_memory(&out).unwrap().dimensions(), (40, 30));
    }

    #[test]
    fn test_alpha_input_is_flattened() {
        let img = RgbaImage::from_pixel(10, 10, Rgba([10, 20, 30, 128]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
            .unwrap();

        assert!(watermark(&buf).is_ok());
    }

    #[test]
    fn test_undecodable_input_is_transform_error() {
        let result = resize(b"definitely not an image");
        assert!(matches!(result, Err(AppError::Transform(_))));
    }
}
