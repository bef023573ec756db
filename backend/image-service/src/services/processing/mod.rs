//! Transformation pipeline
//!
//! Applies an ordered list of named actions to an image, feeding each output
//! into the next. Names are resolved up front so an unknown action fails
//! before any pixel work starts.

pub mod smart_crop;
pub mod transforms;

use crate::error::{AppError, Result};
use crate::metrics::{result_label, IMAGE_PIPELINE_DURATION_SECONDS};
use crate::models::Action;
use bytes::Bytes;
use image::ImageFormat;
use std::time::Instant;
use tracing::debug;

pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

pub struct Pipeline;

impl Pipeline {
    /// Map wire names onto actions, failing on the first unknown one
    pub fn resolve<S: AsRef<str>>(names: &[S]) -> Result<Vec<Action>> {
        names.iter().map(|name| name.as_ref().parse()).collect()
    }

    /// Run the pipeline on a blocking thread
    pub async fn apply<S: AsRef<str>>(names: &[S], input: Bytes) -> Result<Bytes> {
        let actions = Self::resolve(names)?;
        let started = Instant::now();

        let result = tokio::task::spawn_blocking(move || Self::apply_blocking(&actions, input))
            .await
            .map_err(|e| AppError::Internal(format!("Transform task panicked: {e}")))?;

        IMAGE_PIPELINE_DURATION_SECONDS
            .with_label_values(&[result_label(&result)])
            .observe(started.elapsed().as_secs_f64());

        result
    }

    /// Apply `actions` in order; aborts on the first failing transform
    pub fn apply_blocking(actions: &[Action], input: Bytes) -> Result<Bytes> {
        actions.iter().try_fold(input, |current, action| {
            let output = transforms::apply(*action, &current)?;
            debug!(action = %action, input_len = current.len(), output_len = output.len(), "Transform applied");
            Ok(Bytes::from(output))
        })
    }
}

/// MIME type guessed from the leading bytes
pub fn sniff_content_type(data: &[u8]) -> &'static str {
    match image::guess_format(data) {
        Ok(ImageFormat::Jpeg) => "image/jpeg",
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::Gif) => "image/gif",
        Ok(ImageFormat::WebP) => "image/webp",
        Ok(ImageFormat::Bmp) => "image/bmp",
        Ok(ImageFormat::Tiff) => "image/tiff",
        _ => FALLBACK_CONTENT_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GenericImageView, ImageOutputFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Bytes {
        let img = RgbImage::from_fn(width, height, |x, _| Rgb([(x % 256) as u8, 90, 30]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
            .unwrap();
        Bytes::from(buf)
    }

    #[test]
    fn test_resolve_rejects_unknown_before_work() {
        let result = Pipeline::resolve(&["Resize", "Bogus", "Grayscale"]);
        assert!(matches!(result, Err(AppError::UnknownAction(name)) if name == "Bogus"));
    }

    #[test]
    fn test_resolve_accepts_legacy_alias() {
        let actions = Pipeline::resolve(&["Miniature_generate"]).unwrap();
        assert_eq!(actions, vec![Action::Miniature]);
    }

    #[tokio::test]
    async fn test_apply_composes_in_order() {
        let input = png(2400, 1200);

        let gray_then_resize = Pipeline::apply(&["Grayscale", "Resize"], input.clone())
            .await
            .unwrap();
        let resize_then_gray = Pipeline::apply(&["Resize", "Grayscale"], input.clone())
            .await
            .unwrap();

        for out in [&gray_then_resize, &resize_then_gray] {
            assert_eq!(sniff_content_type(out), "image/jpeg");
            let decoded = image::load_from_memory(out).unwrap();
            assert_eq!(decoded.dimensions(), (1600, 800));
        }
    }

    #[tokio::test]
    async fn test_apply_surfaces_decode_failure() {
        let result = Pipeline::apply(&["Resize"], Bytes::from_static(b"\x00\x01\x02")).await;
        assert!(matches!(result, Err(AppError::Transform(_))));
    }

    #[test]
    fn test_sniff_content_type() {
        assert_eq!(sniff_content_type(&png(2, 2)), "image/png");
        assert_eq!(sniff_content_type(b"plain text"), FALLBACK_CONTENT_TYPE);
    }
}
