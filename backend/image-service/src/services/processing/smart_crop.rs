//! Content-aware cropping
//!
//! The crop window is chosen on the source image at the target aspect ratio,
//! so at most one axis overflows. A saliency map (edge strength blended with
//! local variance, computed on a quarter-size grayscale copy) is projected onto
//! that axis and the window with the highest total is kept. Equal scores
//! favour the centre. Only the cropped window is scaled to the target size, so
//! memory follows the input rather than the scale factor.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, GrayImage};

const SALIENCY_SCALE: u32 = 4;

/// Crop `img` to exactly `target_width` x `target_height`
pub fn smart_crop(img: &DynamicImage, target_width: u32, target_height: u32) -> DynamicImage {
    let (x, y, width, height) = crop_window(img, target_width, target_height);
    let cropped = img.crop_imm(x, y, width, height);

    if (width, height) == (target_width, target_height) {
        cropped
    } else {
        cropped.resize_exact(target_width, target_height, FilterType::Triangle)
    }
}

/// Largest window with the target aspect ratio that fits inside the source
fn window_size(width: u32, height: u32, target_width: u32, target_height: u32) -> (u32, u32) {
    let target_ratio = target_width as f64 / target_height as f64;

    if width as f64 / height as f64 > target_ratio {
        let window_width = ((height as f64 * target_ratio).round() as u32).clamp(1, width);
        (window_width, height)
    } else {
        let window_height = ((width as f64 / target_ratio).round() as u32).clamp(1, height);
        (width, window_height)
    }
}

/// Origin and size, in source pixels, of the most salient target-shaped window
fn crop_window(img: &DynamicImage, target_width: u32, target_height: u32) -> (u32, u32, u32, u32) {
    let (width, height) = img.dimensions();
    let (window_width, window_height) = window_size(width, height, target_width, target_height);

    if (window_width, window_height) == (width, height) {
        return (0, 0, width, height);
    }

    let saliency = SaliencyMap::compute(img);

    let x = if width > window_width {
        best_offset(&saliency.column_totals(), width, window_width)
    } else {
        0
    };
    let y = if height > window_height {
        best_offset(&saliency.row_totals(), height, window_height)
    } else {
        0
    };

    (x, y, window_width, window_height)
}

/// Pick the start of the `window`-long span (in full-resolution pixels) whose
/// projected saliency is highest. `totals` is the projection at reduced scale.
fn best_offset(totals: &[f32], full_len: u32, window: u32) -> u32 {
    let max_offset = full_len.saturating_sub(window);
    if totals.is_empty() || max_offset == 0 {
        return 0;
    }

    let len = totals.len();
    let ratio = full_len as f64 / len as f64;
    let span = ((window as f64 / ratio).round() as usize).clamp(1, len);

    let mut prefix = Vec::with_capacity(len + 1);
    prefix.push(0.0f64);
    for value in totals {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + *value as f64);
    }

    let center = (len - span) as f64 / 2.0;
    let mut best_start = 0usize;
    let mut best_score = f64::MIN;
    let mut best_distance = f64::MAX;

    for start in 0..=(len - span) {
        let score = prefix[start + span] - prefix[start];
        let distance = (start as f64 - center).abs();
        let tolerance = 1e-6 * best_score.abs().max(1.0);

        if score > best_score + tolerance
            || ((score - best_score).abs() <= tolerance && distance < best_distance)
        {
            best_start = start;
            best_score = score;
            best_distance = distance;
        }
    }

    ((best_start as f64 * ratio).round() as u32).min(max_offset)
}

struct SaliencyMap {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl SaliencyMap {
    fn compute(img: &DynamicImage) -> Self {
        let (width, height) = img.dimensions();
        let small_width = (width / SALIENCY_SCALE).max(1);
        let small_height = (height / SALIENCY_SCALE).max(1);

        let gray: GrayImage = imageops::resize(
            &img.to_luma8(),
            small_width,
            small_height,
            FilterType::Triangle,
        );

        let mut values = vec![0.0f32; (small_width * small_height) as usize];
        let px = |x: u32, y: u32| gray.get_pixel(x, y)[0] as i32;

        for y in 1..small_height.saturating_sub(1) {
            for x in 1..small_width.saturating_sub(1) {
                let gx = px(x + 1, y) - px(x - 1, y);
                let gy = px(x, y + 1) - px(x, y - 1);
                let edge = ((gx * gx + gy * gy) as f32).sqrt();

                let mut sum = 0i32;
                let mut sum_sq = 0i32;
                for ny in y - 1..=y + 1 {
                    for nx in x - 1..=x + 1 {
                        let p = px(nx, ny);
                        sum += p;
                        sum_sq += p * p;
                    }
                }
                let mean = sum as f32 / 9.0;
                let variance = sum_sq as f32 / 9.0 - mean * mean;

                values[(y * small_width + x) as usize] = edge * 0.6 + variance * 0.4;
            }
        }

        Self {
            width: small_width,
            height: small_height,
            values,
        }
    }

    fn column_totals(&self) -> Vec<f32> {
        let mut totals = vec![0.0f32; self.width as usize];
        for row in self.values.chunks(self.width as usize) {
            for (total, value) in totals.iter_mut().zip(row) {
                *total += value;
            }
        }
        totals
    }

    fn row_totals(&self) -> Vec<f32> {
        self.values
            .chunks(self.width as usize)
            .take(self.height as usize)
            .map(|row| row.iter().sum())
            .collect()
    }
}
