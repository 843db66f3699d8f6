//! Raster transform engine: content-aware cropping, XYZ focal-point
//! extraction, and lossy WebP encoding.
//!
//! The auto-crop mirrors the usual cover-resize-then-slide approach:
//! scale the source so the target box is covered, slide a target-sized
//! window along the overflowing axis, and keep the best-scoring
//! candidate. Two scoring strategies exist: entropy (maximize retained
//! visual detail) and attention (weight edges, skin tones, and
//! saturation as a face-centered stand-in).

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbImage};

use pictura_core::crop::CropRegion;

use crate::AdapterError;

/// WebP quality for generated shape files.
pub const WEBP_QUALITY: f32 = 85.0;

/// Number of candidate windows evaluated along the sliding axis.
const SCAN_STEPS: u32 = 16;

/// Content-aware auto-crop strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropStrategy {
    /// Maximize greyscale histogram entropy in the kept window.
    Entropy,
    /// Maximize an edge/skin/saturation salience score.
    Attention,
}

/// Cover-resize `source` to the target box, then crop the
/// best-scoring target-sized window.
pub fn smart_crop(
    source: &DynamicImage,
    target_w: u32,
    target_h: u32,
    strategy: CropStrategy,
) -> DynamicImage {
    let (w, h) = source.dimensions();
    let scale = (target_w as f64 / w as f64).max(target_h as f64 / h as f64);
    let scaled_w = ((w as f64 * scale).round() as u32).max(target_w);
    let scaled_h = ((h as f64 * scale).round() as u32).max(target_h);
    let scaled = source.resize_exact(scaled_w, scaled_h, FilterType::Lanczos3);

    let rgb = scaled.to_rgb8();
    let horizontal = scaled_w - target_w >= scaled_h - target_h;
    let span = if horizontal {
        scaled_w - target_w
    } else {
        scaled_h - target_h
    };

    let step = (span / SCAN_STEPS).max(1) as usize;
    let mut best_offset = 0;
    let mut best_score = f64::NEG_INFINITY;
    for offset in (0..=span).step_by(step) {
        let (x, y) = if horizontal { (offset, 0) } else { (0, offset) };
        let score = match strategy {
            CropStrategy::Entropy => entropy_score(&rgb, x, y, target_w, target_h),
            CropStrategy::Attention => attention_score(&rgb, x, y, target_w, target_h),
        };
        if score > best_score {
            best_score = score;
            best_offset = offset;
        }
    }

    let (x, y) = if horizontal { (best_offset, 0) } else { (0, best_offset) };
    scaled.crop_imm(x, y, target_w, target_h)
}

/// Crop a pre-computed extraction region and resize it down to the
/// target dimensions (the XYZ focal-point path).
pub fn extract_and_resize(
    source: &DynamicImage,
    region: CropRegion,
    target_w: u32,
    target_h: u32,
) -> DynamicImage {
    source
        .crop_imm(region.left, region.top, region.width, region.height)
        .resize_exact(target_w, target_h, FilterType::Lanczos3)
}

/// Encode an image as lossy WebP at the fixed shape quality.
pub fn encode_webp(img: &DynamicImage) -> Result<Vec<u8>, AdapterError> {
    // The lossy encoder only accepts RGB8/RGBA8 layouts.
    let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
    let encoder = webp::Encoder::from_image(&rgba)
        .map_err(|e| AdapterError::Encode(format!("webp: {e}")))?;
    Ok(encoder.encode(WEBP_QUALITY).to_vec())
}

// ---------------------------------------------------------------------------
// Window scoring
// ---------------------------------------------------------------------------

/// Shannon entropy (base 2) of the window's luma histogram.
fn entropy_score(rgb: &RgbImage, x0: u32, y0: u32, w: u32, h: u32) -> f64 {
    let mut histogram = [0u32; 64];
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            let bin = (luma(rgb.get_pixel(x, y)) / 4.0) as usize;
            histogram[bin.min(63)] += 1;
        }
    }

    let total = (w * h) as f64;
    histogram
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Edge weight in the attention score.
const EDGE_WEIGHT: f64 = 0.3;
/// Skin-likelihood weight; dominates so portraits keep faces.
const SKIN_WEIGHT: f64 = 1.8;
/// Saturation weight.
const SATURATION_WEIGHT: f64 = 0.2;

/// Salience score: gradient magnitude plus skin-tone and saturation
/// bonuses, averaged over the window.
fn attention_score(rgb: &RgbImage, x0: u32, y0: u32, w: u32, h: u32) -> f64 {
    let (img_w, img_h) = rgb.dimensions();
    let mut score = 0.0;

    for y in y0..y0 + h {
        for x in x0..x0 + w {
            let pixel = rgb.get_pixel(x, y);
            let here = luma(pixel);

            let right = if x + 1 < img_w {
                luma(rgb.get_pixel(x + 1, y))
            } else {
                here
            };
            let below = if y + 1 < img_h {
                luma(rgb.get_pixel(x, y + 1))
            } else {
                here
            };
            let edge = ((here - right).abs() + (here - below).abs()) / 255.0;

            score += EDGE_WEIGHT * edge
                + SKIN_WEIGHT * skin_likelihood(pixel)
                + SATURATION_WEIGHT * saturation(pixel);
        }
    }

    score / (w * h) as f64
}

fn luma(pixel: &image::Rgb<u8>) -> f64 {
    let [r, g, b] = pixel.0;
    0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
}

/// Rough skin classifier: warm, red-dominant, not too dark.
fn skin_likelihood(pixel: &image::Rgb<u8>) -> f64 {
    let [r, g, b] = pixel.0;
    let (r, g, b) = (r as f64, g as f64, b as f64);
    if r > 95.0 && g > 40.0 && b > 20.0 && r > g && g > b && r - b > 15.0 {
        1.0
    } else {
        0.0
    }
}

fn saturation(pixel: &image::Rgb<u8>) -> f64 {
    let [r, g, b] = pixel.0;
    let max = r.max(g).max(b) as f64;
    let min = r.min(g).min(b) as f64;
    if max == 0.0 {
        0.0
    } else {
        (max - min) / max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// 200x100 image: flat grey left half, high-detail right half.
    fn half_detailed() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(200, 100, |x, y| {
            if x < 100 {
                Rgb([128, 128, 128])
            } else {
                // Pseudo-texture with many distinct luma values.
                let v = ((x * 7 + y * 13) % 251) as u8;
                Rgb([v, v.wrapping_add(40), v.wrapping_mul(3)])
            }
        }))
    }

    #[test]
    fn smart_crop_outputs_target_dimensions() {
        let img = half_detailed();
        for (w, h) in [(64, 64), (128, 128), (336, 168), (126, 224)] {
            let cropped = smart_crop(&img, w, h, CropStrategy::Entropy);
            assert_eq!(cropped.dimensions(), (w, h));
        }
    }

    #[test]
    fn entropy_crop_prefers_the_detailed_half() {
        let img = half_detailed();
        let flat = entropy_score(&img.to_rgb8(), 0, 0, 100, 100);
        let busy = entropy_score(&img.to_rgb8(), 100, 0, 100, 100);
        assert!(busy > flat, "busy={busy} flat={flat}");
    }

    #[test]
    fn attention_crop_prefers_the_skin_toned_half() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(200, 100, |x, _| {
            if x < 100 {
                Rgb([60, 120, 60])
            } else {
                Rgb([210, 150, 110])
            }
        }));
        let rgb = img.to_rgb8();
        let plain = attention_score(&rgb, 0, 0, 100, 100);
        let skin = attention_score(&rgb, 100, 0, 100, 100);
        assert!(skin > plain, "skin={skin} plain={plain}");
    }

    #[test]
    fn scoring_is_deterministic() {
        let img = half_detailed();
        let a = smart_crop(&img, 64, 64, CropStrategy::Attention).to_rgb8();
        let b = smart_crop(&img, 64, 64, CropStrategy::Attention).to_rgb8();
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn extract_and_resize_honours_region() {
        let img = half_detailed();
        let region = CropRegion { left: 100, top: 0, width: 100, height: 100 };
        let out = extract_and_resize(&img, region, 64, 64);
        assert_eq!(out.dimensions(), (64, 64));
    }

    #[test]
    fn webp_encoding_produces_riff_container() {
        let img = half_detailed();
        let bytes = encode_webp(&img).unwrap();
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WEBP");
    }
}
