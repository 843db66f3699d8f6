//! Crop geometry for the XYZ focal-point transform.
//!
//! Pure pixel arithmetic; the actual rasterization lives in the
//! adapters crate.

use crate::error::CoreError;

/// A pixel-aligned extraction region inside a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

/// Validate user-supplied focal-point coordinates.
///
/// `x` and `y` are percentages (0-100); `z` must be positive.
pub fn validate_crop_coords(
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
) -> Result<(), CoreError> {
    if let Some(x) = x {
        if !(0.0..=100.0).contains(&x) {
            return Err(CoreError::Validation(format!("x out of range 0-100: {x}")));
        }
    }
    if let Some(y) = y {
        if !(0.0..=100.0).contains(&y) {
            return Err(CoreError::Validation(format!("y out of range 0-100: {y}")));
        }
    }
    if let Some(z) = z {
        if z <= 0.0 {
            return Err(CoreError::Validation(format!("z must be positive: {z}")));
        }
    }
    Ok(())
}

/// Compute the extraction region for an XYZ focal-point transform.
///
/// `x`/`y` are focal-point percentages of the source dimensions, `z` a
/// zoom percentage. The region multiplier is `100 / z` -- note the
/// inversion: z=100 extracts at 1x (widest view), z=50 extracts a 2x
/// region, z=25 a 4x region. Lower z means LESS zoom, not more. This
/// is counter-intuitive but matches URLs and stored coordinates already
/// in circulation, so it must not be "fixed" here.
///
/// The region is centered on the focal pixel and clamped by shifting
/// (never shrinking) to stay inside the source; a region larger than
/// the source degrades to the full source extent on that axis.
pub fn xyz_extraction(
    src_width: u32,
    src_height: u32,
    target: (u32, u32),
    x: f64,
    y: f64,
    z: f64,
) -> Result<CropRegion, CoreError> {
    validate_crop_coords(Some(x), Some(y), Some(z))?;
    if src_width == 0 || src_height == 0 {
        return Err(CoreError::Validation("source has zero dimensions".into()));
    }

    let (target_w, target_h) = target;

    let focal_x = (x / 100.0 * src_width as f64).round();
    let focal_y = (y / 100.0 * src_height as f64).round();

    let multiplier = 100.0 / z;
    let extract_w = (target_w as f64 * multiplier).round() as i64;
    let extract_h = (target_h as f64 * multiplier).round() as i64;

    let src_w = src_width as i64;
    let src_h = src_height as i64;

    // Center on the focal pixel, then shift in-bounds. When the region
    // exceeds the source, the shift degenerates to the origin and the
    // final min() trims the extent to the source edge.
    let left = (focal_x as i64 - extract_w / 2).clamp(0, (src_w - extract_w).max(0));
    let top = (focal_y as i64 - extract_h / 2).clamp(0, (src_h - extract_h).max(0));

    Ok(CropRegion {
        left: left as u32,
        top: top as u32,
        width: extract_w.min(src_w - left) as u32,
        height: extract_h.min(src_h - top) as u32,
    })
}
