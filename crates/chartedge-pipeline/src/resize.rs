//! Resize to the fixed working height.
//!
//! Every source image is scaled so its height equals [`TARGET_HEIGHT`],
//! with the width scaled proportionally. All downstream stages (blur,
//! Canny, contour tracing, region crops) operate on this working grid,
//! which keeps artifacts from different templates directly comparable.

use image::RgbImage;
use image::imageops::FilterType;

/// Height of the normalized working image in pixels.
pub const TARGET_HEIGHT: u32 = 512;

/// Resampling filter used for the working image.
///
/// The `image` crate widens the triangle filter's support by the scale
/// factor when shrinking, so every output pixel is an area-weighted
/// average of the source pixels it covers. When enlarging it reduces to
/// bilinear interpolation.
const FILTER: FilterType = FilterType::Triangle;

/// Width of the working image for a `width` × `height` source.
///
/// Rounded to the nearest column, never less than one.
#[must_use]
pub fn working_width(width: u32, height: u32) -> u32 {
    if height == 0 {
        return width.max(1);
    }
    let scaled = f64::from(width) * f64::from(TARGET_HEIGHT) / f64::from(height);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let rounded = scaled.round() as u32;
    rounded.max(1)
}

/// Scale `image` to the working height, preserving aspect ratio.
///
/// Images already at the working size are returned as a copy.
#[must_use = "returns the resized image"]
pub fn resize_to_working_height(image: &RgbImage) -> RgbImage {
    let (w, h) = image.dimensions();
    let target_w = working_width(w, h);
    if (w, h) == (target_w, TARGET_HEIGHT) {
        return image.clone();
    }
    image::imageops::resize(image, target_w, TARGET_HEIGHT, FILTER)
}
