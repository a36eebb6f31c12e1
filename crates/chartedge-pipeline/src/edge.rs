//! Edge map production: Canny threshold pairs and edge-map helpers.
//!
//! Wraps [`crate::canny::canny`] with the named threshold pairs the
//! pipeline uses. Returns binary images where white pixels (255) are
//! edges and black pixels (0) are background.

use image::GrayImage;
use serde::{Deserialize, Serialize};

/// A low/high hysteresis threshold pair on the L1 Sobel magnitude scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Weak-edge threshold: pixels above it survive only when connected
    /// to a strong edge.
    pub lower: u32,
    /// Strong-edge threshold: pixels above it are always edges.
    pub upper: u32,
}

impl Thresholds {
    /// Thresholds of the baseline `edge_image`.
    pub const DEFAULT: Self = Self {
        lower: 50,
        upper: 150,
    };

    /// Thresholds applied after the blur branch's heavier smoothing.
    pub const BLUR_BRANCH: Self = Self {
        lower: 100,
        upper: 200,
    };
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Detect edges in an already-smoothed grayscale image.
///
/// `lower` is clamped to at most `upper` so an out-of-order pair cannot
/// reach the detector; branch validation rejects such pairs before this
/// point.
#[must_use = "returns the binary edge map"]
#[allow(clippy::cast_precision_loss)]
pub fn detect_edges(image: &GrayImage, thresholds: Thresholds) -> GrayImage {
    let upper = thresholds.upper as f32;
    let lower = (thresholds.lower as f32).min(upper);
    crate::canny::canny(image, lower, upper)
}

/// Number of edge (non-zero) pixels in an edge map.
#[must_use]
pub fn count_edge_pixels(edges: &GrayImage) -> u64 {
    edges.pixels().map(|p| u64::from(p.0[0] > 0)).sum()
}
