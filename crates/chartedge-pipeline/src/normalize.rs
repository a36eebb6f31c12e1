//! Normalization stage: bring any decoded input into the canonical
//! working form before technique branches run.
//!
//! ```text
//! bytes ─▶ decode (RGB8) ─▶ resize (H = 512) ─▶ grayscale ─▶ 5×5 Gaussian
//!            original            original         grayscale     denoised
//! ```
//!
//! The denoised grayscale feeds the baseline edge map only. Branches that
//! choose their own smoothing start again from the unsmoothed grayscale.

use std::time::Instant;

use log::debug;

use crate::blur::{self, DENOISE_KERNEL_SIZE};
use crate::decode::{self, ImageSource};
use crate::edge::{self, Thresholds};
use crate::resize;
use crate::types::{Dimensions, GrayImage, PipelineError, RgbImage};

/// Output of the normalization stage.
///
/// All three images share [`dimensions`](Self::dimensions). The value is
/// immutable and read concurrently by every technique branch.
#[derive(Debug, Clone)]
pub struct Normalized {
    /// Colour working image (resized, 3 channels).
    pub original: RgbImage,
    /// Unsmoothed grayscale of the working image.
    pub grayscale: GrayImage,
    /// Grayscale after the fixed 5×5 Gaussian denoising pass.
    pub denoised: GrayImage,
    /// Working image dimensions.
    pub dimensions: Dimensions,
}

impl Normalized {
    /// Build the working set from an already-decoded colour image.
    #[must_use]
    pub fn from_rgb(decoded: &RgbImage) -> Self {
        let original = resize::resize_to_working_height(decoded);
        let grayscale = decode::to_grayscale(&original);
        let denoised = blur::gaussian_blur(&grayscale, DENOISE_KERNEL_SIZE, 0.0);
        let dimensions = Dimensions {
            width: original.width(),
            height: original.height(),
            channels: 3,
        };
        Self {
            original,
            grayscale,
            denoised,
            dimensions,
        }
    }

    /// Baseline edge map: Canny (50, 150) on the denoised grayscale.
    #[must_use]
    pub fn baseline_edges(&self) -> GrayImage {
        edge::detect_edges(&self.denoised, Thresholds::DEFAULT)
    }
}

/// Decode and normalize a source image.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`], [`PipelineError::Base64`] or
/// [`PipelineError::Decode`] when the source cannot be decoded. Nothing
/// after decoding can fail.
pub fn normalize(source: ImageSource<'_>) -> Result<Normalized, PipelineError> {
    let start = Instant::now();
    let decoded = decode::decode(source)?;
    debug!(
        "decoded {}x{} source in {:?}",
        decoded.width(),
        decoded.height(),
        start.elapsed()
    );

    let start = Instant::now();
    let normalized = Normalized::from_rgb(&decoded);
    debug!(
        "normalized to {}x{} in {:?}",
        normalized.dimensions.width,
        normalized.dimensions.height,
        start.elapsed()
    );
    Ok(normalized)
}
