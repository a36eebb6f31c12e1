//! Gaussian smoothing with an explicit kernel size.
//!
//! Edge detection is sensitive to JPEG blocking and anti-aliasing noise,
//! so grayscale images are smoothed first. Unlike
//! `imageproc::filter::gaussian_blur_f32`, which derives the kernel
//! extent from sigma, callers here choose the kernel size and may let
//! sigma be derived from it.
//!
//! The image is widened into an `f32` buffer padded with reflect-101
//! borders (`dcb|abcd|cba`) and handed to
//! `imageproc::filter::separable_filter_equal`. Its own continuity padding
//! never reaches the pixels that are kept.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::filter::separable_filter_equal;

type FloatImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Kernel size of the fixed denoising pass applied before the baseline
/// edge map.
pub const DENOISE_KERNEL_SIZE: u32 = 5;

/// Largest kernel size accepted for an image of `width` x `height`.
///
/// At `2 * max(width, height) + 1` taps every pixel already weighs in
/// every other pixel along both axes.
#[must_use]
pub const fn max_kernel_size(width: u32, height: u32) -> u32 {
    let longest = if width > height { width } else { height };
    longest.saturating_mul(2).saturating_add(1)
}

/// Sigma derived from a kernel size when the caller passes `sigma <= 0`.
///
/// For the 5-tap denoising kernel this is 1.1.
#[must_use]
pub fn auto_sigma(kernel_size: u32) -> f64 {
    0.3f64.mul_add((f64::from(kernel_size) - 1.0).mul_add(0.5, -1.0), 0.8)
}

/// Build a normalized 1D Gaussian kernel.
///
/// The kernel has `2 * (kernel_size / 2) + 1` taps, so even sizes grow
/// to the next odd size. Non-positive `sigma` is replaced by
/// [`auto_sigma`].
#[must_use]
pub fn gaussian_kernel(kernel_size: u32, sigma: f64) -> Vec<f32> {
    let radius = kernel_size / 2;
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        auto_sigma(2 * radius + 1)
    };
    let denom = 2.0 * sigma * sigma;

    let raw: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let x = f64::from(i) - f64::from(radius);
            (-(x * x) / denom).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();

    #[allow(clippy::cast_possible_truncation)]
    raw.into_iter().map(|v| (v / sum) as f32).collect()
}

/// Smooth a grayscale image with a `kernel_size` × `kernel_size`
/// Gaussian.
///
/// A single-tap kernel or an empty image returns the image unchanged.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &GrayImage, kernel_size: u32, sigma: f64) -> GrayImage {
    let kernel = gaussian_kernel(kernel_size, sigma);
    if kernel.len() == 1 || image.width() == 0 || image.height() == 0 {
        return image.clone();
    }

    let (w, h) = image.dimensions();
    #[allow(clippy::cast_possible_truncation)]
    let radius = (kernel.len() / 2) as u32;
    let padded = FloatImage::from_fn(w + 2 * radius, h + 2 * radius, |x, y| {
        let sx = reflect_101(i64::from(x) - i64::from(radius), w);
        let sy = reflect_101(i64::from(y) - i64::from(radius), h);
        Luma([f32::from(image.get_pixel(sx, sy).0[0])])
    });
    let smoothed = separable_filter_equal(&padded, &kernel);

    GrayImage::from_fn(w, h, |x, y| {
        let v = smoothed.get_pixel(x + radius, y + radius).0[0];
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Luma([v.round().clamp(0.0, 255.0) as u8])
    })
}

/// Map a possibly out-of-range coordinate into `0..len` by mirroring
/// about the edge pixels without repeating them.
pub(crate) fn reflect_101(mut i: i64, len: u32) -> u32 {
    let n = i64::from(len);
    if n <= 1 {
        return 0;
    }
    while i < 0 || i >= n {
        if i < 0 {
            i = -i;
        }
        if i >= n {
            i = 2 * (n - 1) - i;
        }
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let mapped = i as u32;
    mapped
}
