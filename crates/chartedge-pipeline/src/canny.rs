//! Canny edge detection on a pre-smoothed grayscale image.
//!
//! Structured like `imageproc::edges::canny` (gradient, non-maximum
//! suppression, hysteresis) with three differences:
//!
//! 1. **No internal blur.** Callers smooth explicitly so each technique
//!    branch controls its own kernel.
//! 2. **L1 gradient magnitude** `|gx| + |gy|` from 3×3 Sobel kernels with
//!    reflect-101 borders, which is the scale the 50/150 and 100/200
//!    threshold pairs are tuned for.
//! 3. **Border-safe hysteresis** over all 8 neighbours (upstream issue
//!    <https://github.com/image-rs/imageproc/issues/705>).

use std::f32::consts::PI;

use image::{GrayImage, Luma};

use crate::blur::reflect_101;

/// Sobel gradients and L1 magnitude, one entry per pixel (row-major).
struct Gradients {
    width: u32,
    height: u32,
    gx: Vec<i32>,
    gy: Vec<i32>,
    magnitude: Vec<f32>,
}

impl Gradients {
    fn compute(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        let len = (width as usize) * (height as usize);
        let mut gx = Vec::with_capacity(len);
        let mut gy = Vec::with_capacity(len);
        let mut magnitude = Vec::with_capacity(len);

        let at = |x: i64, y: i64| -> i32 {
            let px = image.get_pixel(reflect_101(x, width), reflect_101(y, height));
            i32::from(px.0[0])
        };

        for y in 0..i64::from(height) {
            for x in 0..i64::from(width) {
                let (tl, t, tr) = (at(x - 1, y - 1), at(x, y - 1), at(x + 1, y - 1));
                let (l, r) = (at(x - 1, y), at(x + 1, y));
                let (bl, b, br) = (at(x - 1, y + 1), at(x, y + 1), at(x + 1, y + 1));

                let dx = (tr + 2 * r + br) - (tl + 2 * l + bl);
                let dy = (bl + 2 * b + br) - (tl + 2 * t + tr);
                gx.push(dx);
                gy.push(dy);
                #[allow(clippy::cast_precision_loss)]
                magnitude.push((dx.abs() + dy.abs()) as f32);
            }
        }

        Self {
            width,
            height,
            gx,
            gy,
            magnitude,
        }
    }

    const fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    /// Magnitude at a signed position, zero outside the image.
    fn magnitude_at(&self, x: i64, y: i64) -> f32 {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return 0.0;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let idx = self.index(x as u32, y as u32);
        self.magnitude[idx]
    }
}

/// Thin gradient ridges to one pixel by keeping only local maxima across
/// the quantized gradient direction.
///
/// Ties keep the pixel on the "previous" side only, so plateaus two pixels
/// wide still produce a single-pixel edge.
fn non_maximum_suppression(grad: &Gradients) -> Vec<f32> {
    const RADIANS_TO_DEGREES: f32 = 180.0 / PI;
    let mut out = vec![0.0f32; grad.magnitude.len()];

    for y in 0..grad.height {
        for x in 0..grad.width {
            let idx = grad.index(x, y);
            let m = grad.magnitude[idx];
            if m <= 0.0 {
                continue;
            }
            #[allow(clippy::cast_precision_loss)]
            let mut angle =
                (grad.gy[idx] as f32).atan2(grad.gx[idx] as f32) * RADIANS_TO_DEGREES;
            if angle < 0.0 {
                angle += 180.0;
            }

            let (dx, dy): (i64, i64) = if !(22.5..157.5).contains(&angle) {
                (1, 0)
            } else if angle < 67.5 {
                (1, 1)
            } else if angle < 112.5 {
                (0, 1)
            } else {
                (-1, 1)
            };

            let (xi, yi) = (i64::from(x), i64::from(y));
            let before = grad.magnitude_at(xi - dx, yi - dy);
            let after = grad.magnitude_at(xi + dx, yi + dy);
            if m > before && m >= after {
                out[idx] = m;
            }
        }
    }
    out
}

/// Keep strong ridges (`> high`) and any weak ridge (`> low`) 8-connected
/// to a strong one. Non-recursive depth-first flood.
fn hysteresis(thinned: &[f32], width: u32, height: u32, low: f32, high: f32) -> GrayImage {
    let mut out = GrayImage::new(width, height);
    let mut stack: Vec<(u32, u32)> = Vec::new();
    let idx = |x: u32, y: u32| (y as usize) * (width as usize) + (x as usize);

    for y in 0..height {
        for x in 0..width {
            if thinned[idx(x, y)] <= high || out.get_pixel(x, y).0[0] != 0 {
                continue;
            }
            out.put_pixel(x, y, Luma([255]));
            stack.push((x, y));

            while let Some((cx, cy)) = stack.pop() {
                for ny in cy.saturating_sub(1)..=(cy + 1).min(height - 1) {
                    for nx in cx.saturating_sub(1)..=(cx + 1).min(width - 1) {
                        if out.get_pixel(nx, ny).0[0] == 0 && thinned[idx(nx, ny)] > low {
                            out.put_pixel(nx, ny, Luma([255]));
                            stack.push((nx, ny));
                        }
                    }
                }
            }
        }
    }
    out
}

/// Run Canny on an already-smoothed grayscale image.
///
/// Returns a binary image: 255 for edge pixels, 0 elsewhere. Callers are
/// responsible for `low_threshold <= high_threshold`.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return GrayImage::new(width, height);
    }
    let grad = Gradients::compute(image);
    let thinned = non_maximum_suppression(&grad);
    hysteresis(&thinned, width, height, low_threshold, high_threshold)
}
