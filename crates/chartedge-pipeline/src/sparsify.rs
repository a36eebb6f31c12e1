//! Random edge sparsification.
//!
//! Simulates degraded edge detection by independently discarding each
//! edge pixel with a fixed probability. Background pixels are never
//! touched, so the output is always a subset of the input edge map.

use image::GrayImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Zero each non-zero pixel of `edges` with probability `drop_rate`.
///
/// `drop_rate` must lie in `[0, 1]`. A rate of 0 returns the input
/// unchanged and a rate of 1 returns an all-black image; both hold
/// whatever the random source.
#[must_use = "returns the sparsified edge map"]
pub fn sparsify<R: Rng>(edges: &GrayImage, drop_rate: f64, rng: &mut R) -> GrayImage {
    let mut out = edges.clone();
    for pixel in out.pixels_mut() {
        if pixel.0[0] != 0 && rng.random_bool(drop_rate) {
            pixel.0[0] = 0;
        }
    }
    out
}

/// Sparsify with a seeded generator when `seed` is given, otherwise with
/// the thread-local generator.
#[must_use = "returns the sparsified edge map"]
pub fn sparsify_with_seed(edges: &GrayImage, drop_rate: f64, seed: Option<u64>) -> GrayImage {
    match seed {
        Some(seed) => sparsify(edges, drop_rate, &mut StdRng::seed_from_u64(seed)),
        None => sparsify(edges, drop_rate, &mut rand::rng()),
    }
}
