//! Contour branch: trace outer contours of an edge map, simplify each as
//! a closed polygon and draw the result back onto a blank canvas.
//!
//! Tracing uses Suzuki-Abe border following via
//! `imageproc::contours::find_contours`. Only outermost borders are kept:
//! hole borders and borders nested inside another component are dropped.

use image::{GrayImage, Luma};
use imageproc::contours::{BorderType, Contour};

use crate::simplify::simplify_closed;
use crate::types::{Point, Polyline};

/// Pixel value used for drawn outlines.
const OUTLINE: Luma<u8> = Luma([255]);

/// Trace the outermost contours of a binary edge map.
///
/// Any non-zero pixel counts as foreground.
#[must_use]
pub fn external_contours(edges: &GrayImage) -> Vec<Polyline> {
    let contours: Vec<Contour<u32>> = imageproc::contours::find_contours(edges);

    contours
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter(|c| !c.points.is_empty())
        .map(|c| {
            let points = c
                .points
                .into_iter()
                .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
                .collect();
            Polyline::new(points)
        })
        .collect()
}

/// Simplify every contour with a tolerance of `epsilon_factor` times its
/// closed perimeter.
#[must_use]
pub fn simplify_contours(contours: &[Polyline], epsilon_factor: f64) -> Vec<Polyline> {
    contours
        .iter()
        .map(|c| simplify_closed(c, epsilon_factor * c.closed_perimeter()))
        .collect()
}

/// Draw closed 1-px outlines on a black canvas of `width` x `height`.
///
/// A single-point polygon is drawn as one pixel; points outside the
/// canvas are clipped.
#[must_use = "returns the rasterised outlines"]
#[allow(clippy::cast_possible_truncation)]
pub fn rasterize(polygons: &[Polyline], width: u32, height: u32) -> GrayImage {
    let mut canvas = GrayImage::new(width, height);
    for polygon in polygons {
        let points = polygon.points();
        match points {
            [] => {}
            [only] => {
                if only.x >= 0.0 && only.y >= 0.0 {
                    #[allow(clippy::cast_sign_loss)]
                    let (x, y) = (only.x as u32, only.y as u32);
                    if x < width && y < height {
                        canvas.put_pixel(x, y, OUTLINE);
                    }
                }
            }
            _ => {
                let next = points.iter().cycle().skip(1);
                for (a, b) in points.iter().zip(next) {
                    imageproc::drawing::draw_line_segment_mut(
                        &mut canvas,
                        (a.x as f32, a.y as f32),
                        (b.x as f32, b.y as f32),
                        OUTLINE,
                    );
                }
            }
        }
    }
    canvas
}

/// Full contour branch on a baseline edge map.
#[must_use = "returns the contour outline image"]
pub fn contour_outlines(edges: &GrayImage, epsilon_factor: f64) -> GrayImage {
    let contours = external_contours(edges);
    let simplified = simplify_contours(&contours, epsilon_factor);
    log::debug!(
        "contour: {} outer contours, {} -> {} vertices",
        contours.len(),
        contours.iter().map(Polyline::len).sum::<usize>(),
        simplified.iter().map(Polyline::len).sum::<usize>(),
    );
    rasterize(&simplified, edges.width(), edges.height())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::count_edge_pixels;

    /// Two filled squares, the second containing a black hole with a
    /// white dot inside it.
    fn two_squares() -> GrayImage {
        let mut img = GrayImage::new(60, 40);
        for y in 5..=15 {
            for x in 5..=15 {
                img.put_pixel(x, y, OUTLINE);
            }
        }
        for y in 5..=35 {
            for x in 25..=55 {
                img.put_pixel(x, y, OUTLINE);
            }
        }
        for y in 10..=30 {
            for x in 30..=50 {
                img.put_pixel(x, y, Luma([0]));
            }
        }
        img.put_pixel(40, 20, OUTLINE);
        img
    }

    #[test]
    fn only_outer_contours_are_traced() {
        let contours = external_contours(&two_squares());
        assert_eq!(contours.len(), 2);
    }

    #[test]
    fn blank_map_yields_no_contours() {
        let img = GrayImage::new(10, 10);
        assert!(external_contours(&img).is_empty());
        assert_eq!(count_edge_pixels(&contour_outlines(&img, 0.02)), 0);
    }

    #[test]
    fn simplified_squares_have_four_corners() {
        let contours = external_contours(&two_squares());
        for polygon in simplify_contours(&contours, 0.02) {
            assert_eq!(polygon.len(), 4, "got {:?}", polygon.points());
        }
    }

    #[test]
    fn rasterized_square_is_hollow_outline() {
        let square = Polyline::new(vec![
            Point::new(2.0, 2.0),
            Point::new(7.0, 2.0),
            Point::new(7.0, 7.0),
            Point::new(2.0, 7.0),
        ]);
        let out = rasterize(&[square], 10, 10);
        assert_eq!(out.get_pixel(2, 2).0[0], 255);
        assert_eq!(out.get_pixel(7, 7).0[0], 255);
        assert_eq!(out.get_pixel(2, 5).0[0], 255);
        assert_eq!(out.get_pixel(5, 5).0[0], 0);
        assert_eq!(count_edge_pixels(&out), 20);
    }

    #[test]
    fn single_point_drawn_as_pixel() {
        let dot = Polyline::new(vec![Point::new(3.0, 4.0)]);
        let out = rasterize(&[dot], 8, 8);
        assert_eq!(count_edge_pixels(&out), 1);
        assert_eq!(out.get_pixel(3, 4).0[0], 255);
    }

    #[test]
    fn outlines_keep_edge_map_dimensions() {
        let out = contour_outlines(&two_squares(), 0.02);
        assert_eq!(out.dimensions(), (60, 40));
        assert!(count_edge_pixels(&out) > 0);
        // The hole interior stays black.
        assert_eq!(out.get_pixel(40, 20).0[0], 0);
    }
}
