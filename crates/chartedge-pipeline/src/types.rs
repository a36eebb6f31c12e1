//! Shared types for the chartedge edge-extraction pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can reference the
/// normalized colour working image without depending on `image` directly.
pub use image::RgbImage;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// A sequence of connected points.
///
/// Contours traced from an edge map are closed: the last point connects
/// back to the first without being repeated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Length of the closed outline, including the segment from the last
    /// point back to the first.
    #[must_use]
    pub fn closed_perimeter(&self) -> f64 {
        let open: f64 = self.0.windows(2).map(|w| w[0].distance(w[1])).sum();
        match (self.0.first(), self.0.last()) {
            (Some(&first), Some(&last)) if self.0.len() > 2 => open + last.distance(first),
            _ => open,
        }
    }
}

/// Working image dimensions reported in every artifact bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Channel count of the colour working image.
    pub channels: u8,
}

/// Errors that can occur during pipeline processing.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// Text input was not valid base64.
    #[error("failed to decode base64 image data: {0}")]
    Base64(#[from] base64::DecodeError),

    /// A technique's parameters are out of contract.
    ///
    /// Only ever surfaced per branch; [`crate::process`] records it by
    /// omitting the technique's artifacts.
    #[error("invalid parameters for technique `{technique}`: {reason}")]
    InvalidParameter {
        /// Technique name as it appears in the configuration.
        technique: String,
        /// Human-readable description of the violated constraint.
        reason: String,
    },

    /// Failed to encode a derived image.
    #[error("failed to encode artifact: {0}")]
    Encode(String),
}

impl PipelineError {
    /// Shorthand for building an [`InvalidParameter`](Self::InvalidParameter).
    pub(crate) fn invalid(technique: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            technique: technique.to_owned(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < f64::EPSILON);
        assert!((a.distance_squared(b) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn closed_perimeter_of_square() {
        let square = Polyline::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ]);
        assert!((square.closed_perimeter() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn two_point_perimeter_is_not_doubled() {
        let segment = Polyline::new(vec![Point::new(0.0, 0.0), Point::new(5.0, 0.0)]);
        assert!((segment.closed_perimeter() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn empty_polyline_has_zero_perimeter() {
        let empty = Polyline::new(vec![]);
        assert!(empty.is_empty());
        assert!(empty.closed_perimeter().abs() < f64::EPSILON);
    }

    #[test]
    fn dimensions_serialize_as_flat_record() {
        let d = Dimensions {
            width: 768,
            height: 512,
            channels: 3,
        };
        let json = serde_json::to_value(d).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "width": 768, "height": 512, "channels": 3 })
        );
    }

    #[test]
    fn invalid_parameter_display() {
        let err = PipelineError::invalid("threshold", "lower (90) must be below upper (30)");
        assert_eq!(
            err.to_string(),
            "invalid parameters for technique `threshold`: lower (90) must be below upper (30)",
        );
    }

    #[test]
    fn empty_input_display() {
        assert_eq!(
            PipelineError::EmptyInput.to_string(),
            "input image data is empty"
        );
    }
}
