//! Fixed top/bottom horizontal region crops.
//!
//! Chart titles and legends tend to sit in the top band of a template,
//! axes and labels in the bottom band. Both bands are fixed fractions of
//! the working height; they are not configurable.

use image::GrayImage;

/// Fraction of the height covered by the top band, `[0, 0.3 H)`.
pub const TOP_FRACTION: f64 = 0.3;

/// Fraction of the height where the bottom band starts, `[0.7 H, H)`.
pub const BOTTOM_START_FRACTION: f64 = 0.7;

/// Which band of a full-frame image to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Region {
    /// Rows `[0, round(0.3 H))`.
    Top,
    /// Rows `[round(0.7 H), H)`.
    Bottom,
}

impl Region {
    /// Both bands, in output order.
    pub const ALL: [Self; 2] = [Self::Top, Self::Bottom];

    /// Row range `(start, rows)` of this band in an image of `height` rows.
    #[must_use]
    pub fn rows(self, height: u32) -> (u32, u32) {
        match self {
            Self::Top => (0, scaled_row(height, TOP_FRACTION)),
            Self::Bottom => {
                let start = scaled_row(height, BOTTOM_START_FRACTION);
                (start, height - start)
            }
        }
    }
}

fn scaled_row(height: u32, fraction: f64) -> u32 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let row = (f64::from(height) * fraction).round() as u32;
    row.min(height)
}

/// Copy the band of `image` described by `region`.
#[must_use = "returns the cropped band"]
pub fn crop(image: &GrayImage, region: Region) -> GrayImage {
    let (start, rows) = region.rows(image.height());
    image::imageops::crop_imm(image, 0, start, image.width(), rows).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn working_height_band_sizes() {
        // 0.3 * 512 = 153.6 -> 154; 0.7 * 512 = 358.4 -> 358.
        assert_eq!(Region::Top.rows(512), (0, 154));
        assert_eq!(Region::Bottom.rows(512), (358, 154));
    }

    #[test]
    fn crops_keep_width_and_take_expected_rows() {
        let img = GrayImage::from_fn(7, 512, |_, y| image::Luma([(y % 256) as u8]));
        let top = crop(&img, Region::Top);
        let bottom = crop(&img, Region::Bottom);
        assert_eq!(top.dimensions(), (7, 154));
        assert_eq!(bottom.dimensions(), (7, 154));
        assert_eq!(top.get_pixel(0, 0).0[0], 0);
        assert_eq!(bottom.get_pixel(0, 0).0[0], (358 % 256) as u8);
        assert_eq!(bottom.get_pixel(6, 153).0[0], (511 % 256) as u8);
    }

    #[test]
    fn band_heights_follow_rounding_rule_for_any_height() {
        for h in 1..=600u32 {
            let (_, top_rows) = Region::Top.rows(h);
            let (start, bottom_rows) = Region::Bottom.rows(h);
            assert_eq!(top_rows, (f64::from(h) * 0.3).round() as u32, "h={h}");
            assert_eq!(start + bottom_rows, h);
        }
    }
}
