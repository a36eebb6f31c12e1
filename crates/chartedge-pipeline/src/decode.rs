//! Image decoding and grayscale conversion.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) or their base64 text
//! form and produces a 3-channel colour image. The grayscale conversion
//! used by every edge branch also lives here.

use base64::Engine as _;
use image::{DynamicImage, GrayImage, RgbImage};

use crate::types::PipelineError;

/// Where the source image comes from.
#[derive(Debug, Clone, Copy)]
pub enum ImageSource<'a> {
    /// Encoded image bytes as read from an upload or a file.
    Bytes(&'a [u8]),
    /// Base64 text of encoded image bytes, optionally carrying a
    /// `data:<mime>;base64,` prefix as produced by browser canvases.
    Base64(&'a str),
}

impl<'a> From<&'a [u8]> for ImageSource<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::Bytes(bytes)
    }
}

impl<'a> From<&'a Vec<u8>> for ImageSource<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

/// Decode the source into a 3-channel colour image.
///
/// Every source colour type (gray, gray+alpha, RGBA, 16-bit) is
/// flattened to 8-bit RGB so the working image always reports three
/// channels.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if the source is empty.
/// Returns [`PipelineError::Base64`] if base64 text does not decode.
/// Returns [`PipelineError::Decode`] if the bytes are not a recognized
/// image encoding.
pub fn decode(source: ImageSource<'_>) -> Result<RgbImage, PipelineError> {
    let image = match source {
        ImageSource::Bytes(bytes) => decode_bytes(bytes)?,
        ImageSource::Base64(text) => decode_bytes(&decode_base64(text)?)?,
    };
    Ok(image.to_rgb8())
}

fn decode_bytes(bytes: &[u8]) -> Result<DynamicImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    Ok(image::load_from_memory(bytes)?)
}

/// Decode base64 text into raw bytes, stripping any data-URL prefix and
/// surrounding whitespace.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if nothing remains after
/// stripping, or [`PipelineError::Base64`] on malformed input.
pub fn decode_base64(text: &str) -> Result<Vec<u8>, PipelineError> {
    let payload = text
        .trim()
        .split_once(";base64,")
        .map_or_else(|| text.trim(), |(_, data)| data);
    if payload.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    Ok(base64::engine::general_purpose::STANDARD.decode(payload)?)
}

/// Convert a colour image to single-channel grayscale.
///
/// Uses the BT.601 luma weights `0.299 R + 0.587 G + 0.114 B` in 14-bit
/// fixed point, rounding to nearest.
#[must_use = "returns the grayscale image"]
pub fn to_grayscale(image: &RgbImage) -> GrayImage {
    const R: u32 = 4899;
    const G: u32 = 9617;
    const B: u32 = 1868;
    const SHIFT: u32 = 14;
    const HALF: u32 = 1 << (SHIFT - 1);

    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        let luma = (u32::from(r) * R + u32::from(g) * G + u32::from(b) * B + HALF) >> SHIFT;
        #[allow(clippy::cast_possible_truncation)]
        image::Luma([luma.min(255) as u8])
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Encode a single 1x1 RGBA pixel as a PNG byte buffer.
    fn encode_rgba_pixel(r: u8, g: u8, b: u8) -> Vec<u8> {
        let img = image::RgbaImage::from_fn(1, 1, |_, _| image::Rgba([r, g, b, 255]));
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn empty_input_returns_error() {
        let result = decode(ImageSource::Bytes(&[]));
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_decode_error() {
        let result = decode(ImageSource::Bytes(&[0xFF, 0xFE, 0x00, 0x01]));
        assert!(matches!(result, Err(PipelineError::Decode(_))));
    }

    #[test]
    fn rgba_source_decodes_to_three_channels() {
        let png = encode_rgba_pixel(10, 20, 30);
        let rgb = decode(ImageSource::Bytes(&png)).unwrap();
        assert_eq!(rgb.get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn gray_source_decodes_to_three_channels() {
        let gray = GrayImage::from_pixel(3, 2, image::Luma([77]));
        let mut buf = Vec::new();
        image::ImageEncoder::write_image(
            image::codecs::png::PngEncoder::new(&mut buf),
            gray.as_raw(),
            3,
            2,
            image::ExtendedColorType::L8,
        )
        .unwrap();
        let rgb = decode(ImageSource::Bytes(&buf)).unwrap();
        assert_eq!(rgb.dimensions(), (3, 2));
        assert_eq!(rgb.get_pixel(1, 1).0, [77, 77, 77]);
    }

    #[test]
    fn base64_and_data_url_decode_identically() {
        let png = encode_rgba_pixel(200, 100, 50);
        let b64 = base64::engine::general_purpose::STANDARD.encode(&png);
        let data_url = format!("data:image/png;base64,{b64}");

        let plain = decode(ImageSource::Base64(&b64)).unwrap();
        let prefixed = decode(ImageSource::Base64(&data_url)).unwrap();
        assert_eq!(plain, prefixed);
        assert_eq!(plain.get_pixel(0, 0).0, [200, 100, 50]);
    }

    #[test]
    fn malformed_base64_is_rejected() {
        let result = decode(ImageSource::Base64("not*base64!"));
        assert!(matches!(result, Err(PipelineError::Base64(_))));
    }

    #[test]
    fn blank_base64_is_empty_input() {
        let result = decode(ImageSource::Base64("data:image/png;base64,"));
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn grayscale_uses_luma_weights() {
        let img = RgbImage::from_fn(3, 1, |x, _| match x {
            0 => image::Rgb([255, 0, 0]),
            1 => image::Rgb([0, 255, 0]),
            _ => image::Rgb([0, 0, 255]),
        });
        let gray = to_grayscale(&img);
        assert_eq!(gray.get_pixel(0, 0).0[0], 76);
        assert_eq!(gray.get_pixel(1, 0).0[0], 150);
        assert_eq!(gray.get_pixel(2, 0).0[0], 29);
    }

    #[test]
    fn white_stays_white() {
        let img = RgbImage::from_pixel(2, 2, image::Rgb([255, 255, 255]));
        assert!(to_grayscale(&img).pixels().all(|p| p.0[0] == 255));
    }
}
