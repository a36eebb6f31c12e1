//! chartedge-pipeline: multi-technique edge extraction for chart images
//! (sans-IO).
//!
//! Every call runs one sequence:
//!
//! ```text
//! decode ─▶ normalize ─▶ baseline edges ─┬─▶ threshold      ─┐
//!                                        ├─▶ sparsification ─┤
//!                                        ├─▶ blur           ─┼─▶ encode ─▶ bundle
//!                                        └─▶ contour        ─┘
//! ```
//!
//! Branches only read the normalized images and the baseline edge map and
//! run in parallel on the `rayon` pool. Results are PNG-encoded, base64
//! wrapped and collected into an [`ArtifactBundle`].
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! bytes and returns structured data. Template lookup and file reading
//! live in `chartedge-io`.

pub mod blur;
pub mod bundle;
pub mod canny;
pub mod contour;
pub mod decode;
pub mod edge;
pub mod normalize;
pub mod region;
pub mod resize;
pub mod simplify;
pub mod sparsify;
pub mod technique;
pub mod types;

use std::time::Instant;

use log::debug;
use rayon::prelude::*;

pub use bundle::{ArtifactBundle, ArtifactKey, EncodedImage};
pub use decode::ImageSource;
pub use edge::Thresholds;
pub use normalize::{Normalized, normalize};
pub use region::Region;
pub use technique::{
    BlurParams, ContourParams, Skipped, SparsificationParams, TechniqueConfig, TechniqueKind,
    ThresholdParams,
};
pub use types::{Dimensions, GrayImage, PipelineError, Point, Polyline, RgbImage};

use technique::BranchInput;

/// Baseline-only pipeline for ad-hoc uploads.
///
/// The bundle holds `grayscale_image`, `edge_image` and `dimensions`.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`], [`PipelineError::Base64`] or
/// [`PipelineError::Decode`] when the source cannot be decoded, and
/// [`PipelineError::Encode`] if an artifact cannot be encoded.
pub fn process_image<'a>(source: impl Into<ImageSource<'a>>) -> Result<ArtifactBundle, PipelineError> {
    let normalized = normalize(source.into())?;
    let edges = normalized.baseline_edges();

    let mut bundle = ArtifactBundle::new(normalized.dimensions);
    bundle.insert(
        ArtifactKey::Grayscale,
        EncodedImage::from_gray(&normalized.grayscale)?,
    );
    bundle.insert(ArtifactKey::Edge, EncodedImage::from_gray(&edges)?);
    Ok(bundle)
}

/// Full pipeline: baseline artifacts plus every technique in `config`.
///
/// The bundle always holds `original_image`, `grayscale_image`,
/// `edge_image`, `top_edge_image` and `bottom_edge_image`. Each requested
/// technique adds its `processed_edges.*` entries. Techniques with
/// invalid parameters, and unknown technique names, are left out and
/// listed in [`ArtifactBundle::skipped`].
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`], [`PipelineError::Base64`] or
/// [`PipelineError::Decode`] when the source cannot be decoded, and
/// [`PipelineError::Encode`] if an artifact cannot be encoded. Branch
/// parameter errors never fail the call.
pub fn process<'a>(
    source: impl Into<ImageSource<'a>>,
    config: &TechniqueConfig,
) -> Result<ArtifactBundle, PipelineError> {
    let normalized = normalize(source.into())?;
    let baseline = normalized.baseline_edges();

    let start = Instant::now();
    let (outputs, skipped) = technique::run_branches(
        BranchInput {
            normalized: &normalized,
            baseline: &baseline,
        },
        config,
    );
    debug!(
        "ran {} branches ({} skipped) in {:?}",
        outputs.len(),
        skipped.len(),
        start.elapsed()
    );

    let top = region::crop(&baseline, Region::Top);
    let bottom = region::crop(&baseline, Region::Bottom);
    let mut gray: Vec<(ArtifactKey, &GrayImage)> = vec![
        (ArtifactKey::Grayscale, &normalized.grayscale),
        (ArtifactKey::Edge, &baseline),
        (ArtifactKey::TopEdge, &top),
        (ArtifactKey::BottomEdge, &bottom),
    ];
    for output in &outputs {
        for (band, image) in &output.images {
            gray.push((ArtifactKey::Processed(output.kind, *band), image));
        }
    }

    let start = Instant::now();
    let encoded = gray
        .into_par_iter()
        .map(|(key, image)| EncodedImage::from_gray(image).map(|encoded| (key, encoded)))
        .collect::<Result<Vec<_>, PipelineError>>()?;

    let mut bundle = ArtifactBundle::new(normalized.dimensions);
    bundle.insert(
        ArtifactKey::Original,
        EncodedImage::from_rgb(&normalized.original)?,
    );
    for (key, image) in encoded {
        bundle.insert(key, image);
    }
    bundle.extend_skipped(skipped);
    debug!("encoded {} artifacts in {:?}", bundle.len(), start.elapsed());
    Ok(bundle)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Create a PNG with a sharp black/white boundary for testing.
    fn sharp_edge_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_fn(width, height, |x, _y| {
            if x < width / 2 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
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
    fn process_empty_input() {
        let result = process(ImageSource::Bytes(&[]), &TechniqueConfig::new());
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn process_corrupt_input() {
        let result = process_image(ImageSource::Bytes(&[0xFF, 0x00]));
        assert!(matches!(result, Err(PipelineError::Decode(_))));
    }

    #[test]
    fn baseline_bundle_keys() {
        let png = sharp_edge_png(40, 40);
        let bundle = process_image(&png).unwrap();
        assert_eq!(bundle.key_names(), ["grayscale_image", "edge_image"]);
        assert_eq!(
            bundle.dimensions(),
            Dimensions {
                width: 512,
                height: 512,
                channels: 3
            }
        );
    }

    #[test]
    fn rgba_source_reports_three_channels() {
        let bundle = process(&sharp_edge_png(20, 10), &TechniqueConfig::new()).unwrap();
        assert_eq!(bundle.dimensions().channels, 3);
        let original = bundle.artifact(ArtifactKey::Original).unwrap().to_image().unwrap();
        assert_eq!(original.color(), image::ColorType::Rgb8);
    }

    #[test]
    fn empty_config_yields_template_baseline() {
        let bundle = process(&sharp_edge_png(40, 40), &TechniqueConfig::new()).unwrap();
        assert_eq!(
            bundle.key_names(),
            [
                "original_image",
                "grayscale_image",
                "edge_image",
                "top_edge_image",
                "bottom_edge_image"
            ]
        );
        assert!(bundle.skipped().is_empty());
    }

    #[test]
    fn base64_source_matches_bytes() {
        use base64::Engine as _;
        let png = sharp_edge_png(30, 30);
        let text = format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&png)
        );
        let from_text = process_image(ImageSource::Base64(&text)).unwrap();
        let from_bytes = process_image(&png).unwrap();
        assert_eq!(
            from_text.get("edge_image").unwrap(),
            from_bytes.get("edge_image").unwrap()
        );
    }

    #[test]
    fn all_techniques_produce_every_processed_key() {
        let bundle = process(&sharp_edge_png(40, 40), &TechniqueConfig::all_defaults()).unwrap();
        for key in [
            "processed_edges.threshold",
            "processed_edges.sparsification",
            "processed_edges.sparsification_top",
            "processed_edges.sparsification_bottom",
            "processed_edges.blur",
            "processed_edges.blur_top",
            "processed_edges.blur_bottom",
            "processed_edges.contour",
        ] {
            assert!(bundle.contains(key), "missing {key}");
        }
        assert_eq!(bundle.len(), 13);
    }
}
