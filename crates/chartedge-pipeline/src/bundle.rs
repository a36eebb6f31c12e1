//! Artifact bundle: named, PNG-encoded derived images plus the working
//! image dimensions.
//!
//! Serializes to the JSON shape consumed by the chart-comparison front
//! end: baseline artifacts are top-level string fields, branch artifacts
//! are nested under `processed_edges`, and `dimensions` is an object.

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine as _;
use image::{DynamicImage, ExtendedColorType, GrayImage, RgbImage};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::region::Region;
use crate::technique::{Skipped, TechniqueKind};
use crate::types::{Dimensions, PipelineError};

/// Prefix of every branch artifact key in its dotted form.
const PROCESSED_PREFIX: &str = "processed_edges";

/// Name of one artifact in a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactKey {
    /// Resized colour working image.
    Original,
    /// Unsmoothed grayscale working image.
    Grayscale,
    /// Baseline edge map.
    Edge,
    /// Top band of the baseline edge map.
    TopEdge,
    /// Bottom band of the baseline edge map.
    BottomEdge,
    /// Output of a technique branch, full frame or one band.
    Processed(TechniqueKind, Option<Region>),
}

impl ArtifactKey {
    /// Name under `processed_edges` for branch artifacts, e.g.
    /// `blur_top`. `None` for baseline artifacts.
    #[must_use]
    pub fn processed_name(self) -> Option<String> {
        let Self::Processed(kind, band) = self else {
            return None;
        };
        Some(match band {
            None => kind.name().to_owned(),
            Some(Region::Top) => format!("{}_top", kind.name()),
            Some(Region::Bottom) => format!("{}_bottom", kind.name()),
        })
    }

    const fn baseline_name(self) -> Option<&'static str> {
        match self {
            Self::Original => Some("original_image"),
            Self::Grayscale => Some("grayscale_image"),
            Self::Edge => Some("edge_image"),
            Self::TopEdge => Some("top_edge_image"),
            Self::BottomEdge => Some("bottom_edge_image"),
            Self::Processed(..) => None,
        }
    }

    /// Parse a dotted key such as `edge_image` or
    /// `processed_edges.sparsification_bottom`.
    #[must_use]
    pub fn parse(key: &str) -> Option<Self> {
        if let Some(name) = key
            .strip_prefix(PROCESSED_PREFIX)
            .and_then(|rest| rest.strip_prefix('.'))
        {
            let (stem, band) = if let Some(stem) = name.strip_suffix("_top") {
                (stem, Some(Region::Top))
            } else if let Some(stem) = name.strip_suffix("_bottom") {
                (stem, Some(Region::Bottom))
            } else {
                (name, None)
            };
            return TechniqueKind::from_name(stem).map(|kind| Self::Processed(kind, band));
        }
        [
            Self::Original,
            Self::Grayscale,
            Self::Edge,
            Self::TopEdge,
            Self::BottomEdge,
        ]
        .into_iter()
        .find(|k| k.baseline_name() == Some(key))
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.baseline_name(), self.processed_name()) {
            (Some(name), _) => f.write_str(name),
            (None, Some(name)) => write!(f, "{PROCESSED_PREFIX}.{name}"),
            (None, None) => Ok(()),
        }
    }
}

/// A PNG image as standard base64 text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage(String);

impl EncodedImage {
    /// Encode a single-channel image as an 8-bit gray PNG.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Encode`] if the PNG encoder fails.
    pub fn from_gray(image: &GrayImage) -> Result<Self, PipelineError> {
        encode_png(image.as_raw(), image.width(), image.height(), ExtendedColorType::L8)
    }

    /// Encode a colour image as an 8-bit RGB PNG.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Encode`] if the PNG encoder fails.
    pub fn from_rgb(image: &RgbImage) -> Result<Self, PipelineError> {
        encode_png(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgb8)
    }

    /// The base64 text.
    #[must_use]
    pub fn as_base64(&self) -> &str {
        &self.0
    }

    /// Raw PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Base64`] if the text is not valid base64.
    pub fn png_bytes(&self) -> Result<Vec<u8>, PipelineError> {
        Ok(base64::engine::general_purpose::STANDARD.decode(&self.0)?)
    }

    /// Decode back into an image.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Base64`] or [`PipelineError::Decode`] if
    /// the payload is not a valid base64 PNG.
    pub fn to_image(&self) -> Result<DynamicImage, PipelineError> {
        Ok(image::load_from_memory(&self.png_bytes()?)?)
    }
}

impl Serialize for EncodedImage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

fn encode_png(
    raw: &[u8],
    width: u32,
    height: u32,
    color: ExtendedColorType,
) -> Result<EncodedImage, PipelineError> {
    let mut buf = Vec::new();
    image::ImageEncoder::write_image(
        image::codecs::png::PngEncoder::new(&mut buf),
        raw,
        width,
        height,
        color,
    )
    .map_err(|e| PipelineError::Encode(e.to_string()))?;
    Ok(EncodedImage(
        base64::engine::general_purpose::STANDARD.encode(buf),
    ))
}

/// The result of one pipeline call.
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    artifacts: BTreeMap<ArtifactKey, EncodedImage>,
    dimensions: Dimensions,
    skipped: Vec<Skipped>,
}

impl ArtifactBundle {
    /// An empty bundle for a working image of `dimensions`.
    #[must_use]
    pub const fn new(dimensions: Dimensions) -> Self {
        Self {
            artifacts: BTreeMap::new(),
            dimensions,
            skipped: Vec::new(),
        }
    }

    /// Add or replace an artifact.
    pub fn insert(&mut self, key: ArtifactKey, image: EncodedImage) {
        self.artifacts.insert(key, image);
    }

    /// Record techniques that were requested but produced nothing.
    pub fn extend_skipped(&mut self, skipped: impl IntoIterator<Item = Skipped>) {
        self.skipped.extend(skipped);
    }

    /// Artifact stored under `key`.
    #[must_use]
    pub fn artifact(&self, key: ArtifactKey) -> Option<&EncodedImage> {
        self.artifacts.get(&key)
    }

    /// Artifact stored under the dotted key name, e.g.
    /// `processed_edges.blur_top`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&EncodedImage> {
        ArtifactKey::parse(key).and_then(|k| self.artifact(k))
    }

    /// Whether the dotted key name is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// All artifacts in key order.
    pub fn iter(&self) -> impl Iterator<Item = (ArtifactKey, &EncodedImage)> {
        self.artifacts.iter().map(|(k, v)| (*k, v))
    }

    /// Dotted names of all artifacts, in key order.
    #[must_use]
    pub fn key_names(&self) -> Vec<String> {
        self.artifacts.keys().map(ToString::to_string).collect()
    }

    /// Number of artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Returns `true` if the bundle holds no artifacts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Working image dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Requested techniques that produced nothing, with the reason.
    #[must_use]
    pub fn skipped(&self) -> &[Skipped] {
        &self.skipped
    }
}

impl Serialize for ArtifactBundle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let processed: BTreeMap<String, &EncodedImage> = self
            .artifacts
            .iter()
            .filter_map(|(k, v)| k.processed_name().map(|name| (name, v)))
            .collect();

        let mut map = serializer.serialize_map(None)?;
        for (key, image) in &self.artifacts {
            if let Some(name) = key.baseline_name() {
                map.serialize_entry(name, image)?;
            }
        }
        if !processed.is_empty() {
            map.serialize_entry(PROCESSED_PREFIX, &processed)?;
        }
        map.serialize_entry("dimensions", &self.dimensions)?;
        map.end()
    }
}
