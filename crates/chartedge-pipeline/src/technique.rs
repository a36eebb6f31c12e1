//! Technique configuration and table-driven branch dispatch.
//!
//! A [`TechniqueConfig`] maps technique names to JSON parameter records.
//! Each recognized name has a row in a static dispatch table; the row's
//! runner parses the record into the technique's parameter struct,
//! validates it and executes the branch. Branches only read the shared
//! [`BranchInput`], so [`run_branches`] fans them out on the `rayon` pool.
//!
//! A branch whose parameters fail to parse or validate is skipped with a
//! warning; the remaining branches are unaffected.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use log::{debug, warn};
use rayon::prelude::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::blur;
use crate::contour;
use crate::edge::{self, Thresholds};
use crate::normalize::Normalized;
use crate::region::{self, Region};
use crate::sparsify;
use crate::types::{Dimensions, GrayImage, PipelineError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Which techniques to run, with a parameter record for each.
///
/// Deserializes from a JSON object such as
/// `{"threshold": {"lower": 30, "upper": 90}, "blur": null}`. A `null`
/// record means "all defaults"; missing fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TechniqueConfig(BTreeMap<String, Value>);

impl TechniqueConfig {
    /// An empty configuration: only baseline artifacts are produced.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every recognized technique with default parameters.
    #[must_use]
    pub fn all_defaults() -> Self {
        let mut config = Self::new();
        for kind in TechniqueKind::ALL {
            config.insert(kind.name(), Value::Null);
        }
        config
    }

    /// Parse a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error when `text` is not a JSON object.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Set the parameter record for `technique`, replacing any previous one.
    pub fn insert(&mut self, technique: impl Into<String>, params: Value) {
        self.0.insert(technique.into(), params);
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, technique: impl Into<String>, params: Value) -> Self {
        self.insert(technique, params);
        self
    }

    /// Returns `true` if no technique is requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Requested technique names, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Parameter record for `technique`, if requested.
    #[must_use]
    pub fn get(&self, technique: &str) -> Option<&Value> {
        self.0.get(technique)
    }
}

// ---------------------------------------------------------------------------
// Techniques
// ---------------------------------------------------------------------------

/// The recognized technique branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TechniqueKind {
    /// Canny with caller-chosen thresholds.
    Threshold,
    /// Random dropout of baseline edge pixels.
    Sparsification,
    /// Caller-chosen Gaussian smoothing before Canny.
    Blur,
    /// Simplified outer contours of the baseline edge map.
    Contour,
}

impl TechniqueKind {
    /// All techniques, in table order.
    pub const ALL: [Self; 4] = [
        Self::Threshold,
        Self::Sparsification,
        Self::Blur,
        Self::Contour,
    ];

    /// Configuration key and artifact name stem.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Threshold => "threshold",
            Self::Sparsification => "sparsification",
            Self::Blur => "blur",
            Self::Contour => "contour",
        }
    }

    /// Look up a technique by configuration key.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl fmt::Display for TechniqueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Read-only inputs shared by every branch.
#[derive(Debug, Clone, Copy)]
pub struct BranchInput<'a> {
    /// Normalization stage output.
    pub normalized: &'a Normalized,
    /// Baseline edge map of [`Normalized::denoised`].
    pub baseline: &'a GrayImage,
}

/// One image produced by a branch: the full frame (`None`) or a band.
pub type BranchImage = (Option<Region>, GrayImage);

/// Parameter record of one technique, and the branch it drives.
trait Technique: DeserializeOwned + Default {
    const KIND: TechniqueKind;

    /// Check the parameters against the technique's contract for a
    /// working image of `dimensions`.
    fn validate(&self, dimensions: Dimensions) -> Result<(), String>;

    /// Run the branch. Only called after [`validate`](Self::validate)
    /// succeeded.
    fn execute(&self, input: BranchInput<'_>) -> Vec<BranchImage>;
}

/// Parameters of the `threshold` branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdParams {
    /// Hysteresis low threshold.
    pub lower: u32,
    /// Hysteresis high threshold; must exceed `lower`.
    pub upper: u32,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self {
            lower: Thresholds::DEFAULT.lower,
            upper: Thresholds::DEFAULT.upper,
        }
    }
}

impl Technique for ThresholdParams {
    const KIND: TechniqueKind = TechniqueKind::Threshold;

    fn validate(&self, _dimensions: Dimensions) -> Result<(), String> {
        if self.lower >= self.upper {
            return Err(format!(
                "lower ({}) must be less than upper ({})",
                self.lower, self.upper
            ));
        }
        Ok(())
    }

    fn execute(&self, input: BranchInput<'_>) -> Vec<BranchImage> {
        let thresholds = Thresholds {
            lower: self.lower,
            upper: self.upper,
        };
        vec![(
            None,
            edge::detect_edges(&input.normalized.denoised, thresholds),
        )]
    }
}

/// Parameters of the `sparsification` branch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SparsificationParams {
    /// Probability of dropping each edge pixel, in `[0, 1]`.
    pub drop_rate: f64,
    /// Seed for a reproducible mask. Unseeded when absent.
    pub seed: Option<u64>,
}

impl Default for SparsificationParams {
    fn default() -> Self {
        Self {
            drop_rate: 0.3,
            seed: None,
        }
    }
}

impl Technique for SparsificationParams {
    const KIND: TechniqueKind = TechniqueKind::Sparsification;

    fn validate(&self, _dimensions: Dimensions) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.drop_rate) {
            return Err(format!(
                "drop_rate ({}) must lie in [0, 1]",
                self.drop_rate
            ));
        }
        Ok(())
    }

    fn execute(&self, input: BranchInput<'_>) -> Vec<BranchImage> {
        let sparse = sparsify::sparsify_with_seed(input.baseline, self.drop_rate, self.seed);
        with_bands(sparse)
    }
}

/// Parameters of the `blur` branch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlurParams {
    /// Gaussian kernel size. Even sizes are rounded up to the next odd
    /// size; zero is rejected, as is anything larger than
    /// [`blur::max_kernel_size`] for the working image.
    pub kernel_size: u32,
    /// Gaussian standard deviation. Zero derives it from `kernel_size`.
    pub sigma: f64,
}

impl BlurParams {
    /// Kernel size actually applied.
    #[must_use]
    pub const fn effective_kernel_size(&self) -> u32 {
        if self.kernel_size % 2 == 0 {
            self.kernel_size.saturating_add(1)
        } else {
            self.kernel_size
        }
    }
}

impl Default for BlurParams {
    fn default() -> Self {
        Self {
            kernel_size: 5,
            sigma: 1.0,
        }
    }
}

impl Technique for BlurParams {
    const KIND: TechniqueKind = TechniqueKind::Blur;

    fn validate(&self, dimensions: Dimensions) -> Result<(), String> {
        if self.kernel_size == 0 {
            return Err("kernel_size must be at least 1".to_owned());
        }
        let max = blur::max_kernel_size(dimensions.width, dimensions.height);
        if self.effective_kernel_size() > max {
            return Err(format!(
                "kernel_size ({}) exceeds {max} for a {}x{} working image",
                self.kernel_size, dimensions.width, dimensions.height
            ));
        }
        if !self.sigma.is_finite() || self.sigma < 0.0 {
            return Err(format!("sigma ({}) must be finite and >= 0", self.sigma));
        }
        Ok(())
    }

    fn execute(&self, input: BranchInput<'_>) -> Vec<BranchImage> {
        let smoothed = blur::gaussian_blur(
            &input.normalized.grayscale,
            self.effective_kernel_size(),
            self.sigma,
        );
        with_bands(edge::detect_edges(&smoothed, Thresholds::BLUR_BRANCH))
    }
}

/// Parameters of the `contour` branch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourParams {
    /// Simplification tolerance as a fraction of each contour's
    /// perimeter, in `(0, 1]`.
    pub epsilon_factor: f64,
}

impl Default for ContourParams {
    fn default() -> Self {
        Self {
            epsilon_factor: 0.02,
        }
    }
}

impl Technique for ContourParams {
    const KIND: TechniqueKind = TechniqueKind::Contour;

    fn validate(&self, _dimensions: Dimensions) -> Result<(), String> {
        if !(self.epsilon_factor > 0.0 && self.epsilon_factor <= 1.0) {
            return Err(format!(
                "epsilon_factor ({}) must lie in (0, 1]",
                self.epsilon_factor
            ));
        }
        Ok(())
    }

    fn execute(&self, input: BranchInput<'_>) -> Vec<BranchImage> {
        vec![(
            None,
            contour::contour_outlines(input.baseline, self.epsilon_factor),
        )]
    }
}

/// Full frame followed by its top and bottom bands.
fn with_bands(full: GrayImage) -> Vec<BranchImage> {
    let mut images = Vec::with_capacity(1 + Region::ALL.len());
    for band in Region::ALL {
        images.push((Some(band), region::crop(&full, band)));
    }
    images.insert(0, (None, full));
    images
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

type Runner = fn(BranchInput<'_>, &Value) -> Result<Vec<BranchImage>, PipelineError>;

const DISPATCH: [(TechniqueKind, Runner); 4] = [
    (TechniqueKind::Threshold, run::<ThresholdParams>),
    (TechniqueKind::Sparsification, run::<SparsificationParams>),
    (TechniqueKind::Blur, run::<BlurParams>),
    (TechniqueKind::Contour, run::<ContourParams>),
];

fn run<T: Technique>(input: BranchInput<'_>, record: &Value) -> Result<Vec<BranchImage>, PipelineError> {
    let params = parse_params::<T>(record)?;
    params
        .validate(input.normalized.dimensions)
        .map_err(|reason| PipelineError::invalid(T::KIND.name(), reason))?;
    Ok(params.execute(input))
}

fn parse_params<T: Technique>(record: &Value) -> Result<T, PipelineError> {
    if record.is_null() {
        return Ok(T::default());
    }
    T::deserialize(record).map_err(|e| PipelineError::invalid(T::KIND.name(), e.to_string()))
}

/// Images produced by one successful branch.
#[derive(Debug, Clone)]
pub struct BranchOutput {
    /// Which technique produced the images.
    pub kind: TechniqueKind,
    /// Full frame first, then any bands.
    pub images: Vec<BranchImage>,
}

/// A requested technique that produced nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    /// Technique name as it appeared in the configuration.
    pub technique: String,
    /// Why the branch was skipped.
    pub reason: String,
}

/// Run every requested technique in parallel.
///
/// Unknown names and invalid parameter records end up in the returned
/// skip list; they never fail the whole call.
#[must_use]
pub fn run_branches(
    input: BranchInput<'_>,
    config: &TechniqueConfig,
) -> (Vec<BranchOutput>, Vec<Skipped>) {
    let mut skipped = Vec::new();
    let mut jobs = Vec::new();
    for (name, record) in &config.0 {
        match DISPATCH.iter().find(|(kind, _)| kind.name() == name.as_str()) {
            Some(&(kind, runner)) => jobs.push((kind, runner, record)),
            None => {
                warn!("ignoring unknown technique `{name}`");
                skipped.push(Skipped {
                    technique: name.clone(),
                    reason: "unknown technique".to_owned(),
                });
            }
        }
    }

    let results: Vec<(TechniqueKind, Result<Vec<BranchImage>, PipelineError>)> = jobs
        .into_par_iter()
        .map(|(kind, runner, record)| {
            let start = Instant::now();
            let result = runner(input, record);
            debug!("{kind} branch finished in {:?}", start.elapsed());
            (kind, result)
        })
        .collect();

    let mut outputs = Vec::with_capacity(results.len());
    for (kind, result) in results {
        match result {
            Ok(images) => outputs.push(BranchOutput { kind, images }),
            Err(e) => {
                warn!("skipping {kind}: {e}");
                skipped.push(Skipped {
                    technique: kind.name().to_owned(),
                    reason: e.to_string(),
                });
            }
        }
    }
    (outputs, skipped)
}
