//! Errors surfaced by the I/O layer and their transport classification.

use std::path::PathBuf;

use chartedge_pipeline::PipelineError;

/// Errors that can occur while locating, reading or processing a source
/// image.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The template identifier is empty or is not a single plain file
    /// name.
    #[error("invalid template filename `{0}`")]
    InvalidFilename(String),

    /// No candidate location holds the template.
    #[error("template `{filename}` not found in {} candidate locations", .candidates.len())]
    SourceNotFound {
        /// Requested template identifier.
        filename: String,
        /// Every path that was checked, in order.
        candidates: Vec<PathBuf>,
    },

    /// The source file exists but could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// File that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Decoding or processing the image failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Coarse classification of a [`ServiceError`] for a transport boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The requested source does not exist.
    NotFound,
    /// The caller supplied something unusable.
    BadInput,
    /// Anything else.
    Internal,
}

impl Outcome {
    /// Matching HTTP status code.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::BadInput => 400,
            Self::Internal => 500,
        }
    }
}

impl ServiceError {
    /// Classify this error for the caller.
    #[must_use]
    pub const fn outcome(&self) -> Outcome {
        match self {
            Self::SourceNotFound { .. } => Outcome::NotFound,
            Self::InvalidFilename(_)
            | Self::Pipeline(
                PipelineError::EmptyInput | PipelineError::Decode(_) | PipelineError::Base64(_),
            ) => Outcome::BadInput,
            Self::Read { .. } | Self::Pipeline(_) => Outcome::Internal,
        }
    }
}
