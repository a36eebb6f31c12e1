//! chartedge-io: template lookup and file reading around the pure
//! pipeline.
//!
//! The pipeline crate never touches the filesystem. This crate resolves
//! template identifiers to files, performs the single read of the source
//! bytes and hands them to [`chartedge_pipeline`].

pub mod error;
pub mod resolver;

use std::path::Path;
use std::time::Instant;

use chartedge_pipeline::{ArtifactBundle, TechniqueConfig};
use log::{debug, info};

pub use error::{Outcome, ServiceError};
pub use resolver::{CandidateRoot, DEFAULT_TEMPLATE_ROOTS, ResolverConfig, SourceResolver};

/// Resolve a template by name and run the full pipeline on it.
///
/// With no `config`, only the baseline template artifacts are produced.
///
/// # Errors
///
/// Returns [`ServiceError::InvalidFilename`] or
/// [`ServiceError::SourceNotFound`] when the template cannot be located,
/// [`ServiceError::Read`] when it cannot be read, and
/// [`ServiceError::Pipeline`] when it cannot be decoded or encoded.
pub fn process_template_image(
    resolver: &SourceResolver,
    filename: &str,
    config: Option<&TechniqueConfig>,
) -> Result<ArtifactBundle, ServiceError> {
    let path = resolver.resolve(filename)?;
    let bytes = read_source(&path)?;

    let start = Instant::now();
    let default_config = TechniqueConfig::new();
    let bundle = chartedge_pipeline::process(&bytes, config.unwrap_or(&default_config))?;
    info!(
        "processed template `{filename}` ({} artifacts, {} skipped) in {:?}",
        bundle.len(),
        bundle.skipped().len(),
        start.elapsed()
    );
    Ok(bundle)
}

/// Run the baseline-only pipeline on an image file, as for an upload.
///
/// # Errors
///
/// Returns [`ServiceError::Read`] when the file cannot be read and
/// [`ServiceError::Pipeline`] when it cannot be decoded or encoded.
pub fn process_image_file(path: &Path) -> Result<ArtifactBundle, ServiceError> {
    let bytes = read_source(path)?;
    Ok(chartedge_pipeline::process_image(&bytes)?)
}

fn read_source(path: &Path) -> Result<Vec<u8>, ServiceError> {
    let bytes = std::fs::read(path).map_err(|source| ServiceError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("read {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}
