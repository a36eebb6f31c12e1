//! Template source resolution.
//!
//! Templates are stored under one of several directories depending on how
//! the service was launched (from the repository root, from the backend
//! directory, or from a packaged layout). A [`SourceResolver`] checks an
//! ordered list of candidate roots and returns the first one holding the
//! requested file. Resolution only checks for existence; nothing is
//! created or modified.

use std::path::{Component, Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Candidate roots checked when no configuration is given, in order.
pub const DEFAULT_TEMPLATE_ROOTS: [&str; 4] = [
    "public/templates",
    "backend/templates",
    "../public/templates",
    "templates",
];

/// One place a template may live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateRoot {
    /// A fixed directory.
    Absolute(PathBuf),
    /// A directory relative to the working directory at resolution time.
    WorkingDir(PathBuf),
}

impl CandidateRoot {
    /// The directory this root denotes right now.
    ///
    /// Working-directory roots are joined to the current directory when
    /// it can be determined and used as given otherwise.
    #[must_use]
    pub fn directory(&self) -> PathBuf {
        match self {
            Self::Absolute(path) => path.clone(),
            Self::WorkingDir(relative) => std::path::absolute(relative).unwrap_or_else(|e| {
                warn!(
                    "cannot resolve {} against the working directory: {e}",
                    relative.display()
                );
                relative.clone()
            }),
        }
    }
}

impl From<PathBuf> for CandidateRoot {
    fn from(path: PathBuf) -> Self {
        if path.is_absolute() {
            Self::Absolute(path)
        } else {
            Self::WorkingDir(path)
        }
    }
}

impl From<&str> for CandidateRoot {
    fn from(path: &str) -> Self {
        PathBuf::from(path).into()
    }
}

/// Serialized resolver settings.
///
/// ```json
/// { "template_roots": ["/srv/charts/templates", "public/templates"] }
/// ```
///
/// Relative entries are resolved against the working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Candidate roots, highest priority first.
    pub template_roots: Vec<PathBuf>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            template_roots: DEFAULT_TEMPLATE_ROOTS.iter().map(PathBuf::from).collect(),
        }
    }
}

impl ResolverConfig {
    /// Parse settings from JSON text. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if `text` is not a valid settings object.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Locates template files across an ordered list of candidate roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceResolver {
    roots: Vec<CandidateRoot>,
}

impl Default for SourceResolver {
    fn default() -> Self {
        Self::from_config(&ResolverConfig::default())
    }
}

impl SourceResolver {
    /// A resolver over `roots`, highest priority first.
    #[must_use]
    pub const fn new(roots: Vec<CandidateRoot>) -> Self {
        Self { roots }
    }

    /// A resolver over the roots listed in `config`.
    #[must_use]
    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(
            config
                .template_roots
                .iter()
                .cloned()
                .map(CandidateRoot::from)
                .collect(),
        )
    }

    /// Configured roots, highest priority first.
    #[must_use]
    pub fn roots(&self) -> &[CandidateRoot] {
        &self.roots
    }

    /// Candidate paths for `filename`, in priority order.
    ///
    /// Directories are computed lazily as the iterator advances.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidFilename`] if `filename` is not a
    /// single plain file name.
    pub fn candidates<'a>(
        &'a self,
        filename: &'a str,
    ) -> Result<impl Iterator<Item = PathBuf> + 'a, ServiceError> {
        validate_filename(filename)?;
        Ok(self.roots.iter().map(move |root| root.directory().join(filename)))
    }

    /// Absolute path of the first candidate that is an existing file.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidFilename`] if `filename` is not a
    /// single plain file name, or [`ServiceError::SourceNotFound`] listing
    /// every checked path when no candidate exists.
    pub fn resolve(&self, filename: &str) -> Result<PathBuf, ServiceError> {
        let mut tried = Vec::with_capacity(self.roots.len());
        for candidate in self.candidates(filename)? {
            if candidate.is_file() {
                debug!("resolved `{filename}` to {}", candidate.display());
                return Ok(std::path::absolute(&candidate).unwrap_or(candidate));
            }
            debug!("`{filename}` not at {}", candidate.display());
            tried.push(candidate);
        }
        Err(ServiceError::SourceNotFound {
            filename: filename.to_owned(),
            candidates: tried,
        })
    }
}

/// Accept only a non-empty single path component with no separators.
fn validate_filename(filename: &str) -> Result<(), ServiceError> {
    let mut components = Path::new(filename).components();
    let plain = !filename.contains(['/', '\\', '\0'])
        && matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
    if plain {
        Ok(())
    } else {
        Err(ServiceError::InvalidFilename(filename.to_owned()))
    }
}
