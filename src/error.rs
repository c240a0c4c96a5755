//! Error types for the build engine

use std::path::PathBuf;
use thiserror::Error;

/// Result type for build engine operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// A single asset copy that did not complete.
#[derive(Debug, Clone)]
pub struct CopyFailure {
    /// Destination path relative to the output directory
    pub destination: PathBuf,
    /// Underlying cause, rendered as text
    pub reason: String,
}

impl std::fmt::Display for CopyFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.destination.display(), self.reason)
    }
}

/// Errors that can occur while declaring, resolving, or executing targets.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Malformed pattern template (wildcard misuse)
    #[error("invalid pattern '{template}': {reason}")]
    InvalidPattern {
        /// The offending template string
        template: String,
        /// What was wrong with it
        reason: String,
    },

    /// Pattern template starts with an unrecognized root token
    #[error("unknown root token '{token}' in pattern '{template}'")]
    UnknownRoot {
        /// The leading segment that failed to match a root
        token: String,
        /// The offending template string
        template: String,
    },

    /// A required (non-optional) input does not exist
    #[error("required input does not exist: {0}")]
    MissingInput(PathBuf),

    /// A target completed without producing a declared output or depfile
    #[error("target '{target}' did not produce declared output: {path}")]
    MissingOutput {
        /// Name of the under-producing target
        target: String,
        /// The declared path that is absent
        path: PathBuf,
    },

    /// Depfile content did not parse as a single Make rule
    #[error("malformed depfile '{path}': {reason}")]
    MalformedDepfile {
        /// Path of the depfile on disk
        path: PathBuf,
        /// Parse failure description
        reason: String,
    },

    /// Two targets share one name
    #[error("duplicate target name '{0}'")]
    DuplicateTarget(String),

    /// A target names a dependency that is not in the graph
    #[error("target '{target}' depends on unknown target '{dependency}'")]
    UnknownDependency {
        /// The declaring target
        target: String,
        /// The missing dependency name
        dependency: String,
    },

    /// The dependency graph contains a cycle
    #[error("dependency cycle detected: {0}")]
    CycleDetected(String),

    /// The requested root target is not in the graph
    #[error("target '{0}' not found in build graph")]
    TargetNotFound(String),

    /// Environment roots must be absolute paths
    #[error("environment root must be an absolute path: {0}")]
    RelativeRoot(PathBuf),

    /// The artifact resolver could not supply a path
    #[error("artifact lookup failed: {0}")]
    ArtifactLookup(String),

    /// One or more asset copies failed; all entries were attempted
    #[error("{failed} of {total} asset copies failed")]
    CopyFailed {
        /// Number of entries that failed
        failed: usize,
        /// Number of entries attempted
        total: usize,
        /// Per-entry failure details
        failures: Vec<CopyFailure>,
    },

    /// The build graph as a whole did not succeed
    #[error("build failed: {0}")]
    BuildFailed(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Fingerprint record or manifest (de)serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A spawned copy task panicked or was cancelled
    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl BuildError {
    /// Configuration errors are precondition failures of the whole graph and
    /// abort the build before (or instead of) running any further action.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            BuildError::InvalidPattern { .. }
                | BuildError::UnknownRoot { .. }
                | BuildError::DuplicateTarget(_)
                | BuildError::UnknownDependency { .. }
                | BuildError::CycleDetected(_)
                | BuildError::TargetNotFound(_)
                | BuildError::RelativeRoot(_)
        )
    }
}
