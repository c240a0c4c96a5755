//! Declarative file source specifications
//!
//! A [`Source`] describes one or more files symbolically; resolution against
//! an [`Environment`](crate::environment::Environment) happens in
//! [`visitor`](crate::visitor).

/// Identifier of a toolchain artifact (a named tool or library).
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct ArtifactId(pub String);

impl ArtifactId {
    /// Create a new artifact identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a host-toolchain-scoped artifact.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct HostArtifactId(pub String);

impl HostArtifactId {
    /// Create a new host artifact identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for HostArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Target platform an artifact is resolved for.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum Platform {
    /// Linux desktop
    Linux,
    /// macOS desktop
    MacOs,
    /// Windows desktop
    Windows,
}

/// Build mode an artifact is resolved for.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum BuildMode {
    /// Unoptimized, assertions enabled
    Debug,
    /// Optimized with profiling hooks
    Profile,
    /// Fully optimized
    Release,
}

/// A declarative specification of one or more files.
///
/// Pattern templates are slash-separated and rooted at one of the five
/// environment root tokens (`PROJECT_DIR`, `BUILD_DIR`, `CACHE_DIR`,
/// `TOOLCHAIN_ROOT`, `OUTPUT_DIR`). At most one `*` wildcard is allowed,
/// and only in the final segment.
#[derive(Debug, Clone)]
pub enum Source {
    /// A root-relative path template, optionally wildcarded
    Pattern {
        /// Template string, e.g. `BUILD_DIR/app.dill` or `PROJECT_DIR/assets/*.png`
        template: String,
        /// When true, a missing (non-wildcard) path resolves to no file
        /// instead of a hard error
        optional: bool,
    },

    /// A path obtained from the environment's artifact resolver
    Artifact {
        /// Which artifact to look up
        id: ArtifactId,
        /// Platform the artifact is scoped to, if any
        platform: Option<Platform>,
        /// Build mode the artifact is scoped to, if any
        mode: Option<BuildMode>,
    },

    /// Like [`Source::Artifact`], but host-toolchain-scoped
    HostArtifact {
        /// Which host artifact to look up
        id: HostArtifactId,
    },
}

impl Source {
    /// Shorthand for a required pattern source
    pub fn pattern(template: impl Into<String>) -> Self {
        Source::Pattern {
            template: template.into(),
            optional: false,
        }
    }

    /// Shorthand for an optional pattern source
    pub fn optional_pattern(template: impl Into<String>) -> Self {
        Source::Pattern {
            template: template.into(),
            optional: true,
        }
    }

    /// Shorthand for an artifact source with no platform/mode scope
    pub fn artifact(id: impl Into<String>) -> Self {
        Source::Artifact {
            id: ArtifactId::new(id),
            platform: None,
            mode: None,
        }
    }

    /// Shorthand for a host artifact source
    pub fn host_artifact(id: impl Into<String>) -> Self {
        Source::HostArtifact {
            id: HostArtifactId::new(id),
        }
    }

    /// Whether the concrete file set cannot be known without touching the
    /// filesystem: wildcard patterns, and artifact sources that may point at
    /// a directory.
    #[must_use]
    pub fn is_implicit(&self) -> bool {
        match self {
            Source::Pattern { template, .. } => template.contains('*'),
            Source::Artifact { .. } | Source::HostArtifact { .. } => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_implicit() {
        assert!(Source::pattern("BUILD_DIR/*.txt").is_implicit());
        assert!(!Source::pattern("BUILD_DIR/app.dill").is_implicit());
        assert!(!Source::optional_pattern("PROJECT_DIR/pins.json").is_implicit());
    }

    #[test]
    fn test_artifact_implicit() {
        assert!(Source::artifact("engine_lib").is_implicit());
        assert!(Source::host_artifact("bundler").is_implicit());
    }
}
