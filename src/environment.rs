//! Build environment: directory roots and injected capabilities

use crate::error::{BuildError, Result};
use crate::source::{ArtifactId, BuildMode, HostArtifactId, Platform};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Resolves named toolchain artifacts to concrete paths.
///
/// Injected into the [`Environment`]; the engine never hard-codes artifact
/// locations.
pub trait ArtifactResolver: Send + Sync {
    /// Resolve an artifact, optionally scoped by platform and build mode.
    ///
    /// The returned path may be a file or a directory; directory artifacts
    /// are enumerated recursively at resolution time.
    fn resolve(
        &self,
        id: &ArtifactId,
        platform: Option<Platform>,
        mode: Option<BuildMode>,
    ) -> Result<PathBuf>;

    /// Resolve a host-toolchain-scoped artifact.
    fn resolve_host(&self, id: &HostArtifactId) -> Result<PathBuf>;
}

/// An artifact resolver for environments with no toolchain configured.
///
/// Every lookup fails; pattern-only build graphs (e.g. manifests loaded by
/// the CLI) never hit it.
pub struct UnconfiguredArtifacts;

impl ArtifactResolver for UnconfiguredArtifacts {
    fn resolve(
        &self,
        id: &ArtifactId,
        _platform: Option<Platform>,
        _mode: Option<BuildMode>,
    ) -> Result<PathBuf> {
        Err(BuildError::ArtifactLookup(format!(
            "no toolchain configured, cannot resolve artifact '{}'",
            id
        )))
    }

    fn resolve_host(&self, id: &HostArtifactId) -> Result<PathBuf> {
        Err(BuildError::ArtifactLookup(format!(
            "no toolchain configured, cannot resolve host artifact '{}'",
            id
        )))
    }
}

/// Immutable per-invocation build environment.
///
/// Holds the five directory roots pattern templates resolve against, the
/// optional pinned toolchain version, and the artifact resolver capability.
/// Constructed once per build; roots need not exist yet at construction
/// time (existence is a resolution-time concern).
#[derive(Clone)]
pub struct Environment {
    /// Root for `PROJECT_DIR` templates
    pub project_dir: PathBuf,
    /// Root for `BUILD_DIR` templates; depfiles are looked up here
    pub build_dir: PathBuf,
    /// Root for `CACHE_DIR` templates; fingerprint records live here
    pub cache_dir: PathBuf,
    /// Root for `TOOLCHAIN_ROOT` templates
    pub toolchain_root: PathBuf,
    /// Root for `OUTPUT_DIR` templates; asset copies land here
    pub output_dir: PathBuf,
    /// Pinned toolchain version. When set, artifact sources degrade to the
    /// single version-marker file so the whole toolchain fingerprints as one
    /// unit.
    pub engine_version: Option<String>,
    /// Artifact path lookup capability
    pub artifacts: Arc<dyn ArtifactResolver>,
}

impl Environment {
    /// Create a new environment. Every root must be an absolute path.
    pub fn new(
        project_dir: impl Into<PathBuf>,
        build_dir: impl Into<PathBuf>,
        cache_dir: impl Into<PathBuf>,
        toolchain_root: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        engine_version: Option<String>,
        artifacts: Arc<dyn ArtifactResolver>,
    ) -> Result<Self> {
        let env = Self {
            project_dir: project_dir.into(),
            build_dir: build_dir.into(),
            cache_dir: cache_dir.into(),
            toolchain_root: toolchain_root.into(),
            output_dir: output_dir.into(),
            engine_version,
            artifacts,
        };

        for root in [
            &env.project_dir,
            &env.build_dir,
            &env.cache_dir,
            &env.toolchain_root,
            &env.output_dir,
        ] {
            if !root.is_absolute() {
                return Err(BuildError::RelativeRoot(root.clone()));
            }
        }

        Ok(env)
    }

    /// Map a pattern root token to its directory, or `None` for an
    /// unrecognized token.
    pub fn root_dir(&self, token: &str) -> Option<&Path> {
        match token {
            "PROJECT_DIR" => Some(&self.project_dir),
            "BUILD_DIR" => Some(&self.build_dir),
            "CACHE_DIR" => Some(&self.cache_dir),
            "TOOLCHAIN_ROOT" => Some(&self.toolchain_root),
            "OUTPUT_DIR" => Some(&self.output_dir),
            _ => None,
        }
    }

    /// The version-marker file artifact sources degrade to in pinned mode.
    pub fn version_marker(&self) -> PathBuf {
        self.toolchain_root.join("version")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Environment {
        Environment::new(
            "/p",
            "/b",
            "/c",
            "/t",
            "/o",
            None,
            Arc::new(UnconfiguredArtifacts),
        )
        .unwrap()
    }

    #[test]
    fn test_root_token_mapping() {
        let env = env();
        assert_eq!(env.root_dir("PROJECT_DIR"), Some(Path::new("/p")));
        assert_eq!(env.root_dir("BUILD_DIR"), Some(Path::new("/b")));
        assert_eq!(env.root_dir("CACHE_DIR"), Some(Path::new("/c")));
        assert_eq!(env.root_dir("TOOLCHAIN_ROOT"), Some(Path::new("/t")));
        assert_eq!(env.root_dir("OUTPUT_DIR"), Some(Path::new("/o")));
        assert_eq!(env.root_dir("HOME"), None);
    }

    #[test]
    fn test_relative_root_rejected() {
        let result = Environment::new(
            "relative/project",
            "/b",
            "/c",
            "/t",
            "/o",
            None,
            Arc::new(UnconfiguredArtifacts),
        );
        assert!(matches!(result, Err(BuildError::RelativeRoot(_))));
    }

    #[test]
    fn test_version_marker() {
        assert_eq!(env().version_marker(), PathBuf::from("/t/version"));
    }

    #[test]
    fn test_unconfigured_artifacts_fail() {
        let env = env();
        let result = env
            .artifacts
            .resolve(&ArtifactId::new("engine_lib"), None, None);
        assert!(matches!(result, Err(BuildError::ArtifactLookup(_))));
    }
}
