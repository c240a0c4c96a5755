//! Source resolution against a build environment
//!
//! Turns a target's declared [`Source`] list (plus its declared depfiles)
//! into a concrete, deduplicated file list. Soft conditions (missing
//! optional file, missing or malformed depfile) degrade gracefully;
//! malformed pattern templates are hard errors.

use crate::depfile::Depfile;
use crate::environment::Environment;
use crate::error::{BuildError, Result};
use crate::source::Source;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Whether a resolution pass is collecting a target's inputs or outputs.
///
/// The mode selects which side of a depfile is appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    /// Collect input files
    Inputs,
    /// Collect output files
    Outputs,
}

/// The concrete result of resolving a source list.
#[derive(Debug, Clone)]
pub struct ResolvedFiles {
    /// Resolved files, deduplicated, in declaration order (directory
    /// listings contribute in sorted order)
    pub sources: Vec<PathBuf>,
    /// Set when a declared depfile does not exist yet, meaning the target
    /// has never run and its dependency set is not fully known
    pub contains_new_depfile: bool,
}

/// Resolve a list of sources and depfile names in the context of one
/// environment and mode.
pub async fn resolve(
    env: &Environment,
    sources: &[Source],
    depfiles: &[String],
    mode: ResolveMode,
) -> Result<ResolvedFiles> {
    let mut visitor = SourceVisitor::new(env, mode);

    for source in sources {
        match source {
            Source::Pattern { template, optional } => {
                visitor.visit_pattern(template, *optional).await?;
            }
            Source::Artifact {
                id,
                platform,
                mode: build_mode,
            } => {
                let path = if env.engine_version.is_some() {
                    env.version_marker()
                } else {
                    env.artifacts.resolve(id, *platform, *build_mode)?
                };
                visitor.add_path_or_tree(path).await?;
            }
            Source::HostArtifact { id } => {
                let path = if env.engine_version.is_some() {
                    env.version_marker()
                } else {
                    env.artifacts.resolve_host(id)?
                };
                visitor.add_path_or_tree(path).await?;
            }
        }
    }

    for name in depfiles {
        visitor.visit_depfile(name).await?;
    }

    Ok(visitor.finish())
}

/// Accumulates resolved files for one pass; consumed by [`resolve`].
struct SourceVisitor<'a> {
    env: &'a Environment,
    mode: ResolveMode,
    sources: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
    contains_new_depfile: bool,
}

impl<'a> SourceVisitor<'a> {
    fn new(env: &'a Environment, mode: ResolveMode) -> Self {
        Self {
            env,
            mode,
            sources: Vec::new(),
            seen: HashSet::new(),
            contains_new_depfile: false,
        }
    }

    fn finish(self) -> ResolvedFiles {
        ResolvedFiles {
            sources: self.sources,
            contains_new_depfile: self.contains_new_depfile,
        }
    }

    fn push(&mut self, path: PathBuf) {
        if self.seen.insert(path.clone()) {
            self.sources.push(path);
        }
    }

    /// Resolve one pattern template.
    async fn visit_pattern(&mut self, template: &str, optional: bool) -> Result<()> {
        let mut segments = template.split('/');
        let token = segments.next().unwrap_or_default();
        let root = self
            .env
            .root_dir(token)
            .ok_or_else(|| BuildError::UnknownRoot {
                token: token.to_string(),
                template: template.to_string(),
            })?;

        // Symlinks in the root are resolved now, not at environment
        // construction; the root may have appeared since then.
        let root = canonical_or_raw(root).await;

        let rest: Vec<&str> = segments.collect();
        for (index, segment) in rest.iter().enumerate() {
            if segment.contains('*') && index != rest.len() - 1 {
                return Err(BuildError::InvalidPattern {
                    template: template.to_string(),
                    reason: "wildcard is only allowed in the final segment".to_string(),
                });
            }
        }

        match rest.last() {
            Some(last) if last.contains('*') => {
                if last.matches('*').count() > 1 {
                    return Err(BuildError::InvalidPattern {
                        template: template.to_string(),
                        reason: "at most one wildcard is allowed".to_string(),
                    });
                }
                let directory = rest[..rest.len() - 1]
                    .iter()
                    .fold(root, |path, segment| path.join(segment));
                self.visit_wildcard(&directory, last).await
            }
            _ => {
                let path = rest.iter().fold(root, |path, segment| path.join(segment));
                if tokio::fs::try_exists(&path).await? {
                    self.push(path);
                } else if optional {
                    debug!("optional source {} does not exist, excluded", path.display());
                } else {
                    return Err(BuildError::MissingInput(path));
                }
                Ok(())
            }
        }
    }

    /// List `directory` and keep entries whose names match the wildcard
    /// fragments. A not-yet-populated directory is created empty rather
    /// than treated as an error.
    async fn visit_wildcard(&mut self, directory: &Path, filename_pattern: &str) -> Result<()> {
        if !tokio::fs::try_exists(directory).await? {
            tokio::fs::create_dir_all(directory).await?;
            return Ok(());
        }

        let fragments: Vec<&str> = filename_pattern
            .split('*')
            .filter(|fragment| !fragment.is_empty())
            .collect();

        let mut matched = Vec::new();
        let mut entries = tokio::fs::read_dir(directory).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if matches_fragments(name, &fragments) {
                matched.push(entry.path());
            }
        }

        // Directory listing order is filesystem-dependent; sort so results
        // are deterministic.
        matched.sort();
        for path in matched {
            self.push(path);
        }
        Ok(())
    }

    /// Add a resolved artifact path: directories contribute every regular
    /// file beneath them, files contribute themselves.
    async fn add_path_or_tree(&mut self, path: PathBuf) -> Result<()> {
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BuildError::MissingInput(path));
            }
            Err(e) => return Err(e.into()),
        };

        if metadata.is_dir() {
            let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&path)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.path().to_path_buf())
                .collect();
            files.sort();
            for file in files {
                self.push(file);
            }
        } else {
            self.push(path);
        }
        Ok(())
    }

    /// Look up a declared depfile under the build directory and append the
    /// side selected by the resolution mode.
    async fn visit_depfile(&mut self, name: &str) -> Result<()> {
        let path = self.env.build_dir.join(name);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(
                    "depfile {} not yet produced, deferring fingerprint",
                    path.display()
                );
                self.contains_new_depfile = true;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let depfile = match Depfile::parse(&path, &content) {
            Ok(depfile) => depfile,
            Err(e) => {
                error!("skipping depfile: {}", e);
                return Ok(());
            }
        };

        let side = match self.mode {
            ResolveMode::Inputs => depfile.inputs,
            ResolveMode::Outputs => depfile.outputs,
        };
        for path in side {
            self.push(path);
        }
        Ok(())
    }
}

/// Keep every name with zero fragments; with one, require a prefix or
/// suffix match; with two, require the prefix and the suffix on what
/// remains after it.
fn matches_fragments(name: &str, fragments: &[&str]) -> bool {
    match fragments {
        [] => true,
        [fragment] => name.starts_with(fragment) || name.ends_with(fragment),
        [prefix, suffix] => {
            name.starts_with(prefix) && name[prefix.len()..].ends_with(suffix)
        }
        _ => false,
    }
}

async fn canonical_or_raw(path: &Path) -> PathBuf {
    tokio::fs::canonicalize(path)
        .await
        .unwrap_or_else(|_| path.to_path_buf())
}
