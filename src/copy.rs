//! Bounded-concurrency asset copying
//!
//! One build action that copies a manifest of entries into the output
//! directory through a fixed-size worker pool. Every entry is attempted
//! even when siblings fail; the action fails afterwards with the list of
//! entries that did not copy.

use crate::environment::Environment;
use crate::error::{BuildError, CopyFailure, Result};
use crate::target::{BoxedBuildFuture, BuildAction};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error};

/// One unit of copy work.
#[derive(Debug, Clone)]
pub struct AssetEntry {
    /// Path of the content to copy; a relative path is interpreted against
    /// the environment's project directory
    pub source: PathBuf,
    /// Destination path relative to the environment's output directory
    pub destination: PathBuf,
}

/// Copies asset entries into the output directory under a bounded pool.
///
/// The pool size caps concurrently open file pairs; entries otherwise run
/// independently, each creating its own parent directories. Output files
/// are written to their final paths directly; an interrupted run is
/// recovered by the next run's fingerprint check.
pub struct AssetCopyAction {
    entries: Vec<AssetEntry>,
    pool_size: usize,
}

impl AssetCopyAction {
    /// Create a copy action. A zero `pool_size` is clamped to one worker.
    pub fn new(entries: Vec<AssetEntry>, pool_size: usize) -> Self {
        Self {
            entries,
            pool_size: pool_size.max(1),
        }
    }

    /// Create a copy action sized to the host CPU count.
    pub fn with_default_pool(entries: Vec<AssetEntry>) -> Self {
        Self::new(entries, num_cpus::get())
    }
}

impl BuildAction for AssetCopyAction {
    fn build(&self, environment: Arc<Environment>) -> BoxedBuildFuture {
        let entries = self.entries.clone();
        let pool_size = self.pool_size;
        Box::pin(async move { copy_all(entries, pool_size, environment).await })
    }
}

async fn copy_all(
    entries: Vec<AssetEntry>,
    pool_size: usize,
    environment: Arc<Environment>,
) -> Result<()> {
    let total = entries.len();
    debug!("copying {} assets with pool size {}", total, pool_size);

    let pool = Arc::new(Semaphore::new(pool_size));
    let mut handles = Vec::with_capacity(total);

    for entry in entries {
        let pool = pool.clone();
        let environment = environment.clone();
        handles.push(tokio::spawn(async move {
            let _permit = match pool.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    return Err(CopyFailure {
                        destination: entry.destination,
                        reason: format!("copy pool closed: {}", e),
                    });
                }
            };
            // join() leaves absolute sources untouched.
            let source = environment.project_dir.join(&entry.source);
            let destination = environment.output_dir.join(&entry.destination);
            match copy_entry(&source, &destination).await {
                Ok(()) => Ok(()),
                Err(e) => Err(CopyFailure {
                    destination: entry.destination,
                    reason: e.to_string(),
                }),
            }
        }));
    }

    // A failed entry must not abort siblings already in flight; collect
    // everything, then report.
    let mut failures = Vec::new();
    for handle in handles {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(failure)) => {
                error!("asset copy failed: {}", failure);
                failures.push(failure);
            }
            Err(e) => return Err(e.into()),
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(BuildError::CopyFailed {
            failed: failures.len(),
            total,
            failures,
        })
    }
}

async fn copy_entry(source: &Path, destination: &Path) -> Result<()> {
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let _ = tokio::fs::copy(source, destination).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::UnconfiguredArtifacts;
    use tempfile::TempDir;

    fn test_env(temp: &TempDir) -> Arc<Environment> {
        let base = std::fs::canonicalize(temp.path()).unwrap();
        for dir in ["project", "build", "cache", "toolchain", "out"] {
            std::fs::create_dir_all(base.join(dir)).unwrap();
        }
        Arc::new(
            Environment::new(
                base.join("project"),
                base.join("build"),
                base.join("cache"),
                base.join("toolchain"),
                base.join("out"),
                None,
                Arc::new(UnconfiguredArtifacts),
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_copies_into_nested_destinations() {
        let temp = TempDir::new().unwrap();
        let env = test_env(&temp);
        let asset = env.project_dir.join("logo.png");
        std::fs::write(&asset, "png bytes").unwrap();

        let action = AssetCopyAction::new(
            vec![AssetEntry {
                source: asset,
                destination: PathBuf::from("images/brand/logo.png"),
            }],
            4,
        );
        action.build(env.clone()).await.unwrap();

        let copied = env.output_dir.join("images/brand/logo.png");
        assert_eq!(std::fs::read_to_string(copied).unwrap(), "png bytes");
    }

    #[tokio::test]
    async fn test_all_entries_attempted_and_failures_reported() {
        let temp = TempDir::new().unwrap();
        let env = test_env(&temp);

        // 100 entries, 3 pointing at sources that do not exist.
        let missing: [usize; 3] = [7, 42, 99];
        let mut entries = Vec::new();
        for i in 0..100 {
            let source = env.project_dir.join(format!("asset-{:03}.dat", i));
            if !missing.contains(&i) {
                std::fs::write(&source, format!("payload {}", i)).unwrap();
            }
            entries.push(AssetEntry {
                source,
                destination: PathBuf::from(format!("data/asset-{:03}.dat", i)),
            });
        }

        let action = AssetCopyAction::new(entries, 8);
        let result = action.build(env.clone()).await;

        match result {
            Err(BuildError::CopyFailed {
                failed,
                total,
                failures,
            }) => {
                assert_eq!(failed, 3);
                assert_eq!(total, 100);
                assert_eq!(failures.len(), 3);
            }
            other => panic!("expected CopyFailed, got {:?}", other.err()),
        }

        // The 97 good entries all landed despite the failures.
        let written = std::fs::read_dir(env.output_dir.join("data")).unwrap().count();
        assert_eq!(written, 97);
    }

    #[tokio::test]
    async fn test_empty_manifest_succeeds() {
        let temp = TempDir::new().unwrap();
        let env = test_env(&temp);
        let action = AssetCopyAction::with_default_pool(vec![]);
        action.build(env).await.unwrap();
    }
}
