//! Build execution with incremental skip support

use crate::environment::Environment;
use crate::error::{BuildError, Result};
use crate::fingerprint::FingerprintStore;
use crate::target::{Target, TargetGraph};
use crate::visitor::{self, ResolveMode};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// One target that failed during execution.
#[derive(Debug)]
pub struct TargetFailure {
    /// Name of the failed target
    pub target: String,
    /// Underlying cause
    pub error: BuildError,
}

/// Outcome of one build-graph run.
///
/// The executed-vs-skipped split is the observable incremental-build
/// contract: callers report savings from it.
#[derive(Debug)]
pub struct BuildResult {
    /// Whether every target in the root's closure completed or skipped
    pub success: bool,
    /// Targets whose action ran, in execution order
    pub executed: Vec<String>,
    /// Targets skipped as unchanged
    pub skipped: Vec<String>,
    /// Targets never attempted because a dependency failed
    pub blocked: Vec<String>,
    /// Per-target failures
    pub failures: Vec<TargetFailure>,
    /// Wall time for the whole run
    pub duration: std::time::Duration,
}

impl BuildResult {
    /// Display a build summary.
    pub fn display(&self) {
        println!("\n📊 Build Summary:");
        println!("  Targets executed: {}", self.executed.len());
        println!("  Targets skipped:  {}", self.skipped.len());
        if !self.blocked.is_empty() {
            println!("  Targets blocked:  {}", self.blocked.len());
        }
        println!("  Duration:         {:.2}s", self.duration.as_secs_f64());
        for failure in &self.failures {
            println!("  ✗ {}: {}", failure.target, failure.error);
        }
    }
}

enum TargetOutcome {
    Executed,
    Skipped,
}

/// Walks a target graph in dependency order, running each target's action
/// unless its input fingerprint is unchanged.
pub struct BuildSystem {
    store: FingerprintStore,
}

impl BuildSystem {
    /// Create a build system whose fingerprint records live under the
    /// environment's cache directory.
    pub fn new(environment: &Environment) -> Self {
        Self {
            store: FingerprintStore::new(environment.cache_dir.join("fingerprints")),
        }
    }

    /// Run the build graph for `root`.
    ///
    /// Configuration errors (bad templates, cycles, unknown names) abort
    /// the whole build before or during the walk. Action errors fail their
    /// target, block its transitive dependents, and let unrelated targets
    /// proceed.
    pub async fn build(
        &self,
        graph: &TargetGraph,
        root: &str,
        environment: &Arc<Environment>,
    ) -> Result<BuildResult> {
        graph.validate()?;
        let order = graph.build_order(root)?;
        info!("build order for '{}': {} targets", root, order.len());

        let start = Instant::now();
        let mut executed = Vec::new();
        let mut skipped = Vec::new();
        let mut blocked = Vec::new();
        let mut failures = Vec::new();
        let mut failed: HashSet<String> = HashSet::new();

        for name in &order {
            let target = graph
                .get(name)
                .ok_or_else(|| BuildError::TargetNotFound(name.clone()))?;

            if target
                .dependencies
                .iter()
                .any(|dependency| failed.contains(dependency))
            {
                warn!("⊘ BLOCKED   {} (dependency failed)", name);
                let _ = failed.insert(name.clone());
                blocked.push(name.clone());
                continue;
            }

            match self.run_target(target, environment).await {
                Ok(TargetOutcome::Skipped) => {
                    info!("✓ UNCHANGED {}", name);
                    skipped.push(name.clone());
                }
                Ok(TargetOutcome::Executed) => {
                    info!("⚡ EXECUTED  {}", name);
                    executed.push(name.clone());
                }
                Err(e) if e.is_configuration() => return Err(e),
                Err(e) => {
                    error!("✗ FAILED    {}: {}", name, e);
                    // The fingerprint must not survive a failed run.
                    self.store.invalidate(name).await?;
                    let _ = failed.insert(name.clone());
                    failures.push(TargetFailure {
                        target: name.clone(),
                        error: e,
                    });
                }
            }
        }

        Ok(BuildResult {
            success: failures.is_empty(),
            executed,
            skipped,
            blocked,
            failures,
            duration: start.elapsed(),
        })
    }

    async fn run_target(
        &self,
        target: &Target,
        environment: &Arc<Environment>,
    ) -> Result<TargetOutcome> {
        let resolved = visitor::resolve(
            environment,
            &target.inputs,
            &target.depfiles,
            ResolveMode::Inputs,
        )
        .await?;

        if !resolved.contains_new_depfile
            && self
                .store
                .unchanged(&target.name, &resolved.sources)
                .await?
        {
            return Ok(TargetOutcome::Skipped);
        }

        target.action.build(environment.clone()).await?;

        // Under-production is a contract violation: every declared output
        // and depfile must exist once the action returns.
        let outputs = visitor::resolve(
            environment,
            &target.outputs,
            &[],
            ResolveMode::Outputs,
        )
        .await
        .map_err(|e| match e {
            BuildError::MissingInput(path) => BuildError::MissingOutput {
                target: target.name.clone(),
                path,
            },
            other => other,
        })?;
        debug!(
            "target '{}' produced {} declared output files",
            target.name,
            outputs.sources.len()
        );

        for depfile in &target.depfiles {
            let path = environment.build_dir.join(depfile);
            if !tokio::fs::try_exists(&path).await? {
                return Err(BuildError::MissingOutput {
                    target: target.name.clone(),
                    path,
                });
            }
        }

        // Re-resolve inputs so depfile-discovered dependencies land in the
        // stored fingerprint.
        let post = visitor::resolve(
            environment,
            &target.inputs,
            &target.depfiles,
            ResolveMode::Inputs,
        )
        .await?;
        self.store.update(&target.name, &post.sources).await?;

        Ok(TargetOutcome::Executed)
    }
}
