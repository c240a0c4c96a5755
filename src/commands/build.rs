//! `kiln build` - run the build graph for one target

use crate::environment::{Environment, UnconfiguredArtifacts};
use crate::error::{BuildError, Result};
use crate::executor::BuildSystem;
use crate::manifest::BuildManifest;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// CLI arguments for one build invocation.
pub struct BuildArgs {
    pub manifest: PathBuf,
    pub project: PathBuf,
    pub builddir: PathBuf,
    pub output: Option<PathBuf>,
    pub cache: Option<PathBuf>,
    pub toolchain_root: Option<PathBuf>,
    pub engine_version: Option<String>,
    pub jobs: Option<usize>,
    pub target: String,
}

/// Run the build and print a summary.
pub async fn execute(args: BuildArgs) -> Result<()> {
    let manifest = BuildManifest::load(&args.manifest).await?;

    let cwd = std::env::current_dir()?;
    let project = absolutize(&cwd, &args.project);
    let builddir = absolutize(&cwd, &args.builddir);
    let output = args
        .output
        .map(|p| absolutize(&cwd, &p))
        .unwrap_or_else(|| builddir.join("out"));
    let cache = args
        .cache
        .map(|p| absolutize(&cwd, &p))
        .unwrap_or_else(|| builddir.join("cache"));
    let toolchain_root = args
        .toolchain_root
        .map(|p| absolutize(&cwd, &p))
        .unwrap_or_else(|| builddir.join("toolchain"));

    for dir in [&builddir, &output, &cache, &toolchain_root] {
        tokio::fs::create_dir_all(dir).await?;
    }

    let environment = Arc::new(Environment::new(
        project,
        builddir,
        cache,
        toolchain_root,
        output,
        args.engine_version,
        Arc::new(UnconfiguredArtifacts),
    )?);

    let jobs = args.jobs.unwrap_or_else(num_cpus::get);
    let graph = manifest.to_graph(jobs)?;
    info!("building '{}' with {} copy workers", args.target, jobs);

    let system = BuildSystem::new(&environment);
    let result = system.build(&graph, &args.target, &environment).await?;
    result.display();

    if result.success {
        Ok(())
    } else {
        // Configuration errors never reach this point; report the first
        // action failure.
        let cause = result
            .failures
            .first()
            .map(|f| format!("{}: {}", f.target, f.error))
            .unwrap_or_else(|| "unknown failure".to_string());
        Err(BuildError::BuildFailed(cause))
    }
}

fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    // join() keeps already-absolute paths as-is.
    std::fs::canonicalize(cwd.join(path)).unwrap_or_else(|_| cwd.join(path))
}
