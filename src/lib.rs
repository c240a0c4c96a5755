//! Kiln - incremental build orchestration engine
//!
//! Kiln runs a dependency graph of named [`Target`]s. Each target declares
//! symbolic input/output [`Source`] specifications that are resolved
//! against a build [`Environment`], and the engine decides per target,
//! via content fingerprints and Make-style depfiles, whether its action
//! must re-run.
//!
//! ## Architecture
//!
//! 1. **Source resolution**: [`visitor::resolve`] turns declared patterns,
//!    artifacts, and depfiles into concrete file lists
//! 2. **Dependency graph**: [`TargetGraph`] validates names, edges, and
//!    acyclicity before anything executes
//! 3. **Incremental skipping**: [`FingerprintStore`] persists per-target
//!    input stamps; unchanged targets are skipped
//! 4. **Execution**: [`BuildSystem`] walks the graph in dependency order
//!    and reports the executed-vs-skipped split
//! 5. **Asset copying**: [`AssetCopyAction`] copies manifests of files
//!    through a bounded worker pool
//!
//! ## Usage
//!
//! ```no_run
//! use kiln::{BuildManifest, BuildSystem, Environment, UnconfiguredArtifacts};
//! use std::sync::Arc;
//! # async fn example() -> kiln::Result<()> {
//! let manifest = BuildManifest::load("kiln.json".as_ref()).await?;
//! let graph = manifest.to_graph(8)?;
//!
//! let environment = Arc::new(Environment::new(
//!     "/work/app",
//!     "/work/app/build",
//!     "/work/app/build/cache",
//!     "/work/app/build/toolchain",
//!     "/work/app/build/out",
//!     None,
//!     Arc::new(UnconfiguredArtifacts),
//! )?);
//!
//! let system = BuildSystem::new(&environment);
//! let result = system.build(&graph, "bundle", &environment).await?;
//! println!("executed {} targets", result.executed.len());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod commands;
pub mod copy;
pub mod depfile;
pub mod environment;
pub mod error;
pub mod executor;
pub mod fingerprint;
pub mod manifest;
pub mod source;
pub mod target;
pub mod visitor;

pub use copy::{AssetCopyAction, AssetEntry};
pub use depfile::Depfile;
pub use environment::{ArtifactResolver, Environment, UnconfiguredArtifacts};
pub use error::{BuildError, CopyFailure, Result};
pub use executor::{BuildResult, BuildSystem, TargetFailure};
pub use fingerprint::{FingerprintRecord, FingerprintStore};
pub use manifest::BuildManifest;
pub use source::{ArtifactId, BuildMode, HostArtifactId, Platform, Source};
pub use target::{BoxedBuildFuture, BuildAction, Target, TargetGraph};
pub use visitor::{ResolveMode, ResolvedFiles};
