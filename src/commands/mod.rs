//! Kiln command-line interface
//!
//! - `build`: run the build graph for one target
//! - `graph`: validate a manifest and print its execution order

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod build;
pub mod graph;

/// Kiln - incremental build orchestration engine
#[derive(Parser)]
#[command(name = "kiln")]
#[command(about = "Incremental build orchestration with fingerprint-based skipping")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the build graph for a target
    Build {
        /// Path to the build manifest
        #[arg(short, long, default_value = "kiln.json")]
        manifest: PathBuf,

        /// Project directory (PROJECT_DIR root)
        #[arg(short, long, default_value = ".")]
        project: PathBuf,

        /// Build directory (BUILD_DIR root)
        #[arg(short, long, default_value = "build")]
        builddir: PathBuf,

        /// Output directory; defaults to <builddir>/out
        #[arg(long)]
        output: Option<PathBuf>,

        /// Cache directory; defaults to <builddir>/cache
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Toolchain root directory; defaults to <builddir>/toolchain
        #[arg(long)]
        toolchain_root: Option<PathBuf>,

        /// Pinned toolchain version; artifact sources collapse to the
        /// version marker when set
        #[arg(long)]
        engine_version: Option<String>,

        /// Copy-pool size; defaults to the CPU count
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Target to build
        target: String,
    },

    /// Validate a manifest and print the execution order
    Graph {
        /// Path to the build manifest
        #[arg(short, long, default_value = "kiln.json")]
        manifest: PathBuf,

        /// Target whose closure to print; all targets when omitted
        target: Option<String>,
    },
}
