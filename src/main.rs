//! Kiln - incremental build orchestration engine
//!
//! Orchestrates:
//! 1. Manifest loading and target-graph validation
//! 2. Source resolution (patterns, artifacts, depfiles)
//! 3. Fingerprint-based unchanged-target skipping
//! 4. Bounded-concurrency asset copying

use clap::Parser;
use kiln::commands::{self, Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kiln=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build {
            manifest,
            project,
            builddir,
            output,
            cache,
            toolchain_root,
            engine_version,
            jobs,
            target,
        } => {
            commands::build::execute(commands::build::BuildArgs {
                manifest,
                project,
                builddir,
                output,
                cache,
                toolchain_root,
                engine_version,
                jobs,
                target,
            })
            .await
        }
        Commands::Graph { manifest, target } => {
            commands::graph::execute(&manifest, target.as_deref()).await
        }
    };

    if let Err(e) = result {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}
