//! `kiln graph` - validate a manifest and print the execution order

use crate::error::Result;
use crate::manifest::BuildManifest;
use std::path::Path;

/// Print the dependency-ordered target list.
pub async fn execute(manifest_path: &Path, target: Option<&str>) -> Result<()> {
    let manifest = BuildManifest::load(manifest_path).await?;
    let graph = manifest.to_graph(1)?;

    match target {
        Some(target) => {
            let order = graph.build_order(target)?;
            println!("Execution order for '{}':", target);
            for (index, name) in order.iter().enumerate() {
                println!("  {}. {}", index + 1, name);
            }
        }
        None => {
            println!("Targets ({}):", graph.len());
            for name in graph.target_names() {
                let dependencies = graph
                    .get(name)
                    .map(|t| t.dependencies.join(", "))
                    .unwrap_or_default();
                if dependencies.is_empty() {
                    println!("  {}", name);
                } else {
                    println!("  {} (depends on: {})", name, dependencies);
                }
            }
        }
    }

    Ok(())
}
