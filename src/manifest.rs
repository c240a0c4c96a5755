//! Declarative build manifests
//!
//! The CLI front door: a JSON file describing a target graph whose actions
//! copy assets into the output directory. Pattern sources are written
//! either as a bare template string or as `{"pattern": ..., "optional":
//! true}`. Artifact sources are a programmatic API and cannot appear in a
//! manifest.

use crate::copy::{AssetCopyAction, AssetEntry};
use crate::error::Result;
use crate::source::Source;
use crate::target::{Target, TargetGraph};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// A whole build graph description.
#[derive(Debug, Deserialize)]
pub struct BuildManifest {
    /// Declared targets, in declaration order
    pub targets: Vec<TargetSpec>,
}

/// One target declaration.
#[derive(Debug, Deserialize)]
pub struct TargetSpec {
    /// Unique target name
    pub name: String,
    /// Names of upstream targets
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Input pattern sources
    #[serde(default)]
    pub inputs: Vec<SourceSpec>,
    /// Output pattern sources
    #[serde(default)]
    pub outputs: Vec<SourceSpec>,
    /// Depfile names looked up under the build directory
    #[serde(default)]
    pub depfiles: Vec<String>,
    /// Asset copy entries executed as this target's action
    #[serde(default)]
    pub assets: Vec<AssetSpec>,
}

/// A pattern source, bare or with an optional flag.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SourceSpec {
    /// `"PROJECT_DIR/assets/*.png"`
    Template(String),
    /// `{"pattern": "PROJECT_DIR/pins.json", "optional": true}`
    Detailed {
        /// The pattern template
        pattern: String,
        /// Missing-is-silent flag
        #[serde(default)]
        optional: bool,
    },
}

impl SourceSpec {
    fn to_source(&self) -> Source {
        match self {
            SourceSpec::Template(template) => Source::pattern(template.clone()),
            SourceSpec::Detailed { pattern, optional } => Source::Pattern {
                template: pattern.clone(),
                optional: *optional,
            },
        }
    }
}

/// One asset copy entry.
#[derive(Debug, Deserialize)]
pub struct AssetSpec {
    /// Source path, project-relative unless absolute
    pub source: PathBuf,
    /// Destination path relative to the output directory
    pub destination: PathBuf,
}

impl BuildManifest {
    /// Load a manifest from a JSON file.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let manifest: BuildManifest = serde_json::from_str(&content)?;
        info!(
            "loaded manifest {} with {} targets",
            path.display(),
            manifest.targets.len()
        );
        Ok(manifest)
    }

    /// Compile the manifest into a validated target graph whose actions
    /// copy assets through a pool of `pool_size` workers.
    pub fn to_graph(&self, pool_size: usize) -> Result<TargetGraph> {
        let mut graph = TargetGraph::new();
        for spec in &self.targets {
            let entries: Vec<AssetEntry> = spec
                .assets
                .iter()
                .map(|asset| AssetEntry {
                    source: asset.source.clone(),
                    destination: asset.destination.clone(),
                })
                .collect();

            graph.add_target(Target::new(
                spec.name.clone(),
                spec.dependencies.clone(),
                spec.inputs.iter().map(SourceSpec::to_source).collect(),
                spec.outputs.iter().map(SourceSpec::to_source).collect(),
                spec.depfiles.clone(),
                Arc::new(AssetCopyAction::new(entries, pool_size)),
            ))?;
        }
        graph.validate()?;
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;

    const MANIFEST: &str = r#"{
        "targets": [
            {
                "name": "assets",
                "inputs": [
                    "PROJECT_DIR/assets/*.png",
                    {"pattern": "PROJECT_DIR/pins.json", "optional": true}
                ],
                "outputs": ["OUTPUT_DIR/assets/*.png"],
                "assets": [
                    {"source": "assets/logo.png", "destination": "assets/logo.png"}
                ]
            },
            {
                "name": "bundle",
                "dependencies": ["assets"],
                "depfiles": ["bundle.d"]
            }
        ]
    }"#;

    #[test]
    fn test_parse_and_compile() {
        let manifest: BuildManifest = serde_json::from_str(MANIFEST).unwrap();
        assert_eq!(manifest.targets.len(), 2);

        let graph = manifest.to_graph(4).unwrap();
        assert_eq!(graph.len(), 2);

        let assets = graph.get("assets").unwrap();
        assert_eq!(assets.inputs.len(), 2);
        assert!(matches!(
            assets.inputs[1],
            Source::Pattern { optional: true, .. }
        ));

        let order = graph.build_order("bundle").unwrap();
        assert_eq!(order, vec!["assets", "bundle"]);
    }

    #[test]
    fn test_cyclic_manifest_rejected() {
        let manifest: BuildManifest = serde_json::from_str(
            r#"{"targets": [
                {"name": "a", "dependencies": ["b"]},
                {"name": "b", "dependencies": ["a"]}
            ]}"#,
        )
        .unwrap();

        let result = manifest.to_graph(1);
        assert!(matches!(result, Err(BuildError::CycleDetected(_))));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let manifest: BuildManifest = serde_json::from_str(
            r#"{"targets": [{"name": "a"}, {"name": "a"}]}"#,
        )
        .unwrap();

        let result = manifest.to_graph(1);
        assert!(matches!(result, Err(BuildError::DuplicateTarget(_))));
    }
}
