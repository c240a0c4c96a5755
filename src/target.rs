//! Build targets and the dependency graph

use crate::environment::Environment;
use crate::error::{BuildError, Result};
use crate::source::Source;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by [`BuildAction::build`].
pub type BoxedBuildFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// The side-effecting work of one target.
///
/// An action is expected to be idempotent given identical resolved inputs
/// and must write every file its target declared in `outputs` (and every
/// declared depfile); the executor verifies this after each run.
pub trait BuildAction: Send + Sync {
    /// Run the action against the given environment.
    fn build(&self, environment: Arc<Environment>) -> BoxedBuildFuture;
}

/// A named unit of build work.
///
/// Identity is the `name`; names must be unique within one graph.
#[derive(Clone)]
pub struct Target {
    /// Unique name within the build graph
    pub name: String,
    /// Names of targets that must complete before this one starts
    pub dependencies: Vec<String>,
    /// Declared input specifications
    pub inputs: Vec<Source>,
    /// Declared output specifications
    pub outputs: Vec<Source>,
    /// Names of depfiles this target may emit, looked up under the build
    /// directory
    pub depfiles: Vec<String>,
    /// The work itself
    pub action: Arc<dyn BuildAction>,
}

impl Target {
    /// Create a new target.
    pub fn new(
        name: impl Into<String>,
        dependencies: Vec<String>,
        inputs: Vec<Source>,
        outputs: Vec<Source>,
        depfiles: Vec<String>,
        action: Arc<dyn BuildAction>,
    ) -> Self {
        Self {
            name: name.into(),
            dependencies,
            inputs,
            outputs,
            depfiles,
            action,
        }
    }
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("depfiles", &self.depfiles)
            .finish_non_exhaustive()
    }
}

/// A name-keyed registry of targets forming a dependency DAG.
///
/// All configuration errors (duplicate names, unknown dependencies,
/// cycles) are detected by [`TargetGraph::validate`] before any action
/// runs.
#[derive(Default)]
pub struct TargetGraph {
    targets: HashMap<String, Target>,
    // Insertion order, for deterministic validation and iteration
    order: Vec<String>,
}

impl TargetGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a target. Fails if the name is already taken.
    pub fn add_target(&mut self, target: Target) -> Result<()> {
        if self.targets.contains_key(&target.name) {
            return Err(BuildError::DuplicateTarget(target.name));
        }
        self.order.push(target.name.clone());
        let _ = self.targets.insert(target.name.clone(), target);
        Ok(())
    }

    /// Look up a target by name.
    pub fn get(&self, name: &str) -> Option<&Target> {
        self.targets.get(name)
    }

    /// Number of targets in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether the graph has no targets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Target names in insertion order.
    pub fn target_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Check every edge refers to a known target and the graph is acyclic.
    ///
    /// A cycle is reported with its full path, e.g. `a -> b -> c -> a`.
    pub fn validate(&self) -> Result<()> {
        for name in &self.order {
            if let Some(target) = self.targets.get(name) {
                for dependency in &target.dependencies {
                    if !self.targets.contains_key(dependency) {
                        return Err(BuildError::UnknownDependency {
                            target: name.clone(),
                            dependency: dependency.clone(),
                        });
                    }
                }
            }
        }

        let mut visited = HashSet::new();
        let mut stack = HashSet::new();
        let mut path = Vec::new();
        for name in &self.order {
            if !visited.contains(name.as_str()) {
                self.cycle_dfs(name, &mut visited, &mut stack, &mut path)?;
            }
        }
        Ok(())
    }

    fn cycle_dfs<'a>(
        &'a self,
        name: &'a str,
        visited: &mut HashSet<&'a str>,
        stack: &mut HashSet<&'a str>,
        path: &mut Vec<&'a str>,
    ) -> Result<()> {
        let _ = visited.insert(name);
        let _ = stack.insert(name);
        path.push(name);

        if let Some(target) = self.targets.get(name) {
            for dependency in &target.dependencies {
                if stack.contains(dependency.as_str()) {
                    let start = path
                        .iter()
                        .position(|n| *n == dependency.as_str())
                        .unwrap_or(0);
                    let mut cycle: Vec<&str> = path[start..].to_vec();
                    cycle.push(dependency);
                    return Err(BuildError::CycleDetected(cycle.join(" -> ")));
                }
                if !visited.contains(dependency.as_str()) {
                    self.cycle_dfs(dependency, visited, stack, path)?;
                }
            }
        }

        let _ = path.pop();
        let _ = stack.remove(name);
        Ok(())
    }

    /// Compute the dependency-first execution order for `root`'s transitive
    /// closure. Call [`TargetGraph::validate`] first; this assumes an
    /// acyclic graph.
    pub fn build_order(&self, root: &str) -> Result<Vec<String>> {
        if !self.targets.contains_key(root) {
            return Err(BuildError::TargetNotFound(root.to_string()));
        }
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        self.order_dfs(root, &mut visited, &mut order)?;
        Ok(order)
    }

    fn order_dfs(
        &self,
        name: &str,
        visited: &mut HashSet<String>,
        order: &mut Vec<String>,
    ) -> Result<()> {
        if !visited.insert(name.to_string()) {
            return Ok(());
        }
        let target = self
            .targets
            .get(name)
            .ok_or_else(|| BuildError::TargetNotFound(name.to_string()))?;
        for dependency in &target.dependencies {
            self.order_dfs(dependency, visited, order)?;
        }
        order.push(name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopAction;

    impl BuildAction for NoopAction {
        fn build(&self, _environment: Arc<Environment>) -> BoxedBuildFuture {
            Box::pin(async { Ok(()) })
        }
    }

    fn target(name: &str, dependencies: &[&str]) -> Target {
        Target::new(
            name,
            dependencies.iter().map(|d| d.to_string()).collect(),
            vec![],
            vec![],
            vec![],
            Arc::new(NoopAction),
        )
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut graph = TargetGraph::new();
        graph.add_target(target("compile", &[])).unwrap();
        let result = graph.add_target(target("compile", &[]));
        assert!(matches!(result, Err(BuildError::DuplicateTarget(_))));
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let mut graph = TargetGraph::new();
        graph.add_target(target("bundle", &["compile"])).unwrap();
        let result = graph.validate();
        assert!(matches!(
            result,
            Err(BuildError::UnknownDependency { .. })
        ));
    }

    #[test]
    fn test_cycle_detected_for_all_rotations() {
        // a -> b -> c -> a, inserted starting from each rotation
        let rotations: [[&str; 3]; 3] = [["a", "b", "c"], ["b", "c", "a"], ["c", "a", "b"]];

        for rotation in rotations {
            let mut graph = TargetGraph::new();
            for name in rotation {
                let dependency = match name {
                    "a" => "b",
                    "b" => "c",
                    _ => "a",
                };
                graph.add_target(target(name, &[dependency])).unwrap();
            }

            match graph.validate() {
                Err(BuildError::CycleDetected(cycle)) => {
                    for name in ["a", "b", "c"] {
                        assert!(cycle.contains(name), "cycle '{}' missing '{}'", cycle, name);
                    }
                }
                other => panic!("expected cycle error, got {:?}", other.err()),
            }
        }
    }

    #[test]
    fn test_acyclic_graph_validates() {
        let mut graph = TargetGraph::new();
        graph.add_target(target("gen", &[])).unwrap();
        graph.add_target(target("compile", &["gen"])).unwrap();
        graph
            .add_target(target("bundle", &["compile", "gen"]))
            .unwrap();
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_build_order_is_dependency_first() {
        let mut graph = TargetGraph::new();
        graph.add_target(target("root", &[])).unwrap();
        graph.add_target(target("left", &["root"])).unwrap();
        graph.add_target(target("right", &["root"])).unwrap();
        graph
            .add_target(target("join", &["left", "right"]))
            .unwrap();
        // Unrelated target, not in the closure of "join"
        graph.add_target(target("stray", &[])).unwrap();

        let order = graph.build_order("join").unwrap();
        assert_eq!(order, vec!["root", "left", "right", "join"]);
    }

    #[test]
    fn test_build_order_unknown_root() {
        let graph = TargetGraph::new();
        let result = graph.build_order("nothing");
        assert!(matches!(result, Err(BuildError::TargetNotFound(_))));
    }
}
