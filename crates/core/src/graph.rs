use std::collections::{HashMap, HashSet};

use crate::binder::{BindingRecord, BindingTarget};
use crate::errors::ContainerError;
use crate::factory::is_assisted;
use crate::injector::is_container_internal;
use crate::key::Key;
use crate::metadata::TypeRegistry;

/// Resolution path for error reporting
#[derive(Debug, Clone, Default)]
pub struct ResolutionPath {
    keys: Vec<Key>,
}

impl ResolutionPath {
    pub fn new() -> Self {
        Self { keys: Vec::new() }
    }

    pub fn push(&mut self, key: Key) {
        self.keys.push(key);
    }

    pub fn pop(&mut self) -> Option<Key> {
        self.keys.pop()
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.keys.contains(key)
    }

    pub fn path_string(&self) -> String {
        self.keys
            .iter()
            .map(|key| key.to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// Dependency graph over binding keys, built from committed records plus the
/// type metadata of everything reachable from them.
///
/// Deferred-provider keys are leaves here: their value is produced on demand
/// after construction, so a cycle broken by deferred indirection is legal.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    nodes: HashMap<Key, Vec<Key>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Build the graph from binding records, following linked and provider
    /// keys into types reachable only through just-in-time construction.
    pub fn from_bindings(records: &[BindingRecord], types: &TypeRegistry) -> Self {
        let mut graph = Self::new();
        let mut queue: Vec<Key> = Vec::new();

        for record in records {
            let deps = match &record.target {
                BindingTarget::ToSelf => Self::type_dependencies(&record.key, types),
                BindingTarget::Linked { key: target, .. } => {
                    queue.push(target.clone());
                    vec![target.clone()]
                }
                BindingTarget::Instance(_) | BindingTarget::Provider(_) => Vec::new(),
                BindingTarget::ProviderVia { provider_key, .. } => {
                    queue.push(provider_key.clone());
                    vec![provider_key.clone()]
                }
            };
            queue.extend(deps.iter().cloned());
            graph.add_node(record.key.clone(), deps);
        }

        // Types reachable only via links or JIT construction still contribute
        // edges, otherwise a cycle through an unbound concrete type would go
        // unnoticed until resolution.
        let mut seen: HashSet<Key> = graph.nodes.keys().cloned().collect();
        while let Some(key) = queue.pop() {
            if seen.contains(&key) {
                continue;
            }
            seen.insert(key.clone());
            let deps = Self::type_dependencies(&key, types);
            queue.extend(deps.iter().cloned());
            graph.add_node(key, deps);
        }

        graph
    }

    fn type_dependencies(key: &Key, types: &TypeRegistry) -> Vec<Key> {
        let meta = match types.get(key.type_id()) {
            Some(meta) => meta,
            None => return Vec::new(),
        };
        meta.ctor_points
            .iter()
            .chain(meta.member_points.iter())
            .filter(|point| !point.optional)
            .map(|point| point.key.clone())
            .filter(|dep| !is_container_internal(&dep.ty) && !is_assisted(dep))
            .collect()
    }

    pub fn add_node(&mut self, key: Key, dependencies: Vec<Key>) {
        self.nodes.entry(key).or_insert(dependencies);
    }

    pub fn dependencies(&self, key: &Key) -> Option<&[Key]> {
        self.nodes.get(key).map(|deps| deps.as_slice())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Reject instantiation cycles
    pub fn detect_cycles(&self) -> Result<(), ContainerError> {
        let mut visited = HashSet::new();
        let mut in_progress = HashSet::new();

        for key in self.nodes.keys() {
            if !visited.contains(key) {
                let mut path = ResolutionPath::new();
                self.detect_cycle_dfs(key, &mut visited, &mut in_progress, &mut path)?;
            }
        }

        Ok(())
    }

    fn detect_cycle_dfs(
        &self,
        key: &Key,
        visited: &mut HashSet<Key>,
        in_progress: &mut HashSet<Key>,
        path: &mut ResolutionPath,
    ) -> Result<(), ContainerError> {
        if in_progress.contains(key) {
            path.push(key.clone());
            return Err(ContainerError::CircularDependency {
                path: path.path_string(),
                cycle_key: key.to_string(),
            });
        }

        if visited.contains(key) {
            return Ok(());
        }

        in_progress.insert(key.clone());
        path.push(key.clone());

        if let Some(deps) = self.nodes.get(key) {
            for dep in deps {
                self.detect_cycle_dfs(dep, visited, in_progress, path)?;
            }
        }

        path.pop();
        in_progress.remove(key);
        visited.insert(key.clone());

        Ok(())
    }
}
