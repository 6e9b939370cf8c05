//! Dependency tracking between modules.
//!
//! ```text
//! DependencyGraph
//! ├── forward: importer → {imported, ...}
//! └── reverse: imported → {importer, ...}
//!
//! On change of `imported`:
//! 1. Lookup reverse[imported] → dependents
//! 2. Reload each dependent (recursively)
//! ```
//!
//! Edges are only ever added. A module that stops importing another keeps
//! its old edge, which can cause an extra reload but never a missed one.

use rustc_hash::{FxHashMap, FxHashSet};

type IdSet = FxHashSet<String>;
type IdSetMap = FxHashMap<String, IdSet>;

/// Bidirectional dependency graph keyed by module identifier.
///
/// # Invariants
/// - Forward and reverse mappings are always consistent
/// - Self-references are excluded
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Forward: module → modules it depends on
    forward: IdSetMap,
    /// Reverse: module → modules that depend on it
    reverse: IdSetMap,
}

impl DependencyGraph {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `from` depends on `to`. Idempotent.
    pub fn add_dependency(&mut self, from: &str, to: &str) {
        if from == to {
            return;
        }
        self.forward
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
        self.reverse
            .entry(to.to_string())
            .or_default()
            .insert(from.to_string());
    }

    /// Modules that declared a dependency on `to`.
    #[inline]
    pub fn dependents(&self, to: &str) -> Option<&IdSet> {
        self.reverse.get(to)
    }

    /// Modules that `from` declared a dependency on.
    #[inline]
    pub fn dependencies(&self, from: &str) -> Option<&IdSet> {
        self.forward.get(from)
    }

    /// Dependents of `to` in a stable order.
    pub fn sorted_dependents(&self, to: &str) -> Vec<String> {
        let mut dependents: Vec<String> = self
            .dependents(to)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        dependents.sort();
        dependents
    }

    /// Clear all mappings.
    #[inline]
    pub fn clear(&mut self) {
        self.forward.clear();
        self.reverse.clear();
    }

    /// Number of modules with at least one dependent.
    #[inline]
    pub fn reverse_count(&self) -> usize {
        self.reverse.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_graph_is_empty() {
        let graph = DependencyGraph::new();
        assert!(graph.dependents("any.otl").is_none());
    }

    #[test]
    fn basic_recording() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("typing.otl", "schema/base.otl");

        let users = graph.dependents("schema/base.otl").unwrap();
        assert!(users.contains("typing.otl"));
        assert!(graph.dependencies("typing.otl").unwrap().contains("schema/base.otl"));
    }

    #[test]
    fn duplicate_insertion_is_idempotent() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("a.ts", "b.ts");
        graph.add_dependency("a.ts", "b.ts");

        assert_eq!(graph.dependents("b.ts").unwrap().len(), 1);
        assert_eq!(graph.dependencies("a.ts").unwrap().len(), 1);
    }

    #[test]
    fn self_reference_excluded() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("a.ts", "a.ts");
        assert!(graph.dependents("a.ts").is_none());
        assert_eq!(graph.reverse_count(), 0);
    }

    #[test]
    fn stale_edges_are_kept() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("a.ts", "old.ts");
        graph.add_dependency("a.ts", "new.ts");

        // Re-declaring imports never prunes the previous edge.
        assert!(graph.dependents("old.ts").unwrap().contains("a.ts"));
        assert!(graph.dependents("new.ts").unwrap().contains("a.ts"));
    }

    #[test]
    fn multiple_dependents_share_dependency() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("b.ts", "shared.ts");
        graph.add_dependency("a.ts", "shared.ts");

        assert_eq!(
            graph.sorted_dependents("shared.ts"),
            vec!["a.ts".to_string(), "b.ts".to_string()]
        );
    }

    #[test]
    fn clear_removes_all() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("a.ts", "b.ts");
        graph.clear();
        assert!(graph.dependents("b.ts").is_none());
        assert!(graph.dependencies("a.ts").is_none());
    }

    #[test]
    fn nonexistent_returns_empty_sorted() {
        let graph = DependencyGraph::new();
        assert!(graph.sorted_dependents("missing.ts").is_empty());
    }
}
