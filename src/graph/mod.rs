//! Dependency graph of workspace resources.
//!
//! A [`ResourceGraph`] holds one [`ResourceNode`] per resource, keyed by its
//! [`ResourceIdentifier`]. Edges are derived from the dependency lists of the
//! inserted [`ResourceMetadata`]: when `A` declares a dependency on `B`, `A`
//! gains `B` as a dependency and `B` gains `A` as a dependent. The two edge
//! sets are always kept in sync.
//!
//! ## Pending edges
//!
//! Resources may be inserted in any order. A dependency on an identifier that
//! is not in the graph yet is parked in a pending list and the edge is
//! completed as soon as a node with that identifier is inserted.
//!
//! ## Traversal order
//!
//! Both traversals run Kahn's algorithm with a FIFO ready queue, seeded in node
//! insertion order. Newly ready nodes are appended in the order their edges
//! were established, so for a given sequence of insertions the order is always
//! the same. When the queue runs dry while nodes are still blocked, the graph
//! has a cycle: the earliest inserted blocked node is then released as if it
//! were ready and the walk carries on. Every node is emitted exactly once.
//!
//! The graph does no locking of its own. Callers mutating it from several
//! threads have to serialize access themselves.

mod ident;
mod node;
mod state;

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use petgraph::Graph;
use petgraph::graph::NodeIndex;

pub use crate::graph::ident::{Metadata, ResourceIdentifier, ResourceMetadata};
pub use crate::graph::node::ResourceNode;
pub use crate::graph::state::{ResourceState, ResourceStates};

/// Which relation a traversal follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Dependencies before dependents. Used for initialization.
    BottomToTop,
    /// Dependents before dependencies. Used for teardown.
    TopToBottom,
}

pub struct ResourceGraph<M = Metadata> {
    nodes: IndexMap<ResourceIdentifier, ResourceNode<M>>,
    /// Missing dependency -> resources waiting for it, in the order the
    /// dependencies were first declared.
    pending: IndexMap<ResourceIdentifier, IndexSet<ResourceIdentifier>>,
}

impl<M: ResourceMetadata> ResourceGraph<M> {
    /// Creates a new, empty graph.
    pub fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
            pending: IndexMap::new(),
        }
    }

    /// Builds a graph out of a batch of metadata, inserted in iteration order.
    pub fn from_metadata<I>(metadata: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Arc<M>>,
    {
        let mut graph = Self::new();
        for md in metadata {
            graph.insert_node(md);
        }
        graph
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &ResourceIdentifier) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &ResourceIdentifier) -> Option<&ResourceNode<M>> {
        self.nodes.get(id)
    }

    /// All identifiers in insertion order.
    pub fn identifiers(&self) -> impl ExactSizeIterator<Item = &ResourceIdentifier> {
        self.nodes.keys()
    }

    /// Identifiers that are depended upon but have not been inserted, in the
    /// order they were first declared.
    pub fn unresolved(&self) -> impl Iterator<Item = &ResourceIdentifier> {
        self.pending.keys()
    }

    /// Registers the resource described by `metadata`.
    ///
    /// If a resource with the same identifier is already present it is
    /// replaced: it keeps its place in the insertion order and its dependents,
    /// while its own dependency edges are rebuilt from the new metadata. Edges
    /// that survive the replacement keep their position among the dependents
    /// of the dependency, so ties are still broken as before.
    pub fn insert_node(&mut self, metadata: impl Into<Arc<M>>) {
        let metadata = metadata.into();
        let id = metadata.identifier().clone();

        let replaced = match self.nodes.get_mut(&id) {
            Some(node) => {
                node.metadata = metadata.clone();
                Some(std::mem::take(&mut node.dependencies))
            }
            None => None,
        };

        // Dependency -> position of `id` among its dependents.
        let mut slots = HashMap::new();

        match replaced {
            Some(old) => {
                tracing::debug!(%id, "replacing resource node");
                for dependency in &old {
                    if let Some(node) = self.nodes.get_mut(dependency)
                        && let Some(slot) = node.dependents.get_index_of(&id)
                    {
                        node.dependents.shift_remove_index(slot);
                        slots.insert(dependency.clone(), slot);
                    }
                }
                self.forget_pending(&id);
            }
            None => {
                tracing::debug!(%id, "inserting resource node");
                self.nodes.insert(id.clone(), ResourceNode::new(metadata.clone()));

                if let Some(waiting) = self.pending.shift_remove(&id) {
                    for dependent in &waiting {
                        self.link(dependent, &id);
                    }
                }
            }
        }

        for dependency in metadata.dependencies() {
            if let Some(slot) = slots.remove(dependency) {
                self.relink(&id, dependency, slot);
            } else if self.nodes.contains_key(dependency) {
                self.link(&id, dependency);
            } else {
                tracing::trace!(%id, %dependency, "dependency not present yet");
                self.pending
                    .entry(dependency.clone())
                    .or_default()
                    .insert(id.clone());
            }
        }
    }

    /// Removes the resource and every edge touching it. Does nothing if the
    /// identifier is not present.
    ///
    /// Resources that depended on the removed one still declare that
    /// dependency, so their edges go back to the pending list and reconnect
    /// if the resource is inserted again.
    pub fn remove_node(&mut self, id: &ResourceIdentifier) {
        let Some(node) = self.nodes.shift_remove(id) else {
            return;
        };

        tracing::debug!(%id, "removing resource node");
        self.forget_pending(id);

        for dependency in &node.dependencies {
            if let Some(other) = self.nodes.get_mut(dependency) {
                other.dependents.shift_remove(id);
            }
        }

        for dependent in &node.dependents {
            if let Some(other) = self.nodes.get_mut(dependent) {
                other.dependencies.shift_remove(id);
                self.pending
                    .entry(id.clone())
                    .or_default()
                    .insert(dependent.clone());
            }
        }
    }

    /// Direct dependencies of `id`, in the order the edges were established.
    pub fn get_dependencies(
        &self,
        id: &ResourceIdentifier,
    ) -> impl Iterator<Item = &ResourceIdentifier> {
        self.nodes
            .get(id)
            .into_iter()
            .flat_map(|node| node.dependencies.iter())
    }

    /// Direct dependents of `id`, in the order the edges were established.
    pub fn get_dependents(
        &self,
        id: &ResourceIdentifier,
    ) -> impl Iterator<Item = &ResourceIdentifier> {
        self.nodes
            .get(id)
            .into_iter()
            .flat_map(|node| node.dependents.iter())
    }

    /// Every resource `id` depends on, directly or not, breadth first.
    pub fn transitive_dependencies(&self, id: &ResourceIdentifier) -> Vec<&ResourceIdentifier> {
        self.reachable(id, |node| &node.dependencies)
    }

    /// Every resource depending on `id`, directly or not, breadth first.
    pub fn transitive_dependents(&self, id: &ResourceIdentifier) -> Vec<&ResourceIdentifier> {
        self.reachable(id, |node| &node.dependents)
    }

    /// Leaves first: a resource is yielded only after all of its
    /// dependencies. Each call starts a fresh walk.
    pub fn traverse_bottom_to_top(&self) -> Traversal<'_, M> {
        Traversal::new(self, Direction::BottomToTop, None)
    }

    /// Roots first: a resource is yielded only after everything that depends
    /// on it. Each call starts a fresh walk.
    pub fn traverse_top_to_bottom(&self) -> Traversal<'_, M> {
        Traversal::new(self, Direction::TopToBottom, None)
    }

    /// Metadata of every resource in bottom-to-top order, i.e. the order in
    /// which resources can be built.
    pub fn sorted(&self) -> Vec<Arc<M>> {
        self.traverse_bottom_to_top()
            .map(|id| self.nodes[id].metadata.clone())
            .collect()
    }

    /// `id` and everything it needs, in the order they must be initialized.
    /// Empty if `id` is not present.
    pub fn init_order(&self, id: &ResourceIdentifier) -> Traversal<'_, M> {
        let members = self.closure(id, self.transitive_dependencies(id));
        Traversal::new(self, Direction::BottomToTop, Some(members))
    }

    /// `id` and everything that needs it, in the order they must be shut
    /// down. Empty if `id` is not present.
    pub fn shutdown_order(&self, id: &ResourceIdentifier) -> Traversal<'_, M> {
        let members = self.closure(id, self.transitive_dependents(id));
        Traversal::new(self, Direction::TopToBottom, Some(members))
    }

    /// The neighbourhood of `id`: the resource itself plus everything reachable
    /// from it by following edges in either direction.
    ///
    /// Returns an empty graph if `id` is not present.
    pub fn get_subgraph(&self, id: &ResourceIdentifier) -> ResourceGraph<M> {
        let mut members = HashSet::new();
        let mut queue = VecDeque::new();

        if let Some((key, _)) = self.nodes.get_key_value(id) {
            members.insert(key);
            queue.push_back(key);
        }

        while let Some(current) = queue.pop_front() {
            let node = &self.nodes[current];
            for next in node.dependencies.iter().chain(node.dependents.iter()) {
                if members.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        let mut subgraph = ResourceGraph::new();
        for (key, node) in &self.nodes {
            if members.contains(key) {
                subgraph.insert_node(node.metadata.clone());
            }
        }
        subgraph
    }

    /// Groups of resources that depend on each other in a loop, including
    /// resources that depend on themselves. Members of each group, and the
    /// groups themselves, are listed in insertion order.
    pub fn cycles(&self) -> Vec<Vec<ResourceIdentifier>> {
        let mut graph = Graph::<usize, ()>::with_capacity(self.nodes.len(), 0);
        let indices: Vec<NodeIndex> = (0..self.nodes.len()).map(|i| graph.add_node(i)).collect();

        for (i, node) in self.nodes.values().enumerate() {
            for dependency in &node.dependencies {
                if let Some(j) = self.nodes.get_index_of(dependency) {
                    graph.add_edge(indices[i], indices[j], ());
                }
            }
        }

        let mut cycles: Vec<Vec<usize>> = petgraph::algo::tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut members: Vec<usize> = scc.into_iter().map(|ix| graph[ix]).collect();
                members.sort_unstable();
                members
            })
            .collect();
        cycles.sort_unstable();

        cycles
            .into_iter()
            .map(|members| {
                members
                    .into_iter()
                    .filter_map(|i| self.nodes.get_index(i).map(|(id, _)| id.clone()))
                    .collect()
            })
            .collect()
    }

    fn link(&mut self, from: &ResourceIdentifier, to: &ResourceIdentifier) {
        if let Some(node) = self.nodes.get_mut(from) {
            node.dependencies.insert(to.clone());
        }
        if let Some(node) = self.nodes.get_mut(to) {
            node.dependents.insert(from.clone());
        }
    }

    /// Like [`link`](Self::link), but puts `from` back at `slot` among the
    /// dependents of `to`.
    fn relink(&mut self, from: &ResourceIdentifier, to: &ResourceIdentifier, slot: usize) {
        if let Some(node) = self.nodes.get_mut(from) {
            node.dependencies.insert(to.clone());
        }
        if let Some(node) = self.nodes.get_mut(to) {
            let slot = slot.min(node.dependents.len());
            node.dependents.shift_insert(slot, from.clone());
        }
    }

    /// Drops `id` from every pending list it is waiting in.
    fn forget_pending(&mut self, id: &ResourceIdentifier) {
        self.pending.retain(|_, waiting| {
            waiting.shift_remove(id);
            !waiting.is_empty()
        });
    }

    fn reachable<'a>(
        &'a self,
        id: &ResourceIdentifier,
        edges: impl Fn(&'a ResourceNode<M>) -> &'a IndexSet<ResourceIdentifier>,
    ) -> Vec<&'a ResourceIdentifier> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::new();

        if let Some((key, _)) = self.nodes.get_key_value(id) {
            seen.insert(key);
            queue.push_back(key);
        }

        while let Some(current) = queue.pop_front() {
            for next in edges(&self.nodes[current]) {
                if seen.insert(next) {
                    order.push(next);
                    queue.push_back(next);
                }
            }
        }

        order
    }

    fn closure<'a>(
        &'a self,
        id: &ResourceIdentifier,
        reached: Vec<&'a ResourceIdentifier>,
    ) -> HashSet<&'a ResourceIdentifier> {
        let mut members: HashSet<_> = reached.into_iter().collect();
        if let Some((key, _)) = self.nodes.get_key_value(id) {
            members.insert(key);
        }
        members
    }
}

impl<M: ResourceMetadata> Default for ResourceGraph<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: ResourceMetadata> FromIterator<M> for ResourceGraph<M> {
    fn from_iter<T: IntoIterator<Item = M>>(iter: T) -> Self {
        Self::from_metadata(iter)
    }
}

impl<M: fmt::Debug> fmt::Debug for ResourceGraph<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceGraph")
            .field("nodes", &self.nodes)
            .field("pending", &self.pending)
            .finish()
    }
}

/// Renders the graph as a Mermaid flowchart, with arrows pointing from a
/// dependency to the resources that need it.
impl<M: ResourceMetadata> fmt::Display for ResourceGraph<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "graph LR")?;

        for (index, id) in self.nodes.keys().enumerate() {
            let label = id.to_string().replace('"', "\\\"");
            writeln!(f, "    {index}[\"{label}\"]")?;
        }

        for (index, node) in self.nodes.values().enumerate() {
            for dependency in &node.dependencies {
                if let Some(source) = self.nodes.get_index_of(dependency) {
                    writeln!(f, "    {source} --> {index}")?;
                }
            }
        }

        Ok(())
    }
}

/// Lazy walk over a [`ResourceGraph`] in dependency order.
///
/// Created by [`ResourceGraph::traverse_bottom_to_top`],
/// [`ResourceGraph::traverse_top_to_bottom`], [`ResourceGraph::init_order`]
/// and [`ResourceGraph::shutdown_order`].
pub struct Traversal<'a, M> {
    graph: &'a ResourceGraph<M>,
    direction: Direction,
    /// Nodes not yet queued, with the number of unemitted nodes blocking them.
    blocked: HashMap<&'a ResourceIdentifier, usize>,
    ready: VecDeque<&'a ResourceIdentifier>,
    /// Every node before this insertion index has left `blocked`.
    cursor: usize,
}

impl<'a, M: ResourceMetadata> Traversal<'a, M> {
    fn new(
        graph: &'a ResourceGraph<M>,
        direction: Direction,
        members: Option<HashSet<&'a ResourceIdentifier>>,
    ) -> Self {
        let is_member = |id: &ResourceIdentifier| members.as_ref().is_none_or(|m| m.contains(id));

        let mut blocked = HashMap::new();
        let mut ready = VecDeque::new();

        for (id, node) in &graph.nodes {
            if !is_member(id) {
                continue;
            }

            let count = Self::blockers(direction, node)
                .iter()
                .filter(|other| is_member(other))
                .count();

            if count == 0 {
                ready.push_back(id);
            } else {
                blocked.insert(id, count);
            }
        }

        Self {
            graph,
            direction,
            blocked,
            ready,
            cursor: 0,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    fn blockers(direction: Direction, node: &ResourceNode<M>) -> &IndexSet<ResourceIdentifier> {
        match direction {
            Direction::BottomToTop => &node.dependencies,
            Direction::TopToBottom => &node.dependents,
        }
    }

    fn unblocks(direction: Direction, node: &ResourceNode<M>) -> &IndexSet<ResourceIdentifier> {
        match direction {
            Direction::BottomToTop => &node.dependents,
            Direction::TopToBottom => &node.dependencies,
        }
    }

    /// Releases the earliest inserted node that is still blocked.
    fn break_cycle(&mut self) -> Option<&'a ResourceIdentifier> {
        if self.blocked.is_empty() {
            return None;
        }

        let graph = self.graph;
        while let Some((id, _)) = graph.nodes.get_index(self.cursor) {
            self.cursor += 1;
            if self.blocked.remove(id).is_some() {
                tracing::warn!(%id, "dependency cycle detected, releasing resource early");
                return Some(id);
            }
        }

        None
    }
}

impl<'a, M: ResourceMetadata> Iterator for Traversal<'a, M> {
    type Item = &'a ResourceIdentifier;

    fn next(&mut self) -> Option<Self::Item> {
        let id = match self.ready.pop_front() {
            Some(id) => id,
            None => self.break_cycle()?,
        };

        let graph = self.graph;
        for next in Self::unblocks(self.direction, &graph.nodes[id]) {
            if let Some(count) = self.blocked.get_mut(next) {
                *count -= 1;
                if *count == 0 {
                    self.blocked.remove(next);
                    self.ready.push_back(next);
                }
            }
        }

        Some(id)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.ready.len() + self.blocked.len();
        (remaining, Some(remaining))
    }
}

impl<M: ResourceMetadata> ExactSizeIterator for Traversal<'_, M> {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rid(name: &str) -> ResourceIdentifier {
        ResourceIdentifier::new("store", name)
    }

    fn md(name: &str, deps: &[&str]) -> Metadata {
        deps.iter()
            .fold(Metadata::new(rid(name)), |md, dep| md.depends_on(rid(dep)))
    }

    fn names<'a>(ids: impl IntoIterator<Item = &'a ResourceIdentifier>) -> Vec<String> {
        ids.into_iter().map(|id| id.name().to_string()).collect()
    }

    fn position(order: &[String], name: &str) -> usize {
        order.iter().position(|n| n == name).unwrap()
    }

    /// 1:[2,3], 2:[4], 3:[4], 4:[], 5:[8], 6:[], 7:[], 8:[6,7]
    fn sample() -> ResourceGraph {
        ResourceGraph::from_metadata([
            md("1", &["2", "3"]),
            md("2", &["4"]),
            md("3", &["4"]),
            md("4", &[]),
            md("5", &["8"]),
            md("6", &[]),
            md("7", &[]),
            md("8", &["6", "7"]),
        ])
    }

    #[test]
    fn test_bottom_to_top() {
        let graph = sample();
        let order = names(graph.traverse_bottom_to_top());

        assert!(position(&order, "4") < position(&order, "2"));
        assert!(position(&order, "4") < position(&order, "3"));
        assert!(position(&order, "2") < position(&order, "1"));
        assert!(position(&order, "3") < position(&order, "1"));
        assert!(position(&order, "6") < position(&order, "8"));
        assert!(position(&order, "7") < position(&order, "8"));
        assert!(position(&order, "8") < position(&order, "5"));

        // Ties are broken by insertion order.
        assert_eq!(order, ["4", "6", "7", "2", "3", "8", "1", "5"]);
    }

    #[test]
    fn test_top_to_bottom() {
        let graph = sample();
        let order = names(graph.traverse_top_to_bottom());

        assert_eq!(order, ["1", "5", "2", "3", "8", "4", "6", "7"]);
    }

    #[test]
    fn test_traversal_is_restartable() {
        let graph = sample();

        let mut first = graph.traverse_bottom_to_top();
        assert_eq!(first.len(), 8);
        first.next();
        assert_eq!(first.len(), 7);

        let a = names(graph.traverse_bottom_to_top());
        let b = names(graph.traverse_bottom_to_top());
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
    }

    #[test]
    fn test_direct_relations() {
        let graph = sample();

        assert_eq!(names(graph.get_dependencies(&rid("1"))), ["2", "3"]);
        assert_eq!(names(graph.get_dependencies(&rid("8"))), ["6", "7"]);
        assert_eq!(names(graph.get_dependents(&rid("4"))), ["2", "3"]);
        assert_eq!(names(graph.get_dependents(&rid("8"))), ["5"]);
        assert!(graph.get_dependencies(&rid("6")).next().is_none());

        // Absent identifiers yield nothing.
        assert!(graph.get_dependencies(&rid("42")).next().is_none());
        assert!(graph.get_dependents(&rid("42")).next().is_none());
    }

    #[test]
    fn test_pending_edges_resolve_on_insert() {
        let mut graph: ResourceGraph = ResourceGraph::new();
        graph.insert_node(md("layer", &["store"]));

        assert!(graph.get_dependencies(&rid("layer")).next().is_none());
        assert_eq!(names(graph.unresolved()), ["store"]);

        graph.insert_node(md("store", &[]));

        assert_eq!(names(graph.get_dependencies(&rid("layer"))), ["store"]);
        assert_eq!(names(graph.get_dependents(&rid("store"))), ["layer"]);
        assert_eq!(graph.unresolved().count(), 0);
        assert_eq!(names(graph.traverse_bottom_to_top()), ["store", "layer"]);
    }

    #[test]
    fn test_duplicate_dependencies_collapse() {
        let graph: ResourceGraph =
            ResourceGraph::from_metadata([md("a", &[]), md("b", &["a", "a", "a"])]);

        assert_eq!(names(graph.get_dependencies(&rid("b"))), ["a"]);
        assert_eq!(names(graph.get_dependents(&rid("a"))), ["b"]);
        assert_eq!(names(graph.traverse_bottom_to_top()), ["a", "b"]);
    }

    #[test]
    fn test_insert_replaces() {
        let mut graph: ResourceGraph = ResourceGraph::from_metadata([
            md("a", &[]),
            md("b", &[]),
            md("c", &["a"]),
            md("d", &["c"]),
        ]);

        graph.insert_node(md("c", &["b"]));

        assert_eq!(graph.len(), 4);
        assert_eq!(names(graph.identifiers()), ["a", "b", "c", "d"]);
        assert_eq!(names(graph.get_dependencies(&rid("c"))), ["b"]);
        assert!(graph.get_dependents(&rid("a")).next().is_none());
        assert_eq!(names(graph.get_dependents(&rid("b"))), ["c"]);
        // Dependents survive replacement.
        assert_eq!(names(graph.get_dependents(&rid("c"))), ["d"]);
        assert_eq!(
            graph.node(&rid("c")).unwrap().metadata().dependencies(),
            &[rid("b")]
        );
    }

    #[test]
    fn test_replace_keeps_dependent_position() {
        let mut graph: ResourceGraph =
            ResourceGraph::from_metadata([md("z", &[]), md("x", &["z"]), md("y", &["z"])]);

        graph.insert_node(md("x", &["z"]));

        assert_eq!(names(graph.identifiers()), ["z", "x", "y"]);
        assert_eq!(names(graph.get_dependents(&rid("z"))), ["x", "y"]);
        assert_eq!(names(graph.traverse_bottom_to_top()), ["z", "x", "y"]);
        assert_eq!(names(graph.traverse_top_to_bottom()), ["x", "y", "z"]);

        // A dependency gained on replacement is appended.
        graph.insert_node(md("w", &[]));
        graph.insert_node(md("y", &["z", "w"]));
        assert_eq!(names(graph.get_dependents(&rid("z"))), ["x", "y"]);
        assert_eq!(names(graph.get_dependents(&rid("w"))), ["y"]);
    }

    #[test]
    fn test_unresolved_in_declaration_order() {
        let mut graph: ResourceGraph = ResourceGraph::new();
        graph.insert_node(md("a", &["m3", "m1"]));
        graph.insert_node(md("b", &["m2", "m1"]));

        assert_eq!(names(graph.unresolved()), ["m3", "m1", "m2"]);

        graph.insert_node(md("m1", &[]));
        assert_eq!(names(graph.unresolved()), ["m3", "m2"]);
    }

    #[test]
    fn test_replace_drops_stale_pending() {
        let mut graph: ResourceGraph = ResourceGraph::new();
        graph.insert_node(md("a", &["missing"]));
        graph.insert_node(md("a", &[]));

        assert_eq!(graph.unresolved().count(), 0);

        graph.insert_node(md("missing", &[]));
        assert!(graph.get_dependencies(&rid("a")).next().is_none());
    }

    #[test]
    fn test_remove_node() {
        let mut graph = sample();
        graph.remove_node(&rid("4"));

        assert!(!graph.contains(&rid("4")));
        assert_eq!(graph.len(), 7);
        assert!(graph.get_dependencies(&rid("2")).next().is_none());
        assert!(graph.get_dependencies(&rid("3")).next().is_none());
        assert_eq!(names(graph.unresolved()), ["4"]);

        let order = names(graph.traverse_bottom_to_top());
        assert_eq!(order.len(), 7);
        assert!(!order.contains(&"4".to_string()));

        // Removing an absent node is a no-op.
        graph.remove_node(&rid("4"));
        assert_eq!(graph.len(), 7);

        // Re-inserting reconnects the old dependents.
        graph.insert_node(md("4", &[]));
        assert_eq!(names(graph.get_dependents(&rid("4"))), ["2", "3"]);
    }

    #[test]
    fn test_remove_node_drops_outgoing_edges() {
        let mut graph = sample();
        graph.remove_node(&rid("8"));

        assert_eq!(names(graph.get_dependents(&rid("6"))), Vec::<String>::new());
        assert_eq!(names(graph.get_dependents(&rid("7"))), Vec::<String>::new());
        assert!(graph.get_dependencies(&rid("5")).next().is_none());
    }

    #[test]
    fn test_subgraph() {
        let graph = sample();

        let sub = graph.get_subgraph(&rid("8"));
        assert_eq!(names(sub.identifiers()), ["5", "6", "7", "8"]);
        assert_eq!(names(sub.traverse_bottom_to_top()), ["6", "7", "8", "5"]);

        // Reachable through a sibling dependency.
        let sub = graph.get_subgraph(&rid("2"));
        assert_eq!(names(sub.identifiers()), ["1", "2", "3", "4"]);

        assert!(graph.get_subgraph(&rid("42")).is_empty());
    }

    #[test]
    fn test_transitive() {
        let graph = sample();

        assert_eq!(names(graph.transitive_dependencies(&rid("1"))), ["2", "3", "4"]);
        assert_eq!(names(graph.transitive_dependents(&rid("6"))), ["8", "5"]);
        assert!(graph.transitive_dependencies(&rid("4")).is_empty());
    }

    #[test]
    fn test_init_and_shutdown_order() {
        let graph = sample();

        assert_eq!(names(graph.init_order(&rid("1"))), ["4", "2", "3", "1"]);
        assert_eq!(names(graph.init_order(&rid("5"))), ["6", "7", "8", "5"]);
        assert_eq!(names(graph.shutdown_order(&rid("4"))), ["1", "2", "3", "4"]);
        assert_eq!(names(graph.shutdown_order(&rid("7"))), ["5", "8", "7"]);
        assert_eq!(graph.init_order(&rid("42")).count(), 0);
    }

    #[test]
    fn test_sorted_metadata() {
        let graph = sample();
        let sorted: Vec<_> = graph
            .sorted()
            .iter()
            .map(|md| md.identifier().name().to_string())
            .collect();

        assert_eq!(sorted, names(graph.traverse_bottom_to_top()));
    }

    #[test]
    fn test_cycle_is_drained() {
        // a <-> b, c -> a
        let graph: ResourceGraph =
            ResourceGraph::from_metadata([md("a", &["b"]), md("b", &["a"]), md("c", &["a"])]);

        assert_eq!(names(graph.traverse_bottom_to_top()), ["a", "b", "c"]);
        assert_eq!(names(graph.traverse_top_to_bottom()), ["c", "a", "b"]);
        assert_eq!(graph.cycles(), vec![vec![rid("a"), rid("b")]]);
    }

    #[test]
    fn test_self_dependency() {
        let graph: ResourceGraph = ResourceGraph::from_metadata([md("a", &["a"]), md("b", &["a"])]);

        assert_eq!(names(graph.traverse_bottom_to_top()), ["a", "b"]);
        assert_eq!(names(graph.traverse_top_to_bottom()), ["b", "a"]);
        assert_eq!(graph.cycles(), vec![vec![rid("a")]]);
    }

    #[test]
    fn test_acyclic_has_no_cycles() {
        assert!(sample().cycles().is_empty());
    }

    #[test]
    fn test_mermaid() {
        let graph: ResourceGraph = ResourceGraph::from_metadata([md("a", &[]), md("b", &["a"])]);

        assert_eq!(
            graph.to_string(),
            "graph LR\n    0[\"store:a\"]\n    1[\"store:b\"]\n    0 --> 1\n"
        );
    }

    /// Random DAGs where node `i` may only depend on nodes below `i`, inserted
    /// in a shuffled order.
    fn dag() -> impl Strategy<Value = Vec<(usize, Vec<usize>)>> {
        (1usize..24)
            .prop_flat_map(|n| {
                (0..n)
                    .map(|i| {
                        proptest::sample::subsequence((0..i).collect::<Vec<_>>(), 0..=i)
                            .prop_map(move |deps| (i, deps))
                    })
                    .collect::<Vec<_>>()
            })
            .prop_shuffle()
    }

    fn build(edges: &[(usize, Vec<usize>)]) -> ResourceGraph {
        edges
            .iter()
            .map(|(i, deps)| {
                deps.iter().fold(Metadata::new(rid(&i.to_string())), |md, dep| {
                    md.depends_on(rid(&dep.to_string()))
                })
            })
            .collect()
    }

    proptest! {
        #[test]
        fn prop_topological_validity(edges in dag()) {
            let graph = build(&edges);
            let up = names(graph.traverse_bottom_to_top());
            let down = names(graph.traverse_top_to_bottom());

            prop_assert_eq!(up.len(), edges.len());
            prop_assert_eq!(down.len(), edges.len());

            for (i, deps) in &edges {
                for dep in deps {
                    let (a, b) = (i.to_string(), dep.to_string());
                    prop_assert!(position(&up, &b) < position(&up, &a));
                    prop_assert!(position(&down, &a) < position(&down, &b));
                }
            }
        }

        #[test]
        fn prop_determinism(edges in dag()) {
            let graph = build(&edges);
            prop_assert_eq!(
                names(graph.traverse_bottom_to_top()),
                names(graph.traverse_bottom_to_top())
            );
            prop_assert_eq!(
                names(graph.traverse_top_to_bottom()),
                names(build(&edges).traverse_top_to_bottom())
            );
        }

        #[test]
        fn prop_subgraph_closure(edges in dag(), pick in any::<prop::sample::Index>()) {
            let graph = build(&edges);
            let id = rid(&edges[pick.index(edges.len())].0.to_string());
            let sub = graph.get_subgraph(&id);

            let mut expected: HashSet<&ResourceIdentifier> = HashSet::from([&id]);
            let mut queue = vec![&id];
            while let Some(current) = queue.pop() {
                for next in graph.get_dependencies(current).chain(graph.get_dependents(current)) {
                    if expected.insert(next) {
                        queue.push(next);
                    }
                }
            }

            let actual: HashSet<&ResourceIdentifier> = sub.identifiers().collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
