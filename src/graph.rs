// src/graph.rs

//! The plan graph: a multi-edge DAG of [`GraphNode`]s, labeled by
//! [`Contract`].
//!
//! `GraphNode` identity is reference-based in the source (two nodes may
//! legitimately share the same `(recipe, context)` pair after a split).
//! Per the design note in `SPEC_FULL.md` §9, nodes here are arena-allocated
//! with stable indices: `petgraph::stable_graph::StableDiGraph` leaves a
//! tombstone hole on removal rather than swap-removing, so a `NodeIndex`/
//! `EdgeIndex` handed out before a split stays valid (or cleanly absent)
//! after it. Nodes are never hashed by value — only by index.

use std::collections::HashSet;

use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::context::ContextPath;
use crate::contract::Contract;
use crate::recipe::RecipeHandle;

pub use petgraph::stable_graph::NodeIndex;

/// A node in the plan graph: a recipe together with the set of context
/// paths under which it was selected (there may be more than one if the
/// recipe was registered with several `ContextPath`s).
#[derive(Debug, Clone)]
pub struct GraphNode {
    pub recipe: RecipeHandle,
    pub context: HashSet<ContextPath>,
}

impl GraphNode {
    pub fn new(recipe: RecipeHandle, context: HashSet<ContextPath>) -> Self {
        GraphNode { recipe, context }
    }
}

/// `(producer, consumer, contract)` — the spec's `MultiPathNode`. Identifies
/// an edge by its endpoints and label rather than by `EdgeIndex`, since
/// that's what the planning algorithm compares, queues, and rewires.
pub type EdgeKey = (NodeIndex, NodeIndex, Contract);

/// The plan graph under construction. Thin wrapper over a
/// [`StableDiGraph`] enforcing the one invariant the algorithm itself
/// can't: "no two in-edges of a node carry the same contract."
#[derive(Debug, Default)]
pub struct PlanGraph {
    inner: StableDiGraph<GraphNode, Contract>,
}

impl PlanGraph {
    pub fn new() -> Self {
        PlanGraph {
            inner: StableDiGraph::new(),
        }
    }

    pub fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        self.inner.add_node(node)
    }

    pub fn node(&self, idx: NodeIndex) -> &GraphNode {
        &self.inner[idx]
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.inner.node_indices()
    }

    pub fn contains_node(&self, idx: NodeIndex) -> bool {
        self.inner.contains_node(idx)
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// `in_edges(parent)`: the contracts currently satisfied on `parent`,
    /// each paired with its producer.
    pub fn in_edges(&self, node: NodeIndex) -> Vec<(NodeIndex, Contract)> {
        self.inner
            .edges_directed(node, Direction::Incoming)
            .map(|e| (e.source(), e.weight().clone()))
            .collect()
    }

    pub fn out_degree(&self, node: NodeIndex) -> usize {
        self.inner.edges_directed(node, Direction::Outgoing).count()
    }

    pub fn in_degree(&self, node: NodeIndex) -> usize {
        self.inner.edges_directed(node, Direction::Incoming).count()
    }

    /// Whether `(from, to, contract)` currently exists as an edge.
    pub fn has_edge(&self, key: &EdgeKey) -> bool {
        let (from, to, contract) = key;
        self.inner
            .edges_connecting(*from, *to)
            .any(|e| e.weight() == contract)
    }

    /// Add `(child -> parent, contract)`. Caller is responsible for having
    /// checked `DoubleContract` first (see `algorithm.rs::add_edge`).
    pub fn add_edge(&mut self, child: NodeIndex, parent: NodeIndex, contract: Contract) {
        self.inner.add_edge(child, parent, contract);
    }

    /// Remove exactly the edge identified by `key`, if present.
    pub fn remove_edge(&mut self, key: &EdgeKey) {
        let (from, to, contract) = key;
        if let Some(eid) = self
            .inner
            .edges_connecting(*from, *to)
            .find(|e| e.weight() == contract)
            .map(|e| e.id())
        {
            self.inner.remove_edge(eid);
        }
    }

    pub fn remove_nodes(&mut self, nodes: &HashSet<NodeIndex>) {
        for n in nodes {
            self.inner.remove_node(*n);
        }
    }

    /// `nx.ancestors(G, node)`: all nodes with a directed path to `node`,
    /// excluding `node` itself.
    pub fn ancestors(&self, node: NodeIndex) -> HashSet<NodeIndex> {
        let mut seen = HashSet::new();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            for e in self.inner.edges_directed(n, Direction::Incoming) {
                let src = e.source();
                if seen.insert(src) {
                    stack.push(src);
                }
            }
        }
        seen
    }

    /// `nx.descendants(G, node)`: all nodes reachable from `node`, excluding
    /// `node` itself.
    pub fn descendants(&self, node: NodeIndex) -> HashSet<NodeIndex> {
        let mut seen = HashSet::new();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            for e in self.inner.edges_directed(n, Direction::Outgoing) {
                let dst = e.target();
                if seen.insert(dst) {
                    stack.push(dst);
                }
            }
        }
        seen
    }

    /// `nx.all_simple_edge_paths(G, from, to)`: every path of edges from
    /// `from` to `to` that visits no node twice, as a sequence of
    /// `(u, v, contract)` triples. The graph is acyclic by construction, so
    /// a plain DFS without a path-local visited set already yields simple
    /// paths; we keep one anyway as a defensive measure against a
    /// not-yet-pruned cycle slipping through.
    pub fn all_simple_edge_paths(&self, from: NodeIndex, to: NodeIndex) -> Vec<Vec<EdgeKey>> {
        let mut results = Vec::new();
        let mut path = Vec::new();
        let mut on_path = HashSet::new();
        on_path.insert(from);
        self.dfs_edge_paths(from, to, &mut path, &mut on_path, &mut results);
        results
    }

    fn dfs_edge_paths(
        &self,
        current: NodeIndex,
        target: NodeIndex,
        path: &mut Vec<EdgeKey>,
        on_path: &mut HashSet<NodeIndex>,
        results: &mut Vec<Vec<EdgeKey>>,
    ) {
        if current == target {
            results.push(path.clone());
            return;
        }
        for e in self.inner.edges_directed(current, Direction::Outgoing) {
            let next = e.target();
            if on_path.contains(&next) {
                continue;
            }
            path.push((current, next, e.weight().clone()));
            on_path.insert(next);
            self.dfs_edge_paths(next, target, path, on_path, results);
            on_path.remove(&next);
            path.pop();
        }
    }

    /// Edges crossing from outside `h` into `h` (petgraph has no built-in
    /// `edge_boundary`; this is the direct translation of
    /// `nx.edge_boundary(G, V - H, H, keys=True)`).
    pub fn boundary_in_edges(&self, h: &HashSet<NodeIndex>) -> Vec<EdgeKey> {
        let mut out = Vec::new();
        for &v in h {
            for e in self.inner.edges_directed(v, Direction::Incoming) {
                let u = e.source();
                if !h.contains(&u) {
                    out.push((u, v, e.weight().clone()));
                }
            }
        }
        out
    }

    /// Edges with both endpoints in `h`.
    pub fn inner_edges(&self, h: &HashSet<NodeIndex>) -> Vec<EdgeKey> {
        let mut out = Vec::new();
        for &u in h {
            for e in self.inner.edges_directed(u, Direction::Outgoing) {
                let v = e.target();
                if h.contains(&v) {
                    out.push((u, v, e.weight().clone()));
                }
            }
        }
        out
    }

    pub fn is_acyclic(&self) -> bool {
        petgraph::algo::toposort(&self.inner, None).is_ok()
    }

    /// Topological order, producers before consumers.
    pub fn topological_order(&self) -> Vec<NodeIndex> {
        petgraph::algo::toposort(&self.inner, None)
            .expect("plan graph is acyclic by construction")
    }

    pub fn sinks(&self) -> Vec<NodeIndex> {
        self.inner
            .node_indices()
            .filter(|&n| self.out_degree(n) == 0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{Asset, DataAsset, MakeResult};
    use crate::contract::AssetType;
    use crate::recipe::{BuildInputs, Dependency, Recipe};
    use std::path::Path;
    use std::sync::Arc;

    #[derive(Debug)]
    struct NoopRecipe;

    impl Recipe for NoopRecipe {
        fn produces(&self) -> AssetType {
            AssetType::of::<DataAsset<()>>()
        }
        fn dependencies(&self) -> Vec<Dependency> {
            Vec::new()
        }
        fn build(
            &self,
            _workdir: &Path,
            _inputs: &BuildInputs,
        ) -> Result<MakeResult, Box<dyn std::error::Error + Send + Sync>> {
            Ok(MakeResult::plain(DataAsset::new(())))
        }
    }

    fn node() -> GraphNode {
        GraphNode::new(
            RecipeHandle::new(Arc::new(NoopRecipe) as Arc<dyn Recipe>),
            HashSet::from([ContextPath::new()]),
        )
    }

    fn contract() -> Contract {
        Contract::unkeyed(AssetType::of::<DataAsset<()>>())
    }

    /// Build a diamond: `b -> a1 -> t`, `b -> a2 -> t`.
    fn diamond() -> (PlanGraph, NodeIndex, NodeIndex, NodeIndex, NodeIndex) {
        let mut g = PlanGraph::new();
        let t = g.add_node(node());
        let a1 = g.add_node(node());
        let a2 = g.add_node(node());
        let b = g.add_node(node());
        g.add_edge(a1, t, contract());
        g.add_edge(a2, t, contract());
        g.add_edge(b, a1, contract());
        g.add_edge(b, a2, contract());
        (g, t, a1, a2, b)
    }

    #[test]
    fn in_edges_and_degrees_reflect_added_edges() {
        let (g, t, a1, a2, b) = diamond();
        assert_eq!(g.in_degree(t), 2);
        assert_eq!(g.out_degree(b), 2);
        assert_eq!(g.in_edges(t).len(), 2);
        assert!(g.has_edge(&(a1, t, contract())));
        assert!(!g.has_edge(&(b, t, contract())));
        let _ = a2;
    }

    #[test]
    fn ancestors_and_descendants_cross_the_whole_diamond() {
        let (g, t, a1, a2, b) = diamond();
        assert_eq!(g.ancestors(t), HashSet::from([a1, a2, b]));
        assert_eq!(g.descendants(b), HashSet::from([a1, a2, t]));
    }

    #[test]
    fn all_simple_edge_paths_enumerates_both_diamond_legs() {
        let (g, t, ..) = diamond();
        let b = g.node_indices().find(|&n| g.out_degree(n) == 2).unwrap();
        let paths = g.all_simple_edge_paths(b, t);
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.len() == 2));
    }

    #[test]
    fn boundary_and_inner_edges_partition_a_subgraph() {
        let (g, t, a1, a2, b) = diamond();
        let h = HashSet::from([a1, b]);
        assert_eq!(g.inner_edges(&h), vec![(b, a1, contract())]);
        let boundary = g.boundary_in_edges(&h);
        assert!(boundary.is_empty(), "b has no producers, a1's only in-edge is inner");
        let h2 = HashSet::from([a1]);
        assert_eq!(g.boundary_in_edges(&h2), vec![(b, a1, contract())]);
        let _ = (a2, t);
    }

    #[test]
    fn topological_order_places_every_producer_before_its_consumers() {
        let (g, t, a1, a2, b) = diamond();
        let order = g.topological_order();
        let pos = |n: NodeIndex| order.iter().position(|&x| x == n).unwrap();
        assert!(pos(b) < pos(a1));
        assert!(pos(b) < pos(a2));
        assert!(pos(a1) < pos(t));
        assert!(pos(a2) < pos(t));
    }

    #[test]
    fn sinks_reports_the_unique_out_degree_zero_node() {
        let (g, t, ..) = diamond();
        assert_eq!(g.sinks(), vec![t]);
    }

    #[test]
    fn remove_nodes_drops_holes_without_disturbing_other_indices() {
        let (mut g, t, a1, a2, b) = diamond();
        g.remove_nodes(&HashSet::from([a1]));
        assert!(!g.contains_node(a1));
        assert!(g.contains_node(t));
        assert!(g.contains_node(a2));
        assert!(g.contains_node(b));
        assert_eq!(g.in_degree(t), 1);
    }

    #[test]
    fn remove_edge_removes_only_the_matching_contract() {
        let (mut g, t, a1, ..) = diamond();
        g.remove_edge(&(a1, t, contract()));
        assert!(!g.has_edge(&(a1, t, contract())));
        assert_eq!(g.in_degree(t), 1);
    }
}
