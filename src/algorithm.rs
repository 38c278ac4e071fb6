// src/algorithm.rs

//! The planning algorithm proper (spec.md §4.2), ported from
//! `plan/algorithm.py::_PlanningAlgorithm`.
//!
//! Starting from the target node, walks dependencies breadth-first, picks
//! the best-fit recipe for each via [`crate::scorer`], reuses compatible
//! nodes when possible, and splits off a duplicate subgraph when a
//! better-fitting recipe only applies along some of the paths to the
//! target. See `SPEC_FULL.md` §4.2 for the case table this implements.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::context::ContextPath;
use crate::contract::Contract;
use crate::error::{trace_from_context, PlannerError, Result};
use crate::graph::{EdgeKey, GraphNode, NodeIndex, PlanGraph};
use crate::recipe::RecipeHandle;
use crate::scorer::{strict_order_match_score, ScorerConfig};

struct RecipePick {
    recipe: RecipeHandle,
    fitness: f64,
}

struct ExistingNodePick {
    node: NodeIndex,
    fitness: f64,
}

/// Greedy context-aware DAG constructor. One instance per call to
/// `Planner::plan`.
pub struct PlanningAlgorithm<'a> {
    graph: PlanGraph,
    target_node: NodeIndex,
    target_contract: Contract,
    queue: VecDeque<Vec<EdgeKey>>,
    contract_to_recipes: &'a HashMap<Contract, HashSet<RecipeHandle>>,
    recipe_to_context: &'a HashMap<RecipeHandle, HashSet<ContextPath>>,
    scorer_cfg: ScorerConfig,
}

impl<'a> PlanningAlgorithm<'a> {
    pub fn new(
        target_recipe: RecipeHandle,
        contract_to_recipes: &'a HashMap<Contract, HashSet<RecipeHandle>>,
        recipe_to_context: &'a HashMap<RecipeHandle, HashSet<ContextPath>>,
        scorer_cfg: ScorerConfig,
    ) -> Self {
        let target_contract = Contract::unkeyed(target_recipe.produces());
        let mut graph = PlanGraph::new();
        let target_node = graph.add_node(GraphNode::new(
            target_recipe,
            HashSet::from([ContextPath::new()]),
        ));
        PlanningAlgorithm {
            graph,
            target_node,
            target_contract,
            queue: VecDeque::from([Vec::new()]),
            contract_to_recipes,
            recipe_to_context,
            scorer_cfg,
        }
    }

    /// Run the algorithm to completion, returning the finished [`PlanGraph`]
    /// together with the (still-valid) index of the target node, its unique
    /// sink.
    pub fn run(mut self) -> Result<(PlanGraph, NodeIndex)> {
        while let Some(parent_path) = self.queue.pop_front() {
            let parent_node = parent_path
                .first()
                .map(|(child, _, _)| *child)
                .unwrap_or(self.target_node);

            if !parent_path.iter().all(|e| self.graph.has_edge(e)) {
                continue;
            }

            let recipe = self.graph.node(parent_node).recipe.clone();
            for dep in recipe.dependencies() {
                self.satisfy_dependency(parent_node, dep.contract, &parent_path)?;
            }
        }

        let mut keep = self.graph.ancestors(self.target_node);
        keep.insert(self.target_node);
        let remove: HashSet<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|n| !keep.contains(n))
            .collect();
        self.graph.remove_nodes(&remove);

        Ok((self.graph, self.target_node))
    }

    fn satisfy_dependency(
        &mut self,
        parent_node: NodeIndex,
        contract: Contract,
        parent_path: &[EdgeKey],
    ) -> Result<()> {
        let picked_recipe = match self.pick_recipe(&contract, parent_path)? {
            Some(p) => p,
            None => {
                let path = self.missing_recipe_path(&contract, parent_path);
                return Err(PlannerError::missing_recipe(&contract, &path));
            }
        };

        let reuse_node = self.pick_existing_node(&picked_recipe, parent_path);

        let curr_child_node = self
            .graph
            .in_edges(parent_node)
            .into_iter()
            .find(|(_, c)| *c == contract)
            .map(|(n, _)| n);

        match curr_child_node {
            None => {
                let child_node = match &reuse_node {
                    Some(reuse) => reuse.node,
                    None => {
                        let ctx = self.context_of(&picked_recipe.recipe);
                        self.graph
                            .add_node(GraphNode::new(picked_recipe.recipe.clone(), ctx))
                    }
                };
                self.add_edge(child_node, parent_node, contract, parent_path)?;
            }
            Some(curr_child_node) => {
                let curr_context = self.graph.node(curr_child_node).context.clone();
                let curr_fitness = self.compute_fitness(&curr_context, parent_path);

                if let Some(reuse) = &reuse_node {
                    if reuse.fitness > curr_fitness {
                        let reuse_context = self.graph.node(reuse.node).context.clone();
                        let isolating = self.compute_isolating_edge(
                            &reuse_context,
                            parent_node,
                            curr_child_node,
                        )?;
                        let curr_edge = (curr_child_node, parent_node, contract.clone());
                        let new_parent =
                            self.perform_split(parent_node, &isolating, &reuse_context, &curr_edge);
                        self.add_edge(reuse.node, new_parent, contract, parent_path)?;
                        return Ok(());
                    }
                }

                if picked_recipe.fitness > curr_fitness {
                    let ctx = self.context_of(&picked_recipe.recipe);
                    let isolating =
                        self.compute_isolating_edge(&ctx, parent_node, curr_child_node)?;
                    let curr_edge = (curr_child_node, parent_node, contract.clone());
                    let new_parent = self.perform_split(parent_node, &isolating, &ctx, &curr_edge);
                    let child_node = self
                        .graph
                        .add_node(GraphNode::new(picked_recipe.recipe.clone(), ctx));
                    self.add_edge(child_node, new_parent, contract, parent_path)?;
                } else {
                    self.use_edge(curr_child_node, parent_node, contract, parent_path)?;
                }
            }
        }
        Ok(())
    }

    fn context_of(&self, recipe: &RecipeHandle) -> HashSet<ContextPath> {
        self.recipe_to_context
            .get(recipe)
            .cloned()
            .unwrap_or_else(|| HashSet::from([ContextPath::new()]))
    }

    fn pick_recipe(&self, contract: &Contract, path: &[EdgeKey]) -> Result<Option<RecipePick>> {
        let candidates = match self.contract_to_recipes.get(contract) {
            Some(c) => c,
            None => return Ok(None),
        };

        let mut max_fitness = 0.0_f64;
        let mut best: Vec<RecipeHandle> = Vec::new();

        for r in candidates {
            let ctx = self.context_of(r);
            let fitness = self.compute_fitness(&ctx, path);
            if fitness == 0.0 {
                continue;
            }
            if fitness == max_fitness {
                best.push(r.clone());
            } else if fitness > max_fitness {
                max_fitness = fitness;
                best.clear();
                best.push(r.clone());
            }
        }

        if best.len() > 1 {
            return Err(PlannerError::AmbiguousRecipe {
                contract: contract.clone(),
                candidates: best.len(),
                path: trace_from_edges(path),
            });
        }

        Ok(best
            .into_iter()
            .next()
            .map(|recipe| RecipePick { recipe, fitness: max_fitness }))
    }

    /// Score how well a recipe's (or node's) context set matches the current
    /// planning path, read back-to-front (closest dependency first) against
    /// the path read the same way, per `algorithm.py::compute_fitness`.
    fn compute_fitness(&self, context: &HashSet<ContextPath>, path: &[EdgeKey]) -> f64 {
        let mut contracts_path: Vec<Contract> = path.iter().map(|(_, _, c)| c.clone()).collect();
        contracts_path.push(self.target_contract.clone());

        let mut best = 0.0_f64;
        for ctx in context {
            let rev_ctx: Vec<Contract> = ctx.iter().rev().cloned().collect();
            let rev_path: Vec<Contract> = contracts_path.iter().rev().cloned().collect();
            let score = strict_order_match_score(&rev_ctx, &rev_path, &self.scorer_cfg);
            if score > best {
                best = score;
            }
        }
        best
    }

    /// Find a minimal set of edges separating paths better matched by
    /// `context` than by `curr_child_node`'s context, from `parent_node` to
    /// the target.
    fn compute_isolating_edge(
        &self,
        context: &HashSet<ContextPath>,
        parent_node: NodeIndex,
        curr_child_node: NodeIndex,
    ) -> Result<HashSet<EdgeKey>> {
        let curr_context = self.graph.node(curr_child_node).context.clone();

        let mut matching_paths: HashSet<Vec<EdgeKey>> = HashSet::new();
        let mut isolating_edges: HashMap<EdgeKey, HashSet<Vec<EdgeKey>>> = HashMap::new();
        // First-seen order of `isolating_edges`' keys, so the greedy pick
        // below breaks coverage ties the same way every time `plan()` runs
        // on the same registry — `HashMap` iteration order is randomized
        // per-process and must never decide a tie (spec.md §8,
        // "planning is deterministic").
        let mut edge_order: Vec<EdgeKey> = Vec::new();
        let mut nonmatching: HashSet<EdgeKey> = HashSet::new();

        for path in self.graph.all_simple_edge_paths(parent_node, self.target_node) {
            let curr_fitness = self.compute_fitness(&curr_context, &path);
            let fitness = self.compute_fitness(context, &path);

            if fitness > 0.0 && fitness > curr_fitness {
                matching_paths.insert(path.clone());
                for edge in &path {
                    if !nonmatching.contains(edge) {
                        if !isolating_edges.contains_key(edge) {
                            edge_order.push(edge.clone());
                        }
                        isolating_edges
                            .entry(edge.clone())
                            .or_default()
                            .insert(path.clone());
                    }
                }
            } else {
                for edge in &path {
                    nonmatching.insert(edge.clone());
                    isolating_edges.remove(edge);
                }
            }
        }

        let mut picked_edges: HashSet<EdgeKey> = HashSet::new();
        while !isolating_edges.is_empty() {
            let mut best: Option<(usize, &EdgeKey)> = None;
            for edge in &edge_order {
                if let Some(paths) = isolating_edges.get(edge) {
                    let len = paths.len();
                    let better = match best {
                        None => true,
                        Some((best_len, _)) => len > best_len,
                    };
                    if better {
                        best = Some((len, edge));
                    }
                }
            }
            let best_edge = best
                .map(|(_, e)| e.clone())
                .expect("loop body runs only while isolating_edges is non-empty");
            let covered = isolating_edges
                .remove(&best_edge)
                .expect("best_edge was just selected from this map");
            picked_edges.insert(best_edge);

            for path in &covered {
                matching_paths.remove(path);
                for e in path {
                    if let Some(set) = isolating_edges.get_mut(e) {
                        set.remove(path);
                        if set.is_empty() {
                            isolating_edges.remove(e);
                        }
                    }
                }
            }
        }

        if let Some(path) = matching_paths.into_iter().next() {
            return Err(PlannerError::NoIsolatingEdge {
                path: trace_from_edges(&path),
            });
        }

        Ok(picked_edges)
    }

    fn add_edge(
        &mut self,
        child: NodeIndex,
        parent: NodeIndex,
        contract: Contract,
        parent_path: &[EdgeKey],
    ) -> Result<()> {
        let satisfied: bool = self
            .graph
            .in_edges(parent)
            .into_iter()
            .any(|(_, c)| c == contract);
        if satisfied {
            return Err(PlannerError::DoubleContract { contract });
        }
        self.graph.add_edge(child, parent, contract.clone());
        self.use_edge(child, parent, contract, parent_path)
    }

    fn use_edge(
        &mut self,
        child: NodeIndex,
        parent: NodeIndex,
        contract: Contract,
        parent_path: &[EdgeKey],
    ) -> Result<()> {
        let edge: EdgeKey = (child, parent, contract);
        if parent_path.contains(&edge) {
            return Err(PlannerError::Cycle {
                edge,
                path: trace_from_edges(parent_path),
            });
        }
        let mut new_path = Vec::with_capacity(parent_path.len() + 1);
        new_path.push(edge);
        new_path.extend_from_slice(parent_path);
        self.queue.push_back(new_path);
        Ok(())
    }

    /// Duplicate the subgraph between `parent_node` and the isolating edges'
    /// targets, tag the copies with `context`, rewire the isolating edges to
    /// point at the copies, and return the copy of `parent_node` — the new
    /// parent from which the caller keeps building.
    fn perform_split(
        &mut self,
        parent_node: NodeIndex,
        isolating_edges: &HashSet<EdgeKey>,
        context: &HashSet<ContextPath>,
        curr_child_edge: &EdgeKey,
    ) -> NodeIndex {
        let mut ancestors: HashSet<NodeIndex> = HashSet::new();
        for (_, to, _) in isolating_edges {
            ancestors.extend(self.graph.ancestors(*to));
        }
        let descendants = self.graph.descendants(parent_node);
        let mut h: HashSet<NodeIndex> = descendants.intersection(&ancestors).cloned().collect();
        h.insert(parent_node);

        let mut node_copies: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        for &n in &h {
            let recipe = self.graph.node(n).recipe.clone();
            let copy = self.graph.add_node(GraphNode::new(recipe, context.clone()));
            node_copies.insert(n, copy);
        }

        for (u, v, c) in self.graph.inner_edges(&h) {
            self.graph.add_edge(node_copies[&u], node_copies[&v], c);
        }

        for (u, v, c) in self.graph.boundary_in_edges(&h) {
            let edge = (u, v, c.clone());
            if &edge != curr_child_edge {
                self.graph.add_edge(u, node_copies[&v], c);
            }
        }

        for edge in isolating_edges {
            let (from, to, contract) = edge;
            self.graph.remove_edge(edge);
            self.graph.add_edge(node_copies[from], *to, contract.clone());
        }

        node_copies[&parent_node]
    }

    /// Prefer reuse: find an existing node for the same recipe with fitness
    /// at least as good as a freshly created one, preferring the best among
    /// ties.
    fn pick_existing_node(
        &self,
        picked_recipe: &RecipePick,
        path: &[EdgeKey],
    ) -> Option<ExistingNodePick> {
        let mut picked: Option<(NodeIndex, f64)> = None;

        for node in self.graph.node_indices() {
            if self.graph.node(node).recipe != picked_recipe.recipe {
                continue;
            }
            let context = self.graph.node(node).context.clone();
            let fitness = self.compute_fitness(&context, path);
            let better = match picked {
                None => true,
                Some((_, pf)) => fitness > pf,
            };
            if fitness >= picked_recipe.fitness && better {
                picked = Some((node, fitness));
            }
        }

        picked.map(|(node, fitness)| ExistingNodePick { node, fitness })
    }

    /// Build the `(recipe name, contract)` trail `MissingRecipe` reports:
    /// the contract missing at `parent_node`, then each ancestor edge's own
    /// contract paired with the node it fed, out to the target.
    fn missing_recipe_path(&self, contract: &Contract, parent_path: &[EdgeKey]) -> Vec<(String, Contract)> {
        let n = parent_path.len();
        let mut pairs = Vec::with_capacity(n + 1);
        for i in 0..=n {
            let node = if i < n { parent_path[i].0 } else { self.target_node };
            let label = if i == 0 {
                contract.clone()
            } else {
                parent_path[i - 1].2.clone()
            };
            let recipe_name = format!("{:?}", self.graph.node(node).recipe);
            pairs.push((recipe_name, label));
        }
        pairs
    }
}

fn trace_from_edges(path: &[EdgeKey]) -> crate::error::PathTrace {
    let contracts: ContextPath = path.iter().map(|(_, _, c)| c.clone()).collect();
    trace_from_context(&contracts)
}
