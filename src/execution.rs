// src/execution.rs

//! The plan executor (spec.md §4.3), ported from
//! `original_source/src/planner/plan/execution.py`: walks the planned graph
//! in topological order, instantiates each recipe with its already-built
//! dependencies, and releases `AssetRecord`s eagerly or at scope exit.

use std::collections::HashMap;
use std::sync::Arc;

use tempfile::TempDir;

use crate::asset::{Asset, Cleanup};
use crate::config::PlannerConfig;
use crate::error::{PlannerError, Result};
use crate::graph::{NodeIndex, PlanGraph};
use crate::recipe::BuildInputs;

/// The executor's handle to one built asset: the asset itself, its
/// teardown (if any), and the scoped build directory it ran in.
struct AssetRecord {
    asset: Arc<dyn Asset>,
    cleanup: Option<Cleanup>,
    #[allow(dead_code)] // kept alive until release; never read directly
    workdir: TempDir,
    released: bool,
}

/// Drives one run of a [`PlanGraph`]: builds every node in topological
/// order, then releases surviving records in reverse order.
pub(crate) struct PlanExecution<'a> {
    graph: &'a PlanGraph,
    config: PlannerConfig,
    target: NodeIndex,
    records: HashMap<NodeIndex, AssetRecord>,
    build_order: Vec<NodeIndex>,
    remaining_uses: HashMap<NodeIndex, usize>,
    cleanup_errors: Vec<PlannerError>,
}

impl<'a> PlanExecution<'a> {
    pub(crate) fn new(graph: &'a PlanGraph, target: NodeIndex, config: PlannerConfig) -> Self {
        let remaining_uses = graph.node_indices().map(|n| (n, graph.out_degree(n))).collect();
        PlanExecution {
            graph,
            config,
            target,
            records: HashMap::new(),
            build_order: Vec::new(),
            remaining_uses,
            cleanup_errors: Vec::new(),
        }
    }

    /// Build every node in topological order. Aborts on the first recipe
    /// failure; eager-mode cleanup failures along the way are collected,
    /// not fatal (spec.md §4.3 step 3).
    pub(crate) fn build_all(&mut self) -> Result<()> {
        let order = self.graph.topological_order();
        for n in order {
            self.build_one(n)?;
        }
        Ok(())
    }

    fn build_one(&mut self, n: NodeIndex) -> Result<()> {
        let recipe = self.graph.node(n).recipe.clone();
        tracing::debug!(recipe = ?recipe, "building asset");

        let mut inputs = BuildInputs::new();
        for (producer, contract) in self.graph.in_edges(n) {
            let dep = recipe
                .dependencies()
                .into_iter()
                .find(|d| d.contract == contract)
                .expect("coverage invariant: every in-edge contract matches a declared dependency");
            let asset = self
                .records
                .get(&producer)
                .expect("topological order builds producers before their consumers")
                .asset
                .clone();
            inputs.insert(dep.name, asset);
        }

        let build_failed = |cause: Box<dyn std::error::Error + Send + Sync>| PlannerError::BuildFailed {
            asset: recipe.produces().name().to_string(),
            recipe: format!("{recipe:?}"),
            cause,
        };

        let workdir = tempfile::tempdir().map_err(|e| build_failed(Box::new(e)))?;
        let make_result = recipe.build(workdir.path(), &inputs).map_err(build_failed)?;
        let (asset, cleanup) = make_result.into_parts();

        self.records.insert(
            n,
            AssetRecord {
                asset,
                cleanup,
                workdir,
                released: false,
            },
        );
        self.build_order.push(n);

        for (producer, _) in self.graph.in_edges(n) {
            let remaining = self
                .remaining_uses
                .get_mut(&producer)
                .expect("every producer has a remaining-use counter");
            *remaining -= 1;
            if *remaining == 0 && producer != self.target && self.config.eager_cleanup {
                self.release(producer);
            }
        }

        Ok(())
    }

    /// The already-built asset for `n`. Panics if `n` hasn't been built yet
    /// — only ever called by `Plan::run` after `build_all` succeeds.
    pub(crate) fn asset(&self, n: NodeIndex) -> Arc<dyn Asset> {
        self.records
            .get(&n)
            .expect("target must be built by the time the caller asks for it")
            .asset
            .clone()
    }

    fn release(&mut self, n: NodeIndex) {
        let Some(record) = self.records.get_mut(&n) else {
            return;
        };
        if record.released {
            return;
        }
        record.released = true;
        if let Some(cleanup) = record.cleanup.take() {
            tracing::debug!(node = ?n, "releasing asset");
            if let Err(cause) = cleanup() {
                self.cleanup_errors.push(PlannerError::ReleaseFailed {
                    node: format!("{n:?}"),
                    cause,
                });
            }
        }
    }

    /// Release every surviving record in reverse build order, then report
    /// the aggregate of every cleanup failure seen (eager or final) — never
    /// called when a build error is already in flight; the caller decides
    /// what to do with that case (spec.md §4.3 step 4 / §7).
    pub(crate) fn release_all(&mut self) -> Result<()> {
        for &n in self.build_order.clone().iter().rev() {
            self.release(n);
        }
        if self.cleanup_errors.is_empty() {
            Ok(())
        } else {
            Err(PlannerError::CleanupFailed(std::mem::take(
                &mut self.cleanup_errors,
            )))
        }
    }
}

impl<'a> Drop for PlanExecution<'a> {
    /// Best-effort backstop for an unwinding panic in the caller's `Plan::run`
    /// closure: `release_all` only runs on the ordinary return path, so a
    /// panic would otherwise drop every still-held `AssetRecord` (and its
    /// cleanup) without ever running it. `Drop` can't propagate a `Result`,
    /// so failures here are logged, not collected.
    fn drop(&mut self) {
        for &n in self.build_order.clone().iter().rev() {
            self.release(n);
        }
        for err in self.cleanup_errors.drain(..) {
            tracing::warn!(error = %err, "cleanup failed while unwinding");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::DataAsset;
    use crate::contract::AssetType;
    use crate::graph::GraphNode;
    use crate::recipe::{Dependency, Recipe};
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    #[derive(Debug)]
    struct Producer(Arc<Mutex<Vec<&'static str>>>);

    impl Recipe for Producer {
        fn produces(&self) -> AssetType {
            AssetType::of::<DataAsset<i32>>()
        }
        fn dependencies(&self) -> Vec<Dependency> {
            Vec::new()
        }
        fn build(
            &self,
            _workdir: &Path,
            _inputs: &BuildInputs,
        ) -> std::result::Result<MakeResult, Box<dyn std::error::Error + Send + Sync>> {
            let log = self.0.clone();
            Ok(MakeResult::scoped(DataAsset::new(1), move || {
                log.lock().unwrap().push("released");
                Ok(())
            }))
        }
    }

    #[test]
    fn releasing_the_same_node_twice_runs_cleanup_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut graph = PlanGraph::new();
        let node = graph.add_node(GraphNode::new(
            crate::recipe::RecipeHandle::new(Arc::new(Producer(log.clone()))),
            std::collections::HashSet::from([crate::context::ContextPath::new()]),
        ));

        let mut exec = PlanExecution::new(&graph, node, PlannerConfig::default());
        exec.build_one(node).unwrap();
        exec.release(node);
        exec.release(node);

        assert_eq!(log.lock().unwrap().len(), 1);
        assert!(exec.cleanup_errors.is_empty());
    }
}
