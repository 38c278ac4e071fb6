// src/plan.rs

//! The frozen, executable `Plan` (spec.md §4 item 6), ported from
//! `original_source/src/planner/plan/plan.py`. `draw()` is deliberately not
//! carried over — visualization is out of scope (spec.md §1).

use std::marker::PhantomData;

use crate::asset::Asset;
use crate::config::PlannerConfig;
use crate::error::Result;
use crate::execution::PlanExecution;
use crate::graph::{NodeIndex, PlanGraph};

/// A validated, acyclic build plan for a target asset of type `T`, ready to
/// run. Values are single-use: `run` may be called more than once, but each
/// call builds and tears down its own independent set of
/// [`crate::execution::PlanExecution`] records.
pub struct Plan<T: Asset + 'static> {
    graph: PlanGraph,
    target: NodeIndex,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Asset + 'static> Plan<T> {
    pub(crate) fn new(graph: PlanGraph, target: NodeIndex) -> Result<Self> {
        debug_assert!(graph.is_acyclic(), "planning algorithm guarantees a DAG");
        debug_assert_eq!(
            graph.sinks(),
            vec![target],
            "planning algorithm guarantees a unique sink: the target node"
        );
        Ok(Plan {
            graph,
            target,
            _marker: PhantomData,
        })
    }

    /// Execute the plan: build every node in topological order, hand the
    /// target asset to `f`, then release every surviving record in reverse
    /// build order.
    ///
    /// If building fails, already-built records are torn down (errors
    /// logged, never masking the build failure) and the build error is
    /// returned. If building succeeds but `f` runs and then cleanup fails,
    /// the aggregate `CleanupFailed` is returned instead of `f`'s result —
    /// mirroring the source's context manager, whose `__exit__` cleanup
    /// failure propagates even though the `with`-block body already ran.
    pub fn run<F, R>(&self, config: &PlannerConfig, f: F) -> Result<R>
    where
        F: FnOnce(&T) -> R,
    {
        tracing::info!("starting plan execution");
        let mut exec = PlanExecution::new(&self.graph, self.target, *config);

        if let Err(build_err) = exec.build_all() {
            if let Err(cleanup_err) = exec.release_all() {
                tracing::warn!(error = %cleanup_err, "cleanup also failed while unwinding after a build error");
            }
            return Err(build_err);
        }

        let target_asset = exec.asset(self.target);
        let typed = target_asset
            .downcast_ref::<T>()
            .expect("target asset type matches the contract it was planned for");
        let out = f(typed);

        tracing::info!("plan execution finished, releasing records");
        exec.release_all().map(|()| out)
    }

    /// Convenience: `run` with `PlannerConfig::default()`.
    pub fn run_default<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&T) -> R,
    {
        self.run(&PlannerConfig::default(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::DataAsset;
    use crate::context::ContextSpec;
    use crate::contract::AssetType;
    use crate::recipe::{BuildInputs, Dependency, Recipe};
    use crate::registry::Planner;
    use std::path::Path;

    #[derive(Debug)]
    struct Leaf;

    impl Recipe for Leaf {
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
        ) -> std::result::Result<crate::asset::MakeResult, Box<dyn std::error::Error + Send + Sync>>
        {
            Ok(crate::asset::MakeResult::plain(DataAsset::new(9)))
        }
    }

    #[test]
    fn run_hands_the_built_target_to_the_callback_once() {
        let mut planner = Planner::new();
        planner
            .add(std::sync::Arc::new(Leaf), None, ContextSpec::Empty)
            .unwrap();
        let plan = planner
            .plan::<DataAsset<i32>>(None, &PlannerConfig::default())
            .unwrap();
        let value = plan.run_default(|a| *a.get()).unwrap();
        assert_eq!(value, 9);
    }
}
