// src/registry.rs

//! The planner registry (spec.md §4, "Planner registry"): collects recipe
//! registrations and produces a concrete [`Plan`] for a requested target
//! asset. Grounded in `original_source/src/planner/plan/planner.py`'s
//! `Planner` class — `resolve_contract_def`'s structural dispatch is
//! replaced by the explicit [`ContextSpec`] enum (see `context.rs`).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::asset::Asset;
use crate::config::PlannerConfig;
use crate::context::{resolve_context_spec, ContextPath, ContextSpec};
use crate::contract::{AssetType, Contract, Key};
use crate::error::{PlannerError, Result};
use crate::plan::Plan;
use crate::recipe::{Recipe, RecipeBundle, RecipeHandle};

/// Registry of recipes, keyed two ways: by the contract each produces, and
/// by the context paths under which each should be preferred.
#[derive(Default)]
pub struct Planner {
    contract_to_recipes: HashMap<Contract, HashSet<RecipeHandle>>,
    recipe_to_context: HashMap<RecipeHandle, HashSet<ContextPath>>,
}

impl Planner {
    pub fn new() -> Self {
        Planner::default()
    }

    /// Register `recipe` under contract `(recipe.produces(), key)`, preferred
    /// in the context paths `context` denotes. Default `context` is the
    /// empty path, matching everywhere with near-zero weight.
    pub fn add(&mut self, recipe: Arc<dyn Recipe>, key: Key, context: ContextSpec) -> Result<&mut Self> {
        self.register_one(recipe, key, context)?;
        Ok(self)
    }

    /// Register every recipe in `bundle`. An outer `key`, if given, overrides
    /// each bundle entry's own key.
    pub fn add_bundle(
        &mut self,
        bundle: RecipeBundle,
        key: Key,
        context: ContextSpec,
    ) -> Result<&mut Self> {
        for (recipe, own_key) in bundle.recipes {
            let effective_key = key.clone().or(own_key);
            self.register_one(recipe, effective_key, context.clone())?;
        }
        Ok(self)
    }

    fn register_one(&mut self, recipe: Arc<dyn Recipe>, key: Key, context: ContextSpec) -> Result<()> {
        let context_paths = resolve_context_spec(&context)?;
        debug_assert!(!context_paths.is_empty(), "context spec always expands to >= 1 path");

        let contract = Contract::new(recipe.produces(), key);
        let handle = RecipeHandle::new(recipe);

        self.contract_to_recipes
            .entry(contract)
            .or_default()
            .insert(handle.clone());
        self.recipe_to_context
            .entry(handle)
            .or_default()
            .extend(context_paths);

        Ok(())
    }

    /// Compile a [`Plan`] for `asset` under `key`. The target recipe must be
    /// the unique recipe for `(asset, key)` registered with the empty
    /// context path.
    pub fn plan<T: Asset + 'static>(&self, key: Key, config: &PlannerConfig) -> Result<Plan<T>> {
        let target_contract = Contract::new(AssetType::of::<T>(), key);

        let target_recipe = self.resolve_target(&target_contract)?;

        tracing::info!(target = %target_contract, "creating plan");
        let algorithm = crate::algorithm::PlanningAlgorithm::new(
            target_recipe,
            &self.contract_to_recipes,
            &self.recipe_to_context,
            config.scorer_config(),
        );
        let (graph, target_node) = algorithm.run()?;
        tracing::info!(target = %target_contract, "plan created");

        Plan::new(graph, target_node)
    }

    fn resolve_target(&self, target_contract: &Contract) -> Result<RecipeHandle> {
        let empty = ContextPath::new();
        let candidates: Vec<RecipeHandle> = self
            .contract_to_recipes
            .get(target_contract)
            .into_iter()
            .flatten()
            .filter(|r| {
                self.recipe_to_context
                    .get(*r)
                    .map(|ctxs| ctxs.contains(&empty))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        match candidates.len() {
            1 => Ok(candidates.into_iter().next().unwrap()),
            _ => Err(PlannerError::AmbiguousTarget(target_contract.clone())),
        }
    }
}
