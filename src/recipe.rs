// src/recipe.rs

//! Recipes: the unit of build logic.
//!
//! The source language collects a recipe's injected fields via a dataclass
//! metaclass and `typing.get_type_hints`. Rust has neither, so dependencies
//! are declared explicitly as data (`dependencies()`), not discovered by
//! reflection — see the design note in `SPEC_FULL.md` §9. Static codegen
//! (a `#[derive(Recipe)]` macro) could cover the ergonomics of hand-writing
//! `dependencies()`, but is out of scope for the core (spec.md §1).

use std::fmt::Debug;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

use crate::asset::{Asset, MakeResult};
use crate::contract::{AssetType, Contract, Key};

/// One declared dependency of a [`Recipe`]: the field it is injected into,
/// and the contract it asks for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    pub name: String,
    pub contract: Contract,
}

impl Dependency {
    pub fn new(name: impl Into<String>, contract: Contract) -> Self {
        Dependency {
            name: name.into(),
            contract,
        }
    }
}

/// The already-built upstream assets bound to a recipe's dependency fields,
/// keyed by field name (mirrors `recipe_kwargs` in the source executor).
#[derive(Default)]
pub struct BuildInputs(std::collections::HashMap<String, Arc<dyn Asset>>);

impl BuildInputs {
    pub(crate) fn new() -> Self {
        BuildInputs(std::collections::HashMap::new())
    }

    pub(crate) fn insert(&mut self, field: String, asset: Arc<dyn Asset>) {
        self.0.insert(field, asset);
    }

    /// The raw, type-erased asset bound to `field`.
    pub fn asset(&self, field: &str) -> Option<&Arc<dyn Asset>> {
        self.0.get(field)
    }

    /// The asset bound to `field`, downcast to its concrete type.
    pub fn get<A: Asset + 'static>(&self, field: &str) -> Option<&A> {
        self.0.get(field).and_then(|a| a.as_any().downcast_ref())
    }
}

/// A unit of build logic: produces one [`Asset`] from zero or more typed
/// dependencies.
///
/// `build()` may return the asset directly ([`MakeResult::Plain`]) or pair
/// it with a teardown ([`MakeResult::Scoped`]) run when the executor
/// releases the record — the re-architected form of the source's
/// generator-based `make()` (see `SPEC_FULL.md` §9).
pub trait Recipe: Send + Sync + Debug {
    /// The asset type this recipe produces.
    fn produces(&self) -> AssetType;

    /// The ordered, declared list of injected dependencies.
    fn dependencies(&self) -> Vec<Dependency>;

    /// Build the asset from its already-built dependencies.
    fn build(
        &self,
        workdir: &Path,
        inputs: &BuildInputs,
    ) -> Result<MakeResult, Box<dyn std::error::Error + Send + Sync>>;
}

/// A registered recipe, identified the way the source identifies a
/// `type[Recipe]`: by object identity, not by structural equality. Two
/// `RecipeHandle`s are equal iff they wrap the same `Arc` allocation.
#[derive(Clone)]
pub struct RecipeHandle(pub(crate) Arc<dyn Recipe>);

impl RecipeHandle {
    pub fn new(recipe: Arc<dyn Recipe>) -> Self {
        RecipeHandle(recipe)
    }
}

impl PartialEq for RecipeHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for RecipeHandle {}

impl Hash for RecipeHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as *const () as usize).hash(state);
    }
}

impl Debug for RecipeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&*self.0, f)
    }
}

impl std::ops::Deref for RecipeHandle {
    type Target = dyn Recipe;
    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

/// A trivial recipe that always returns a precomputed asset. Useful for
/// tests, or for pinning a value into the registry without writing a
/// one-off [`Recipe`] impl.
#[derive(Debug)]
pub struct StaticRecipe<A: Asset + Clone + 'static> {
    asset_type: AssetType,
    asset: A,
}

impl<A: Asset + Clone + 'static> StaticRecipe<A> {
    pub fn new(asset: A) -> Arc<dyn Recipe> {
        Arc::new(StaticRecipe {
            asset_type: AssetType::of::<A>(),
            asset,
        })
    }
}

impl<A: Asset + Clone + 'static> Recipe for StaticRecipe<A> {
    fn produces(&self) -> AssetType {
        self.asset_type
    }

    fn dependencies(&self) -> Vec<Dependency> {
        Vec::new()
    }

    fn build(
        &self,
        _workdir: &Path,
        _inputs: &BuildInputs,
    ) -> Result<MakeResult, Box<dyn std::error::Error + Send + Sync>> {
        Ok(MakeResult::plain(self.asset.clone()))
    }
}

/// A collection of recipes, optionally each with its own key, registered
/// together under one call to [`crate::registry::Planner::add_bundle`].
pub struct RecipeBundle {
    pub(crate) recipes: Vec<(Arc<dyn Recipe>, Key)>,
}

impl RecipeBundle {
    pub fn new() -> Self {
        RecipeBundle {
            recipes: Vec::new(),
        }
    }

    pub fn with(mut self, recipe: Arc<dyn Recipe>, key: Key) -> Self {
        self.recipes.push((recipe, key));
        self
    }
}

impl Default for RecipeBundle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::DataAsset;

    #[derive(Debug)]
    struct Unit;

    impl Recipe for Unit {
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

    #[test]
    fn recipe_handles_compare_by_identity_not_structure() {
        let one: Arc<dyn Recipe> = Arc::new(Unit);
        let two: Arc<dyn Recipe> = Arc::new(Unit);
        let h1a = RecipeHandle::new(one.clone());
        let h1b = RecipeHandle::new(one);
        let h2 = RecipeHandle::new(two);
        assert_eq!(h1a, h1b, "two handles over the same Arc are the same recipe");
        assert_ne!(h1a, h2, "two Units, even if structurally identical, are distinct recipes");
    }

    #[test]
    fn build_inputs_downcasts_by_field_name() {
        let mut inputs = BuildInputs::new();
        inputs.insert("x".into(), Arc::new(DataAsset::new(5i32)));
        assert_eq!(inputs.get::<DataAsset<i32>>("x").unwrap().get(), &5);
        assert!(inputs.get::<DataAsset<i32>>("missing").is_none());
        assert!(inputs.asset("x").is_some());
    }

    #[test]
    fn static_recipe_always_returns_its_precomputed_asset() {
        let recipe = StaticRecipe::new(DataAsset::new(7u32));
        let inputs = BuildInputs::new();
        let workdir = tempfile::tempdir().unwrap();
        let result = recipe.build(workdir.path(), &inputs).unwrap();
        let (asset, cleanup) = result.into_parts();
        assert!(cleanup.is_none());
        assert_eq!(asset.downcast_ref::<DataAsset<u32>>().unwrap().get(), &7);
    }
}
