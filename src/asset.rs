// src/asset.rs

//! Assets: values produced by a recipe and consumed by others.
//!
//! The source language's bound-asset façades (capability injection on
//! method calls) deliberately have no counterpart here — see the design
//! note in `SPEC_FULL.md` §9. An `Asset` is a plain value; capabilities, if
//! a caller wants them, are an explicit argument at the asset's own method
//! boundary, not something the planner threads through.

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

/// Marker trait for values produced/consumed by recipes.
///
/// Implementors are typically `Send + Sync` newtypes; `as_any` enables the
/// rare downcast a generic consumer might need.
pub trait Asset: Any + Send + Sync + Debug {
    fn as_any(&self) -> &dyn Any;
}

impl dyn Asset {
    pub fn downcast_ref<T: Asset + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Simple wrapper around a data payload, for recipes that just hand back a
/// plain value.
#[derive(Debug, Clone)]
pub struct DataAsset<T: Send + Sync + Debug + 'static>(pub T);

impl<T: Send + Sync + Debug + 'static> DataAsset<T> {
    pub fn new(data: T) -> Self {
        DataAsset(data)
    }

    pub fn get(&self) -> &T {
        &self.0
    }
}

impl<T: Send + Sync + Debug + 'static> Asset for DataAsset<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A teardown closure invoked exactly once when a [`MakeResult::Scoped`]
/// asset is released. Stands in for the source language's generator-based
/// `make()`, which `yield`s once and resumes for cleanup after the asset is
/// released (see `SPEC_FULL.md` §9). Fallible, since the resumed half of a
/// generator can itself raise — a failure here is what the executor
/// collects into `PlannerError::CleanupFailed`.
pub type Cleanup =
    Box<dyn FnOnce() -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> + Send>;

/// What a recipe's `build()` hands back to the executor.
pub enum MakeResult {
    /// The asset, with nothing further to release.
    Plain(Arc<dyn Asset>),
    /// The asset, plus a teardown to run when the executor releases it.
    Scoped(Arc<dyn Asset>, Cleanup),
}

impl MakeResult {
    pub fn plain<A: Asset + 'static>(asset: A) -> Self {
        MakeResult::Plain(Arc::new(asset))
    }

    pub fn scoped<A, F>(asset: A, on_drop: F) -> Self
    where
        A: Asset + 'static,
        F: FnOnce() -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>
            + Send
            + 'static,
    {
        MakeResult::Scoped(Arc::new(asset), Box::new(on_drop))
    }

    pub(crate) fn into_parts(self) -> (Arc<dyn Asset>, Option<Cleanup>) {
        match self {
            MakeResult::Plain(asset) => (asset, None),
            MakeResult::Scoped(asset, cleanup) => (asset, Some(cleanup)),
        }
    }
}
