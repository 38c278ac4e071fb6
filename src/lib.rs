// src/lib.rs

//! recipe-graph
//!
//! A context-aware dependency-injection build planner: a registry of
//! *recipes* producing typed *assets*, a planning algorithm that compiles a
//! concrete acyclic build plan for a requested target asset, and an
//! execution engine enforcing the build/release ordering the plan
//! requires.
//!
//! # Architecture
//!
//! - `contract`/`asset`/`recipe`/`context` — the value types recipes are
//!   registered and matched against.
//! - `scorer` — the fitness function the planning algorithm uses to choose
//!   between competing recipes.
//! - `graph` — the plan DAG itself: an arena of nodes with stable indices,
//!   multi-edges labeled by contract.
//! - `algorithm` — the planning algorithm: greedy BFS from the target,
//!   reuse, and subgraph splits.
//! - `registry`/`plan`/`execution` — the user-facing `Planner`, the frozen
//!   `Plan` it produces, and the executor that runs one.

mod algorithm;
pub mod asset;
pub mod config;
pub mod context;
pub mod contract;
mod execution;
pub mod error;
pub mod graph;
pub mod plan;
pub mod recipe;
pub mod registry;
pub mod scorer;

pub use asset::{Asset, Cleanup, DataAsset, MakeResult};
pub use config::PlannerConfig;
pub use context::{AssetSpec, ContextPath, ContextSpec, ContractSpec, KeySpec};
pub use contract::{AssetType, Contract, Key};
pub use error::{PlannerError, Result};
pub use plan::Plan;
pub use recipe::{BuildInputs, Dependency, Recipe, RecipeBundle, RecipeHandle, StaticRecipe};
pub use registry::Planner;
pub use scorer::{strict_order_match_score, ScorerConfig};
