// src/error.rs

//! Error types for the planner core.
//!
//! Mirrors the shape of `CapabilityError`/`ManifestError` elsewhere in this
//! family of crates: one `thiserror`-derived enum, named variants, `#[from]`
//! for wrapped causes, a crate-local `Result<T>` alias.

use thiserror::Error;

use crate::context::ContextPath;
use crate::contract::Contract;
use crate::graph::EdgeKey;

/// A human-readable trace of the planning path that led to an error,
/// formatted `--contract--> recipe --contract--> recipe ...`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathTrace(pub Vec<String>);

impl std::fmt::Display for PathTrace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            write!(f, "<target>")
        } else {
            write!(f, "{}", self.0.join(" "))
        }
    }
}

/// Errors raised while planning or executing a build plan.
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("no recipe satisfies contract {contract:?} (needed because: {path})")]
    MissingRecipe { contract: Contract, path: PathTrace },

    #[error("zero or more than one recipe claims target contract {0:?} with an empty context")]
    AmbiguousTarget(Contract),

    #[error("ambiguous recipe for contract {contract:?}: {candidates} candidates tied at maximum fitness (path: {path})")]
    AmbiguousRecipe {
        contract: Contract,
        candidates: usize,
        path: PathTrace,
    },

    #[error("node already has a producer for contract {contract:?}")]
    DoubleContract { contract: Contract },

    #[error("cycle detected: edge {edge:?} already on planning path {path}")]
    Cycle { edge: EdgeKey, path: PathTrace },

    #[error("no isolating edge set found to split off matching path {path}")]
    NoIsolatingEdge { path: PathTrace },

    #[error("malformed context spec: {0}")]
    BadContractSpec(String),

    #[error("invalid dependency field `{field}` on recipe `{recipe}`: type `{ty}` is not an Asset")]
    InvalidDependencyType {
        recipe: String,
        field: String,
        ty: String,
    },

    #[error("failed to build asset `{asset}` with recipe `{recipe}`")]
    BuildFailed {
        asset: String,
        recipe: String,
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("cleanup failed for node `{node}`")]
    ReleaseFailed {
        node: String,
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("cleanup failed for {} record(s)", .0.len())]
    CleanupFailed(Vec<PlannerError>),
}

/// Crate-local result alias.
pub type Result<T> = std::result::Result<T, PlannerError>;

impl PlannerError {
    pub(crate) fn missing_recipe(contract: &Contract, path: &[(String, Contract)]) -> Self {
        let mut parts = Vec::with_capacity(path.len());
        for (recipe, c) in path {
            parts.push(format!("--{c:?}--> {recipe}"));
        }
        PlannerError::MissingRecipe {
            contract: contract.clone(),
            path: PathTrace(parts),
        }
    }
}

pub(crate) fn trace_from_context(path: &ContextPath) -> PathTrace {
    PathTrace(path.iter().map(|c| format!("{c:?}")).collect())
}
