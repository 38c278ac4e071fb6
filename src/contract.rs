// src/contract.rs

//! Contracts: the currency the planner trades in.
//!
//! A `Contract` is `(AssetType, Key?)` — what a dependency field asks for and
//! what a recipe promises to produce. `AssetType` identifies a Rust type at
//! runtime via `TypeId`, carrying its `type_name` only for diagnostics (two
//! `AssetType`s compare equal iff their `TypeId`s match; the name is never
//! part of equality or hashing).

use std::any::TypeId;
use std::hash::{Hash, Hasher};

use crate::asset::Asset;

/// Nominal identifier for an [`Asset`] type, closed at registration time.
#[derive(Debug, Clone, Copy)]
pub struct AssetType {
    type_id: TypeId,
    name: &'static str,
}

impl AssetType {
    pub fn of<A: Asset + 'static>() -> Self {
        AssetType {
            type_id: TypeId::of::<A>(),
            name: std::any::type_name::<A>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for AssetType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}
impl Eq for AssetType {}

impl Hash for AssetType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl std::fmt::Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A short keyword tag distinguishing multiple recipes that produce the same
/// [`AssetType`]. `None` is the default, unkeyed contract.
pub type Key = Option<String>;

/// `(AssetType, Key)` — what a dependency asks for and what a recipe
/// promises. Hashable; equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Contract {
    pub asset: AssetType,
    pub key: Key,
}

impl Contract {
    pub fn new(asset: AssetType, key: Key) -> Self {
        Contract { asset, key }
    }

    pub fn unkeyed(asset: AssetType) -> Self {
        Contract { asset, key: None }
    }
}

impl std::fmt::Display for Contract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.key {
            Some(k) => write!(f, "{}[{}]", self.asset, k),
            None => write!(f, "{}", self.asset),
        }
    }
}
