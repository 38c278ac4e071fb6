// src/context.rs

//! Context specs: the user-facing input to recipe registration, and their
//! expansion into concrete [`ContextPath`]s.
//!
//! The source accepts a loosely-typed `ContractDef` union and distinguishes
//! its shape at runtime (`isinstance` checks, falling back to "must be a
//! sequence" on exception). Rust has no such structural dispatch, so the
//! four shapes spec.md §4.1 lists — a single asset class, a set of asset
//! classes, a 2-tuple `(asset-or-set, key-or-set-or-None)`, or a finite
//! sequence of those — become an explicit enum. `BadContractSpec` is kept
//! for the one case that still needs a runtime check: an empty set literal.

use std::collections::HashSet;

use crate::contract::{AssetType, Contract, Key};
use crate::error::{PlannerError, Result};

/// An ordered, possibly empty tuple of [`Contract`]s: "this recipe is
/// preferred when the planning path from the current node to the target
/// traverses these contracts, in order, possibly with gaps."
pub type ContextPath = Vec<Contract>;

/// One position in a context spec: a single asset, a set of candidate
/// assets (choice at that position), or either paired with a key spec.
#[derive(Debug, Clone)]
pub enum ContractSpec {
    /// A single asset type, implicitly keyed `None`.
    Asset(AssetType),
    /// A set of candidate asset types, each implicitly keyed `None`.
    AnyAsset(Vec<AssetType>),
    /// An asset-or-set paired with an explicit key-or-key-set.
    Keyed { assets: AssetSpec, keys: KeySpec },
}

#[derive(Debug, Clone)]
pub enum AssetSpec {
    One(AssetType),
    Set(Vec<AssetType>),
}

#[derive(Debug, Clone)]
pub enum KeySpec {
    One(Key),
    Set(Vec<Key>),
}

impl ContractSpec {
    pub fn asset<A: crate::asset::Asset + 'static>() -> Self {
        ContractSpec::Asset(AssetType::of::<A>())
    }

    pub fn keyed<A: crate::asset::Asset + 'static>(key: impl Into<String>) -> Self {
        ContractSpec::Keyed {
            assets: AssetSpec::One(AssetType::of::<A>()),
            keys: KeySpec::One(Some(key.into())),
        }
    }
}

/// A full context spec for one recipe registration: either a single
/// position (expanding to single-element paths) or an explicit sequence
/// (a path).
#[derive(Debug, Clone)]
pub enum ContextSpec {
    Single(ContractSpec),
    Path(Vec<ContractSpec>),
    /// The empty path — matches everywhere with near-zero weight. Default.
    Empty,
}

impl Default for ContextSpec {
    fn default() -> Self {
        ContextSpec::Empty
    }
}

fn expand_assets(spec: &AssetSpec) -> Result<Vec<AssetType>> {
    match spec {
        AssetSpec::One(a) => Ok(vec![*a]),
        AssetSpec::Set(v) => {
            if v.is_empty() {
                return Err(PlannerError::BadContractSpec(
                    "asset set must not be empty".into(),
                ));
            }
            Ok(v.clone())
        }
    }
}

fn expand_keys(spec: &KeySpec) -> Result<Vec<Key>> {
    match spec {
        KeySpec::One(k) => Ok(vec![k.clone()]),
        KeySpec::Set(v) => {
            if v.is_empty() {
                return Err(PlannerError::BadContractSpec(
                    "key set must not be empty".into(),
                ));
            }
            Ok(v.clone())
        }
    }
}

/// Expand one [`ContractSpec`] position into the set of concrete contracts
/// it denotes.
pub fn resolve_contract_spec(spec: &ContractSpec) -> Result<HashSet<Contract>> {
    let mut out = HashSet::new();
    match spec {
        ContractSpec::Asset(a) => {
            out.insert(Contract::unkeyed(*a));
        }
        ContractSpec::AnyAsset(assets) => {
            if assets.is_empty() {
                return Err(PlannerError::BadContractSpec(
                    "asset set must not be empty".into(),
                ));
            }
            for a in assets {
                out.insert(Contract::unkeyed(*a));
            }
        }
        ContractSpec::Keyed { assets, keys } => {
            for a in expand_assets(assets)? {
                for k in expand_keys(keys)? {
                    out.insert(Contract::new(a, k.clone()));
                }
            }
        }
    }
    Ok(out)
}

/// Expand a full [`ContextSpec`] into the set-product of concrete
/// [`ContextPath`]s it denotes (spec.md §4.1).
pub fn resolve_context_spec(spec: &ContextSpec) -> Result<HashSet<ContextPath>> {
    match spec {
        ContextSpec::Empty => Ok(HashSet::from([Vec::new()])),
        ContextSpec::Single(cs) => Ok(resolve_contract_spec(cs)?
            .into_iter()
            .map(|c| vec![c])
            .collect()),
        ContextSpec::Path(parts) => {
            let mut paths: Vec<ContextPath> = vec![Vec::new()];
            for part in parts {
                let options: Vec<Contract> = resolve_contract_spec(part)?.into_iter().collect();
                let mut next = Vec::with_capacity(paths.len() * options.len().max(1));
                for p in &paths {
                    for o in &options {
                        let mut extended = p.clone();
                        extended.push(o.clone());
                        next.push(extended);
                    }
                }
                paths = next;
            }
            Ok(paths.into_iter().collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::DataAsset;

    #[derive(Debug)]
    struct A;
    #[derive(Debug)]
    struct B;

    fn ty_a() -> AssetType {
        AssetType::of::<DataAsset<A>>()
    }
    fn ty_b() -> AssetType {
        AssetType::of::<DataAsset<B>>()
    }

    #[test]
    fn empty_context_spec_expands_to_one_empty_path() {
        let paths = resolve_context_spec(&ContextSpec::Empty).unwrap();
        assert_eq!(paths, HashSet::from([Vec::new()]));
    }

    #[test]
    fn single_asset_expands_to_one_single_element_path() {
        let paths = resolve_context_spec(&ContextSpec::Single(ContractSpec::Asset(ty_a()))).unwrap();
        assert_eq!(paths, HashSet::from([vec![Contract::unkeyed(ty_a())]]));
    }

    #[test]
    fn any_asset_expands_to_one_path_per_candidate() {
        let spec = ContractSpec::AnyAsset(vec![ty_a(), ty_b()]);
        let paths = resolve_contract_spec(&spec).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths.contains(&Contract::unkeyed(ty_a())));
        assert!(paths.contains(&Contract::unkeyed(ty_b())));
    }

    #[test]
    fn empty_asset_set_is_rejected() {
        let spec = ContractSpec::AnyAsset(Vec::new());
        assert!(matches!(
            resolve_contract_spec(&spec),
            Err(PlannerError::BadContractSpec(_))
        ));
    }

    #[test]
    fn empty_key_set_is_rejected() {
        let spec = ContractSpec::Keyed {
            assets: AssetSpec::One(ty_a()),
            keys: KeySpec::Set(Vec::new()),
        };
        assert!(matches!(
            resolve_contract_spec(&spec),
            Err(PlannerError::BadContractSpec(_))
        ));
    }

    #[test]
    fn path_spec_is_the_set_product_of_its_positions() {
        let spec = ContextSpec::Path(vec![
            ContractSpec::AnyAsset(vec![ty_a(), ty_b()]),
            ContractSpec::Asset(ty_a()),
        ]);
        let paths = resolve_context_spec(&spec).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths.contains(&vec![Contract::unkeyed(ty_a()), Contract::unkeyed(ty_a())]));
        assert!(paths.contains(&vec![Contract::unkeyed(ty_b()), Contract::unkeyed(ty_a())]));
    }

    #[test]
    fn keyed_helper_builds_a_single_keyed_contract() {
        let spec = ContractSpec::keyed::<DataAsset<A>>("k");
        let paths = resolve_contract_spec(&spec).unwrap();
        assert_eq!(paths, HashSet::from([Contract::new(ty_a(), Some("k".into()))]));
    }
}
