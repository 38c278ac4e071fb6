// tests/common/mod.rs

//! Shared scaffolding for the integration tests: a single reusable
//! [`Recipe`] impl that logs `build:<name>`/`release:<name>` to a shared
//! log instead of doing real work, so scenarios can assert on build and
//! release order without reaching into the plan graph itself.

use std::path::Path;
use std::sync::{Arc, Mutex};

use recipe_graph::{AssetType, BuildInputs, Contract, DataAsset, Dependency, Key, MakeResult, Recipe};

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

/// The one payload type every test recipe below produces, distinguished
/// only by [`Key`] — so a contract here is exactly `(Marker, key)`.
#[derive(Debug, Clone)]
pub struct Marker(pub String);

pub fn marker_type() -> AssetType {
    AssetType::of::<DataAsset<Marker>>()
}

/// A contract asking for the marker asset keyed `name`.
pub fn contract(name: &str) -> Contract {
    Contract::new(marker_type(), Some(name.to_string()))
}

/// A dependency bound to field `field`, asking for the marker asset keyed
/// `name`.
pub fn dep(field: &str, name: &str) -> Dependency {
    Dependency::new(field, contract(name))
}

pub fn key(name: &str) -> Key {
    Some(name.to_string())
}

/// A recipe that logs its own build/release, builds a `Marker` named
/// `name`, and declares `deps` as its dependency list.
#[derive(Debug)]
pub struct LoggingRecipe {
    name: String,
    deps: Vec<Dependency>,
    log: Log,
    fails: bool,
}

impl LoggingRecipe {
    pub fn new(name: &str, deps: Vec<Dependency>, log: &Log) -> Arc<dyn Recipe> {
        Arc::new(LoggingRecipe {
            name: name.to_string(),
            deps,
            log: log.clone(),
            fails: false,
        })
    }

    /// A recipe whose `build()` always fails, after logging nothing (the
    /// failure happens before any asset is produced).
    pub fn failing(name: &str, deps: Vec<Dependency>, log: &Log) -> Arc<dyn Recipe> {
        Arc::new(LoggingRecipe {
            name: name.to_string(),
            deps,
            log: log.clone(),
            fails: true,
        })
    }
}

impl Recipe for LoggingRecipe {
    fn produces(&self) -> AssetType {
        marker_type()
    }

    fn dependencies(&self) -> Vec<Dependency> {
        self.deps.clone()
    }

    fn build(
        &self,
        _workdir: &Path,
        _inputs: &BuildInputs,
    ) -> Result<MakeResult, Box<dyn std::error::Error + Send + Sync>> {
        if self.fails {
            return Err(format!("{} refuses to build", self.name).into());
        }

        self.log.lock().unwrap().push(format!("build:{}", self.name));
        let name = self.name.clone();
        let log = self.log.clone();
        Ok(MakeResult::scoped(DataAsset::new(Marker(name.clone())), move || {
            log.lock().unwrap().push(format!("release:{name}"));
            Ok(())
        }))
    }
}
