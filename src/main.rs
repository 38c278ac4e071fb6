// src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use recipe_graph::{
    AssetType, Contract, ContextSpec, ContractSpec, DataAsset, MakeResult, Planner, Recipe,
};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// A plain string value, standing in for a built artifact in the demo
/// recipe set below. `DataAsset<Text>` picks up its `Asset` impl from the
/// library's blanket impl over `Send + Sync + Debug` payloads.
#[derive(Debug, Clone)]
struct Text(String);

/// Produces the root asset by combining its `base` dependency.
#[derive(Debug)]
struct RootRecipe;

impl Recipe for RootRecipe {
    fn produces(&self) -> AssetType {
        AssetType::of::<DataAsset<Text>>()
    }

    fn dependencies(&self) -> Vec<recipe_graph::Dependency> {
        vec![recipe_graph::Dependency::new(
            "base",
            Contract::unkeyed(AssetType::of::<DataAsset<Text>>()),
        )]
    }

    fn build(
        &self,
        _workdir: &Path,
        inputs: &recipe_graph::BuildInputs,
    ) -> std::result::Result<MakeResult, Box<dyn std::error::Error + Send + Sync>> {
        let base = inputs
            .get::<DataAsset<Text>>("base")
            .expect("coverage invariant guarantees `base` is bound");
        Ok(MakeResult::plain(DataAsset::new(Text(format!(
            "root({})",
            base.get().0
        )))))
    }
}

/// The default recipe for the shared base asset: no dependencies.
#[derive(Debug)]
struct DefaultBaseRecipe;

impl Recipe for DefaultBaseRecipe {
    fn produces(&self) -> AssetType {
        AssetType::of::<DataAsset<Text>>()
    }

    fn dependencies(&self) -> Vec<recipe_graph::Dependency> {
        Vec::new()
    }

    fn build(
        &self,
        _workdir: &Path,
        _inputs: &recipe_graph::BuildInputs,
    ) -> std::result::Result<MakeResult, Box<dyn std::error::Error + Send + Sync>> {
        Ok(MakeResult::plain(DataAsset::new(Text("default-base".into()))))
    }
}

#[derive(Parser)]
#[command(name = "planner-cli")]
#[command(author, version, about = "Demonstration CLI for recipe-graph", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a small toy recipe set, compile a plan for the root asset,
    /// and print the built value.
    Demo,
}

fn build_demo_planner() -> Result<Planner> {
    let mut planner = Planner::new();
    planner
        .add(Arc::new(RootRecipe), None, ContextSpec::Empty)
        .context("registering root recipe")?;
    planner
        .add(
            Arc::new(DefaultBaseRecipe),
            None,
            ContextSpec::Single(ContractSpec::asset::<DataAsset<Text>>()),
        )
        .context("registering base recipe")?;
    Ok(planner)
}

fn run_demo() -> Result<()> {
    let planner = build_demo_planner()?;
    let plan = planner
        .plan::<DataAsset<Text>>(None, &recipe_graph::PlannerConfig::default())
        .context("compiling plan")?;

    let value = plan
        .run_default(|asset| asset.get().0.clone())
        .context("running plan")?;

    println!("built: {value}");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Demo) | None => {
            info!("running recipe-graph demo plan");
            run_demo()
        }
    }
}
