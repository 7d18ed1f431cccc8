//! Groundwork deployment CLI.
//!
//! Loads a stack configuration, declares the deployment against the
//! in-memory engine, resolves it, and reports the exported outputs —
//! a full preview of what the deployment produces, including the
//! generated bootstrap script's inputs, without touching a cloud account.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use groundwork_engine::SimulatedCloud;
use groundwork_provision::{StackConfig, deploy};

#[derive(Debug, Parser)]
#[command(name = "groundwork", version, about = "Declare and preview a Groundwork deployment")]
struct Cli {
    /// Path to the stack configuration file.
    #[arg(long, default_value = "groundwork.yaml")]
    config: PathBuf,

    /// Emit the exported outputs as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = StackConfig::from_yaml(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    let cloud = SimulatedCloud::new();
    deploy(&cloud, &config).context("declaring deployment")?;
    cloud.verify_order().context("checking declaration order")?;
    cloud.run().await.context("resolving deployment")?;

    let outputs = cloud.resolved_exports().await;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outputs)?);
    } else {
        for (name, value) in &outputs {
            let rendered = value.as_str().map_or_else(|| value.to_string(), str::to_string);
            println!("{name:24} {rendered}");
        }
    }
    Ok(())
}
