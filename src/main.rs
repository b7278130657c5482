//! Shopsight CLI
//!
//! Wires config → registry resolve → artifact acquisition → analytics and
//! prints result tables as JSON for the presentation layer to consume.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use shopsight::{
    acquire::Fetcher,
    analytics::{cohorts, marketing, overview, returns},
    config::Config,
    dataset::QueryCache,
    models::LocalArtifact,
    registry::RegistryClient,
};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "shopsight", about = "Ecommerce analytics over a versioned dataset artifact")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve the configured tag and ensure a local artifact copy.
    Fetch,
    /// Compute all reports over the artifact and print them as JSON.
    Report {
        /// Rollup granularity for the returns/quality table.
        #[arg(long, value_enum, default_value = "monthly")]
        granularity: GranularityArg,
        /// Maximum months-since-cohort to include in the retention matrix.
        #[arg(long, default_value_t = 36)]
        horizon: u32,
        /// Trailing window (days) for the overview KPIs.
        #[arg(long, default_value_t = 180)]
        window_days: i64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum GranularityArg {
    Daily,
    Monthly,
}

impl From<GranularityArg> for returns::Granularity {
    fn from(g: GranularityArg) -> Self {
        match g {
            GranularityArg::Daily => returns::Granularity::Daily,
            GranularityArg::Monthly => returns::Granularity::Monthly,
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shopsight=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn acquire_artifact(config: &Config) -> Result<LocalArtifact> {
    let timeout = Duration::from_secs(config.timeout_s);
    let registry =
        RegistryClient::new(&config.registry_url, config.registry_token.as_deref(), timeout)?;

    let reference = registry
        .resolve(&config.tag, &config.asset_name)
        .await
        .with_context(|| format!("resolving tag '{}'", config.tag))?;
    info!(
        "Resolved '{}' -> tag {} asset {}",
        config.tag, reference.tag, reference.asset_name
    );

    let fetcher = Fetcher::new(timeout, config.force_refresh)?;
    let artifact = fetcher
        .ensure_local(&reference, &config.cache_dir)
        .await
        .with_context(|| format!("acquiring asset '{}'", reference.asset_name))?;
    Ok(artifact)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Fetch => {
            let artifact = acquire_artifact(&config).await?;
            println!("{}", serde_json::to_string_pretty(&artifact)?);
        }
        Command::Report {
            granularity,
            horizon,
            window_days,
        } => {
            let artifact = acquire_artifact(&config).await?;
            let cache = QueryCache::new();

            let orders = cache.orders(&artifact)?;
            let spend = cache.spend(&artifact)?;

            let report = serde_json::json!({
                "tag": artifact.tag,
                "overview": overview::compute_overview(&orders, window_days),
                "cohorts": cohorts::compute_cohorts(&orders, horizon),
                "returns": returns::compute_returns(&orders, granularity.into()),
                "marketing_roi": marketing::compute_roi(&orders, &spend),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
