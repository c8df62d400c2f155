//! Trial-site forecaster.
//!
//! Runs one forecasting cycle for the configured trial sites and writes a
//! JSON report per site.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use forecaster::{
    CatalogueSelector, Forecaster, ForecasterConfig, JsonReportSink, LocalJsonSource,
    ObservationFeed,
};
use met_common::ValidTime;

#[derive(Parser, Debug)]
#[command(name = "forecaster")]
#[command(about = "Ensemble threshold probabilities for trial sites")]
struct Args {
    /// Configuration file path (defaults plus FORECASTER_* variables if absent)
    #[arg(short, long, env = "FORECASTER_CONFIG")]
    config: Option<PathBuf>,

    /// Run as if at this time (RFC 3339 or YYYYMMDDTHHMMZ), default now
    #[arg(long)]
    now: Option<String>,

    /// Only this trial site
    #[arg(short, long)]
    site: Option<String>,

    /// Site-forecast feed CSV
    #[arg(long)]
    observations: Option<PathBuf>,

    /// Override the output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting trial-site forecaster");

    let mut config = match &args.config {
        Some(path) => ForecasterConfig::load(path)?,
        None => {
            let config = ForecasterConfig::from_env();
            config
                .validate()
                .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
            config
        }
    };
    if let Some(output) = args.output {
        config.output_dir = output;
    }

    let now = match &args.now {
        Some(s) => ValidTime::parse_datetime(s).with_context(|| format!("Invalid --now {:?}", s))?,
        None => Utc::now(),
    };

    let sites = config.selected_sites(args.site.as_deref());
    if sites.is_empty() {
        anyhow::bail!("No trial sites selected");
    }
    info!(
        sites = ?sites.iter().map(|s| &s.name).collect::<Vec<_>>(),
        input = %config.input_dir.display(),
        output = %config.output_dir.display(),
        "Loaded configuration"
    );

    let source = Arc::new(LocalJsonSource::new(config.input_dir.clone()));
    let selector = Arc::new(CatalogueSelector::new(config.site_catalogue.clone()));
    let sink = Arc::new(JsonReportSink::new(config.output_dir.clone()));

    let mut forecaster = Forecaster::new(config, source, selector, sink);
    if let Some(path) = &args.observations {
        let feed = ObservationFeed::from_path(path)?;
        info!(rows = feed.len(), "Loaded site-forecast feed");
        forecaster = forecaster.with_observations(feed);
    }

    let summary = forecaster.run(now, &sites).await?;
    if summary.sites_reported == 0 {
        anyhow::bail!("No site reports were published");
    }

    Ok(())
}
