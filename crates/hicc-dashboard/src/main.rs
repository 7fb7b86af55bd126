//! HICC - headless dashboard runner.
//!
//! Loads the configuration, builds the manager over an in-memory navigation
//! log, runs one request cycle and prints a summary. With `--watch-secs` it
//! keeps following external state changes for a while.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use hicc_core::{load_config, load_config_from, DashboardConfig, SyncMode};
use hicc_dashboard::{AppError, Dashboard};
use hicc_widget_api::{FixtureTransport, HttpTransport, RequestOutcome, Transport};

#[derive(Parser, Debug)]
#[command(name = "hicc", about = "Headless HICC dashboard")]
struct Args {
    /// Configuration file (default: <config dir>/hicc/hicc.toml)
    #[arg(long, env = "HICC_CONFIG")]
    config: Option<PathBuf>,

    /// Page URL the navigation log starts at; its fragment or query seeds the state
    #[arg(long, default_value = "http://localhost/hicc/")]
    url: String,

    /// Override the configured sync mode (hash, history, none)
    #[arg(long)]
    mode: Option<String>,

    /// Main query
    #[arg(long, short)]
    query: Option<String>,

    /// Facet field to summarize (repeatable)
    #[arg(long = "facet")]
    facets: Vec<String>,

    /// Serve this JSON file instead of contacting the search backend
    #[arg(long)]
    offline: Option<PathBuf>,

    /// Keep watching for external state changes this many seconds
    #[arg(long, default_value_t = 0)]
    watch_secs: u64,
}

fn parse_mode(mode: &str) -> Option<SyncMode> {
    match mode {
        "hash" => Some(SyncMode::Hash),
        "history" => Some(SyncMode::History),
        "none" => Some(SyncMode::None),
        _ => None,
    }
}

fn load(args: &Args) -> Result<DashboardConfig, AppError> {
    let mut config = match &args.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    if let Some(mode) = &args.mode {
        match parse_mode(mode) {
            Some(mode) => config.sync.mode = mode,
            None => tracing::warn!("Unknown sync mode '{}', keeping {:?}", mode, config.sync.mode),
        }
    }
    Ok(config)
}

async fn run(args: Args) -> Result<(), AppError> {
    let config = load(&args)?;

    let transport: Arc<dyn Transport> = match &args.offline {
        Some(path) => {
            tracing::info!("Serving responses from {}", path.display());
            Arc::new(FixtureTransport::from_file(path)?)
        }
        None => Arc::new(HttpTransport::new()),
    };

    let dashboard = Dashboard::new(&config, &args.url, transport, args.facets.clone())?;
    if let Some(q) = &args.query {
        dashboard.set_query(q);
    }

    match dashboard.refresh().await? {
        RequestOutcome::Completed { .. } => {
            if let Some(summary) = dashboard.summary() {
                print!("{}", summary.render());
            }
        }
        RequestOutcome::Failed { error, .. } => eprintln!("Request failed: {error}"),
        other => tracing::debug!("Cycle ended with {:?}", other),
    }

    if args.watch_secs > 0 {
        dashboard
            .watch_for(Duration::from_secs(args.watch_secs))
            .await;
    }
    Ok(())
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("hicc: {e}");
            ExitCode::FAILURE
        }
    }
}
