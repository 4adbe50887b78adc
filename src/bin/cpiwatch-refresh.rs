//! Unattended refresh runner
//!
//! Intended to be run daily by an external scheduler. Exits non-zero only when the
//! gate opened and no fresh series could be fetched and persisted.

use std::process::ExitCode;

use chrono::Local;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cpiwatch::cli::{run_scheduled, RefreshCli};
use cpiwatch::config::Config;
use cpiwatch::data::TcmbClient;
use cpiwatch::forecast::{ArForecaster, LazyModel};
use cpiwatch::store::Stores;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = RefreshCli::parse();
    init_logging();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(data_dir = %config.data_dir.display(), force = cli.force, "cpiwatch-refresh starting");

    let stores = Stores::open(&config.data_dir);
    let source = match TcmbClient::new(config.source_url.clone(), config.fetch_timeout) {
        Ok(source) => source,
        Err(e) => {
            tracing::error!("cannot build HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let order = config.ar_order;
    let model = LazyModel::new(move || Ok(ArForecaster::with_order(order)));

    let run = run_scheduled(
        cli.force,
        Local::now().date_naive(),
        config.schedule,
        &stores,
        &source,
        &model,
    )
    .await;

    if run.exit_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
