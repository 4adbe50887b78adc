//! Command-line interface for the unattended refresh runner
//!
//! The runner is meant to be invoked by an external scheduler (cron, systemd timer).
//! It consults the schedule gate and, when due, performs the joint refresh.

use chrono::{Local, NaiveDate};
use clap::Parser;

use crate::data::CpiSource;
use crate::forecast::{Forecaster, LazyModel, DEFAULT_HORIZON};
use crate::refresh::{run_update, RunReport};
use crate::schedule::{decide, Decision, SchedulePolicy};
use crate::store::Stores;

/// Refresh the stored CPI series and forecast when the schedule says so
#[derive(Parser, Debug)]
#[command(name = "cpiwatch-refresh")]
#[command(about = "Fetch the latest CPI series and regenerate the forecast when due")]
#[command(version)]
pub struct RefreshCli {
    /// Ignore the schedule gate and run now
    #[arg(long)]
    pub force: bool,
}

/// What one runner invocation did
#[derive(Debug)]
pub struct GateRun {
    pub decision: Decision,
    /// Present only if the gate opened
    pub report: Option<RunReport>,
}

impl GateRun {
    /// A skipped run, or a run that persisted a fresh series, is a success
    pub fn exit_success(&self) -> bool {
        self.report.as_ref().map_or(true, RunReport::succeeded)
    }
}

/// Consults the gate for `today` and runs the joint refresh if it opens
pub async fn run_scheduled<S: CpiSource, M: Forecaster>(
    force: bool,
    today: NaiveDate,
    policy: SchedulePolicy,
    stores: &Stores,
    source: &S,
    model: &LazyModel<M>,
) -> GateRun {
    let last_success = match stores.ledger.last_success() {
        Ok(last) => last.map(|at| at.with_timezone(&Local).date_naive()),
        Err(e) => {
            tracing::warn!(error = %e, "run ledger unreadable; treating as never run");
            None
        }
    };

    let decision = decide(today, force, last_success, policy);
    if !decision.should_run() {
        tracing::info!(%policy, ?last_success, "skipping refresh: {}", decision.trigger.describe());
        return GateRun {
            decision,
            report: None,
        };
    }

    tracing::info!(%policy, "running refresh: {}", decision.trigger.describe());
    let report = run_update(source, model, stores, DEFAULT_HORIZON).await;
    if report.succeeded() {
        tracing::info!(
            series_rows = report.series_rows,
            forecast_rows = report.forecast_rows,
            forecast_committed = report.forecast_committed,
            "refresh finished"
        );
    } else {
        tracing::error!(issues = ?report.issues, "refresh failed");
    }

    GateRun {
        decision,
        report: Some(report),
    }
}
