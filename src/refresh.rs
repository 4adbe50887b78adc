//! Refresh orchestration
//!
//! Decides, per call, whether the CPI series and its forecast come from the data
//! directory or from the collaborators, and never lets a failure in either escape:
//! every problem becomes a [`RefreshError`] recorded next to whatever partial result
//! exists.
//!
//! Two entry points share the collaborators:
//! - [`Orchestrator::obtain`]: the read path used by the dashboard. It never writes.
//! - [`run_update`]: the unattended joint refresh. It is the only writer of artifacts.

use chrono::Utc;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

use crate::data::{CpiSource, DataSource, ForecastTable, Series};
use crate::forecast::{Forecaster, LazyModel};
use crate::store::{ForecastMeta, StoreError, Stores};

/// Recoverable problems met while obtaining or refreshing data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// The fetch collaborator failed
    #[error("CPI source unavailable: {0}")]
    SourceUnavailable(String),

    /// The fetch succeeded but returned zero rows
    #[error("CPI source returned no rows")]
    EmptyUpstream,

    /// The forecasting model failed to initialize, failed, or returned malformed output
    #[error("Forecast model unavailable: {0}")]
    ModelUnavailable(String),

    /// A persisted artifact could not be read or parsed
    #[error("Stored data unreadable: {0}")]
    StoreCorrupt(String),

    /// A persisted artifact could not be written
    #[error("Stored data not written: {0}")]
    StoreUnwritable(String),
}

impl From<StoreError> for RefreshError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Corrupt { .. } => RefreshError::StoreCorrupt(err.to_string()),
            StoreError::Unwritable { .. } => RefreshError::StoreUnwritable(err.to_string()),
        }
    }
}

/// What a caller can render from a [`Snapshot`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No historical series after trying the cache and the source
    NoData,
    /// Historical series without a forecast
    HistoryOnly,
    /// Historical series and its forecast
    Complete,
}

/// Result of [`Orchestrator::obtain`]
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Historical series; empty when nothing could be obtained
    pub series: Series,
    /// Forecast of `series`; empty when unavailable
    pub forecast: ForecastTable,
    /// Where `series` came from
    pub source: DataSource,
    /// Where `forecast` came from: `Cached` if reused, `Live` if generated in this call
    pub forecast_source: Option<DataSource>,
    /// Recoverable problems met along the way
    pub issues: Vec<RefreshError>,
}

impl Snapshot {
    pub fn outcome(&self) -> Outcome {
        if self.series.is_empty() {
            Outcome::NoData
        } else if self.forecast.is_empty() {
            Outcome::HistoryOnly
        } else {
            Outcome::Complete
        }
    }
}

/// Cache-vs-live decisions for the series and its forecast
pub struct Orchestrator<'a, S, M> {
    source: &'a S,
    model: &'a LazyModel<M>,
    stores: &'a Stores,
}

impl<'a, S: CpiSource, M: Forecaster> Orchestrator<'a, S, M> {
    pub fn new(source: &'a S, model: &'a LazyModel<M>, stores: &'a Stores) -> Self {
        Self {
            source,
            model,
            stores,
        }
    }

    /// Obtains the series and a `horizon`-month forecast
    ///
    /// # Behavior
    /// - Serves the stored series if one loads, otherwise fetches live
    /// - A live series is not written back
    /// - Reuses the stored forecast only next to a stored series, and only if it is a
    ///   well-formed `horizon`-month continuation of that series whose sidecar (when
    ///   present) carries the same fingerprint
    /// - Otherwise generates a forecast; failure leaves the forecast empty
    /// - An empty series short-circuits: no forecast is attempted
    pub async fn obtain(&self, horizon: usize) -> Snapshot {
        let mut issues = Vec::new();

        let (series, source) = match self.stores.series.load() {
            Ok(Some(series)) => {
                tracing::info!(rows = series.len(), "serving cached series");
                (series, DataSource::Cached)
            }
            Ok(None) => {
                tracing::info!("no cached series; fetching live");
                (self.fetch_live(&mut issues).await, DataSource::Live)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load cached series; fetching live");
                issues.push(e.into());
                (self.fetch_live(&mut issues).await, DataSource::Live)
            }
        };

        if series.is_empty() {
            return Snapshot {
                series,
                forecast: ForecastTable::empty(),
                source,
                forecast_source: None,
                issues,
            };
        }

        let (forecast, forecast_source) =
            match self.cached_forecast(&series, source, horizon, &mut issues) {
                Some(table) => (table, Some(DataSource::Cached)),
                None => match generate_forecast(self.model, &series, horizon) {
                    Ok(table) => (table, Some(DataSource::Live)),
                    Err(e) => {
                        tracing::warn!(error = %e, "forecast unavailable; serving history only");
                        issues.push(e);
                        (ForecastTable::empty(), None)
                    }
                },
            };

        Snapshot {
            series,
            forecast,
            source,
            forecast_source,
            issues,
        }
    }

    async fn fetch_live(&self, issues: &mut Vec<RefreshError>) -> Series {
        match fetch_series(self.source).await {
            Ok(series) => series,
            Err(e) => {
                tracing::warn!(error = %e, "live fetch failed");
                issues.push(e);
                Series::empty()
            }
        }
    }

    /// Returns the stored forecast if it may be served next to `series`
    fn cached_forecast(
        &self,
        series: &Series,
        source: DataSource,
        horizon: usize,
        issues: &mut Vec<RefreshError>,
    ) -> Option<ForecastTable> {
        if source != DataSource::Cached {
            tracing::debug!("series fetched live; stored forecast not eligible");
            return None;
        }

        let table = match self.stores.forecast.load() {
            Ok(Some(table)) => table,
            Ok(None) => {
                tracing::info!("no cached forecast");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load cached forecast");
                issues.push(e.into());
                return None;
            }
        };

        match self.stores.forecast.load_meta() {
            Ok(Some(meta)) if !meta.matches(series, horizon) => {
                tracing::info!("cached forecast was computed from a different series; regenerating");
                return None;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "failed to load forecast metadata");
                issues.push(e.into());
                return None;
            }
        }

        if let Err(reason) = table.validate_against(series, horizon) {
            tracing::info!(%reason, "cached forecast does not continue the cached series; regenerating");
            return None;
        }

        tracing::info!(rows = table.len(), "serving cached forecast");
        Some(table)
    }
}

/// Outcome of one unattended joint refresh
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Rows in the fetched series
    pub series_rows: usize,
    /// Whether the fetched series replaced the stored one
    pub series_committed: bool,
    /// Rows in the generated forecast
    pub forecast_rows: usize,
    /// Whether the forecast replaced the stored one
    pub forecast_committed: bool,
    /// Recoverable problems met along the way
    pub issues: Vec<RefreshError>,
}

impl RunReport {
    /// A run succeeds when it persisted a fresh historical series.
    ///
    /// Forecast failures alone do not fail the run.
    pub fn succeeded(&self) -> bool {
        self.series_committed
    }
}

/// Fetches, persists, forecasts and persists again
///
/// The forecast is only generated and written after the series commit succeeded, so a
/// new forecast is never stored next to an old series. The run ledger is stamped once
/// the series is committed.
pub async fn run_update<S: CpiSource, M: Forecaster>(
    source: &S,
    model: &LazyModel<M>,
    stores: &Stores,
    horizon: usize,
) -> RunReport {
    let mut report = RunReport::default();
    tracing::info!("starting update");

    let series = match fetch_series(source).await {
        Ok(series) => series,
        Err(e) => {
            tracing::error!(error = %e, "update aborted: no series fetched");
            report.issues.push(e);
            return report;
        }
    };
    report.series_rows = series.len();

    if let Err(e) = stores.series.save(&series) {
        tracing::error!(error = %e, "update aborted: series not saved");
        report.issues.push(e.into());
        return report;
    }
    report.series_committed = true;
    tracing::info!(rows = series.len(), "saved CPI series");

    if let Err(e) = stores.ledger.record_success(Utc::now()) {
        tracing::warn!(error = %e, "failed to record run timestamp");
        report.issues.push(e.into());
    }

    let table = match generate_forecast(model, &series, horizon) {
        Ok(table) => table,
        Err(e) => {
            tracing::error!(error = %e, "forecast generation failed");
            report.issues.push(e);
            return report;
        }
    };
    report.forecast_rows = table.len();

    let meta = ForecastMeta::for_series(&series, horizon);
    match stores.forecast.save(&table, &meta) {
        Ok(()) => {
            report.forecast_committed = true;
            tracing::info!(rows = table.len(), "saved forecast");
        }
        Err(e) => {
            tracing::error!(error = %e, "forecast not saved");
            report.issues.push(e.into());
        }
    }

    report
}

async fn fetch_series<S: CpiSource>(source: &S) -> Result<Series, RefreshError> {
    let series = source
        .fetch()
        .await
        .map_err(|e| RefreshError::SourceUnavailable(e.to_string()))?;
    if series.is_empty() {
        return Err(RefreshError::EmptyUpstream);
    }
    Ok(series)
}

thread_local! {
    static FORECAST_RUNNING: Cell<bool> = const { Cell::new(false) };
}

/// Whether the current thread is inside a model call whose panics are contained.
///
/// Panic hooks run before `catch_unwind` regains control, so a process-wide hook
/// (such as one restoring the terminal) must check this and stay out of the way.
pub fn forecast_in_progress() -> bool {
    FORECAST_RUNNING.with(Cell::get)
}

/// Marks the current thread as running the model until dropped
struct ForecastGuard;

impl ForecastGuard {
    fn enter() -> Self {
        FORECAST_RUNNING.with(|running| running.set(true));
        ForecastGuard
    }
}

impl Drop for ForecastGuard {
    fn drop(&mut self) {
        FORECAST_RUNNING.with(|running| running.set(false));
    }
}

/// Runs the model and checks its output against `series` and `horizon`.
///
/// A panic inside the model is contained and reported like any other model failure.
fn generate_forecast<M: Forecaster>(
    model: &LazyModel<M>,
    series: &Series,
    horizon: usize,
) -> Result<ForecastTable, RefreshError> {
    let model = model
        .get()
        .map_err(|e| RefreshError::ModelUnavailable(e.to_string()))?;

    tracing::info!(horizon, rows = series.len(), "generating forecast");
    let outcome = {
        let _guard = ForecastGuard::enter();
        panic::catch_unwind(AssertUnwindSafe(|| model.forecast(series, horizon)))
    };
    let table = outcome
        .map_err(|_| RefreshError::ModelUnavailable("model panicked during forecast".to_string()))?
        .map_err(|e| RefreshError::ModelUnavailable(e.to_string()))?;

    table
        .validate_against(series, horizon)
        .map_err(|reason| RefreshError::ModelUnavailable(format!("malformed forecast: {}", reason)))?;

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{flat_forecast, monthly_series};
    use crate::data::SourceError;
    use crate::forecast::ModelError;
    use crate::store::{FORECAST_FILE, FORECAST_META_FILE, SERIES_FILE};
    use std::fs;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    const HORIZON: usize = 120;

    enum SourceMode {
        Rows(Series),
        Empty,
        Fail,
    }

    struct StubSource {
        mode: SourceMode,
        calls: Cell<usize>,
    }

    impl StubSource {
        fn new(mode: SourceMode) -> Self {
            Self {
                mode,
                calls: Cell::new(0),
            }
        }
    }

    impl CpiSource for StubSource {
        async fn fetch(&self) -> Result<Series, SourceError> {
            self.calls.set(self.calls.get() + 1);
            match &self.mode {
                SourceMode::Rows(series) => Ok(series.clone()),
                SourceMode::Empty => Ok(Series::empty()),
                SourceMode::Fail => Err(SourceError::TableNotFound),
            }
        }
    }

    #[derive(Clone, Copy)]
    enum ModelMode {
        Flat,
        Fail,
        Panic,
        WrongLength,
    }

    struct StubModel {
        mode: ModelMode,
        calls: Cell<usize>,
    }

    impl StubModel {
        fn new(mode: ModelMode) -> Self {
            Self {
                mode,
                calls: Cell::new(0),
            }
        }
    }

    impl Forecaster for StubModel {
        fn forecast(&self, series: &Series, horizon: usize) -> Result<ForecastTable, ModelError> {
            self.calls.set(self.calls.get() + 1);
            match self.mode {
                ModelMode::Flat => Ok(flat_forecast(series, horizon)),
                ModelMode::Fail => Err(ModelError::FitFailed("singular".to_string())),
                ModelMode::Panic => panic!("tensor shape mismatch"),
                ModelMode::WrongLength => Ok(flat_forecast(series, horizon / 2)),
            }
        }
    }

    fn setup() -> (Stores, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let stores = Stores::open(temp_dir.path());
        (stores, temp_dir)
    }

    fn model_calls(model: &LazyModel<StubModel>) -> usize {
        model.get().map(|m| m.calls.get()).unwrap_or(0)
    }

    fn persist_pair(stores: &Stores, series: &Series) -> ForecastTable {
        let table = flat_forecast(series, HORIZON);
        stores.series.save(series).unwrap();
        stores
            .forecast
            .save(&table, &ForecastMeta::for_series(series, HORIZON))
            .unwrap();
        table
    }

    #[tokio::test]
    async fn test_cached_series_reuses_cached_forecast() {
        let (stores, _dir) = setup();
        let series = monthly_series(60);
        let table = persist_pair(&stores, &series);
        let source = StubSource::new(SourceMode::Fail);
        let model = LazyModel::new(|| Ok(StubModel::new(ModelMode::Flat)));

        let snapshot = Orchestrator::new(&source, &model, &stores).obtain(HORIZON).await;

        assert_eq!(snapshot.source, DataSource::Cached);
        assert_eq!(snapshot.forecast_source, Some(DataSource::Cached));
        assert_eq!(snapshot.series, series);
        assert_eq!(snapshot.forecast, table);
        assert_eq!(snapshot.outcome(), Outcome::Complete);
        assert!(snapshot.issues.is_empty());
        assert_eq!(source.calls.get(), 0, "Cached path must not fetch");
        assert!(!model.is_initialized(), "Model should never be built on a full cache hit");
    }

    #[tokio::test]
    async fn test_live_series_regenerates_even_with_forecast_on_disk() {
        let (stores, _dir) = setup();
        let old_series = monthly_series(60);
        let table = flat_forecast(&old_series, HORIZON);
        stores
            .forecast
            .save(&table, &ForecastMeta::for_series(&old_series, HORIZON))
            .unwrap();
        let source = StubSource::new(SourceMode::Rows(old_series.clone()));
        let model = LazyModel::ready(StubModel::new(ModelMode::Flat));

        let snapshot = Orchestrator::new(&source, &model, &stores).obtain(HORIZON).await;

        assert_eq!(snapshot.source, DataSource::Live);
        assert_eq!(snapshot.forecast_source, Some(DataSource::Live));
        assert_eq!(model_calls(&model), 1);
        assert_eq!(snapshot.forecast.len(), HORIZON);
    }

    #[tokio::test]
    async fn test_live_series_is_not_written_back() {
        let (stores, dir) = setup();
        let source = StubSource::new(SourceMode::Rows(monthly_series(24)));
        let model = LazyModel::ready(StubModel::new(ModelMode::Flat));

        let snapshot = Orchestrator::new(&source, &model, &stores).obtain(HORIZON).await;

        assert_eq!(snapshot.outcome(), Outcome::Complete);
        assert!(!dir.path().join(SERIES_FILE).exists());
        assert!(!dir.path().join(FORECAST_FILE).exists());
        assert!(stores.series.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cached_series_without_forecast_regenerates() {
        let (stores, _dir) = setup();
        let series = monthly_series(36);
        stores.series.save(&series).unwrap();
        let source = StubSource::new(SourceMode::Fail);
        let model = LazyModel::ready(StubModel::new(ModelMode::Flat));

        let snapshot = Orchestrator::new(&source, &model, &stores).obtain(HORIZON).await;

        assert_eq!(snapshot.source, DataSource::Cached);
        assert_eq!(snapshot.forecast_source, Some(DataSource::Live));
        assert_eq!(model_calls(&model), 1);
        assert_eq!(source.calls.get(), 0);
    }

    #[tokio::test]
    async fn test_fingerprint_mismatch_regenerates() {
        let (stores, _dir) = setup();
        let series = monthly_series(36);
        stores.series.save(&series).unwrap();
        // Forecast paired with a different snapshot that happens to end on the same month
        let mut other = series.points().to_vec();
        other[0].value += 1.0;
        let other = Series::from_ordered(other).unwrap();
        stores
            .forecast
            .save(
                &flat_forecast(&other, HORIZON),
                &ForecastMeta::for_series(&other, HORIZON),
            )
            .unwrap();
        let source = StubSource::new(SourceMode::Fail);
        let model = LazyModel::ready(StubModel::new(ModelMode::Flat));

        let snapshot = Orchestrator::new(&source, &model, &stores).obtain(HORIZON).await;

        assert_eq!(snapshot.forecast_source, Some(DataSource::Live));
        assert_eq!(snapshot.forecast, flat_forecast(&series, HORIZON));
        assert_eq!(model_calls(&model), 1);
    }

    #[tokio::test]
    async fn test_forecast_without_sidecar_is_reused_when_it_continues_series() {
        let (stores, dir) = setup();
        let series = monthly_series(36);
        persist_pair(&stores, &series);
        fs::remove_file(dir.path().join(FORECAST_META_FILE)).unwrap();
        let source = StubSource::new(SourceMode::Fail);
        let model = LazyModel::ready(StubModel::new(ModelMode::Flat));

        let snapshot = Orchestrator::new(&source, &model, &stores).obtain(HORIZON).await;

        assert_eq!(snapshot.forecast_source, Some(DataSource::Cached));
        assert_eq!(model_calls(&model), 0);
    }

    #[tokio::test]
    async fn test_cached_forecast_with_other_horizon_regenerates() {
        let (stores, _dir) = setup();
        let series = monthly_series(36);
        persist_pair(&stores, &series);
        let source = StubSource::new(SourceMode::Fail);
        let model = LazyModel::ready(StubModel::new(ModelMode::Flat));

        let snapshot = Orchestrator::new(&source, &model, &stores).obtain(12).await;

        assert_eq!(snapshot.forecast.len(), 12);
        assert_eq!(snapshot.forecast_source, Some(DataSource::Live));
    }

    #[tokio::test]
    async fn test_model_failure_degrades_to_history_only() {
        for mode in [ModelMode::Fail, ModelMode::Panic, ModelMode::WrongLength] {
            let (stores, _dir) = setup();
            let series = monthly_series(48);
            stores.series.save(&series).unwrap();
            let source = StubSource::new(SourceMode::Fail);
            let model = LazyModel::ready(StubModel::new(mode));

            let snapshot = Orchestrator::new(&source, &model, &stores).obtain(HORIZON).await;

            assert_eq!(snapshot.series, series, "History must be served unchanged");
            assert!(snapshot.forecast.is_empty());
            assert_eq!(snapshot.forecast_source, None);
            assert_eq!(snapshot.outcome(), Outcome::HistoryOnly);
            assert!(matches!(
                snapshot.issues.as_slice(),
                [RefreshError::ModelUnavailable(_)]
            ));
        }
    }

    #[tokio::test]
    async fn test_model_init_failure_is_model_unavailable() {
        let (stores, _dir) = setup();
        let source = StubSource::new(SourceMode::Rows(monthly_series(48)));
        let model: LazyModel<StubModel> =
            LazyModel::new(|| Err(ModelError::Init("checkpoint missing".to_string())));

        let snapshot = Orchestrator::new(&source, &model, &stores).obtain(HORIZON).await;

        assert_eq!(snapshot.outcome(), Outcome::HistoryOnly);
        match snapshot.issues.as_slice() {
            [RefreshError::ModelUnavailable(msg)] => assert!(msg.contains("checkpoint missing")),
            other => panic!("unexpected issues: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_upstream_is_no_data_without_forecast_attempt() {
        let (stores, _dir) = setup();
        let source = StubSource::new(SourceMode::Empty);
        let model = LazyModel::new(|| Ok(StubModel::new(ModelMode::Flat)));

        let snapshot = Orchestrator::new(&source, &model, &stores).obtain(HORIZON).await;

        assert_eq!(snapshot.outcome(), Outcome::NoData);
        assert_eq!(snapshot.issues, vec![RefreshError::EmptyUpstream]);
        assert!(!model.is_initialized(), "No forecast may be attempted");
    }

    #[tokio::test]
    async fn test_source_failure_is_no_data() {
        let (stores, _dir) = setup();
        let source = StubSource::new(SourceMode::Fail);
        let model = LazyModel::new(|| Ok(StubModel::new(ModelMode::Flat)));

        let snapshot = Orchestrator::new(&source, &model, &stores).obtain(HORIZON).await;

        assert_eq!(snapshot.outcome(), Outcome::NoData);
        assert_eq!(snapshot.source, DataSource::Live);
        assert!(matches!(
            snapshot.issues.as_slice(),
            [RefreshError::SourceUnavailable(_)]
        ));
    }

    #[tokio::test]
    async fn test_corrupt_series_falls_back_to_live() {
        let (stores, dir) = setup();
        fs::write(dir.path().join(SERIES_FILE), "Date,CPI_YoY_Change\nnope,nope\n").unwrap();
        let source = StubSource::new(SourceMode::Rows(monthly_series(24)));
        let model = LazyModel::ready(StubModel::new(ModelMode::Flat));

        let snapshot = Orchestrator::new(&source, &model, &stores).obtain(HORIZON).await;

        assert_eq!(snapshot.source, DataSource::Live);
        assert_eq!(snapshot.outcome(), Outcome::Complete);
        assert!(matches!(
            snapshot.issues.as_slice(),
            [RefreshError::StoreCorrupt(_)]
        ));
    }

    #[tokio::test]
    async fn test_run_update_commits_series_then_forecast() {
        let (stores, _dir) = setup();
        let series = monthly_series(72);
        let source = StubSource::new(SourceMode::Rows(series.clone()));
        let model = LazyModel::ready(StubModel::new(ModelMode::Flat));

        let report = run_update(&source, &model, &stores, HORIZON).await;

        assert!(report.succeeded());
        assert!(report.forecast_committed);
        assert_eq!(report.series_rows, 72);
        assert_eq!(report.forecast_rows, HORIZON);
        assert!(report.issues.is_empty());
        assert_eq!(stores.series.load().unwrap(), Some(series.clone()));
        assert_eq!(stores.forecast.load().unwrap().unwrap().len(), HORIZON);
        assert!(stores.forecast.load_meta().unwrap().unwrap().matches(&series, HORIZON));
        assert!(stores.ledger.last_success().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_run_update_then_obtain_serves_both_from_cache() {
        let (stores, _dir) = setup();
        let source = StubSource::new(SourceMode::Rows(monthly_series(72)));
        let writer_model = LazyModel::ready(StubModel::new(ModelMode::Flat));
        run_update(&source, &writer_model, &stores, HORIZON).await;

        let reader_model = LazyModel::new(|| Ok(StubModel::new(ModelMode::Flat)));
        let snapshot = Orchestrator::new(&source, &reader_model, &stores)
            .obtain(HORIZON)
            .await;

        assert_eq!(snapshot.source, DataSource::Cached);
        assert_eq!(snapshot.forecast_source, Some(DataSource::Cached));
        assert_eq!(source.calls.get(), 1, "Only the update should have fetched");
        assert!(!reader_model.is_initialized());
    }

    #[tokio::test]
    async fn test_run_update_forecast_failure_still_succeeds() {
        let (stores, dir) = setup();
        let source = StubSource::new(SourceMode::Rows(monthly_series(72)));
        let model = LazyModel::ready(StubModel::new(ModelMode::Fail));

        let report = run_update(&source, &model, &stores, HORIZON).await;

        assert!(report.succeeded());
        assert!(!report.forecast_committed);
        assert!(dir.path().join(SERIES_FILE).exists());
        assert!(!dir.path().join(FORECAST_FILE).exists());
        assert!(matches!(
            report.issues.as_slice(),
            [RefreshError::ModelUnavailable(_)]
        ));
    }

    #[tokio::test]
    async fn test_run_update_empty_upstream_writes_nothing() {
        let (stores, dir) = setup();
        let source = StubSource::new(SourceMode::Empty);
        let model = LazyModel::ready(StubModel::new(ModelMode::Flat));

        let report = run_update(&source, &model, &stores, HORIZON).await;

        assert!(!report.succeeded());
        assert_eq!(report.issues, vec![RefreshError::EmptyUpstream]);
        assert!(!dir.path().join(SERIES_FILE).exists());
        assert_eq!(model_calls(&model), 0);
    }

    #[tokio::test]
    async fn test_run_update_unwritable_series_skips_forecast() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();
        let stores = Stores::open(blocker.join("data"));
        let source = StubSource::new(SourceMode::Rows(monthly_series(72)));
        let model = LazyModel::ready(StubModel::new(ModelMode::Flat));

        let report = run_update(&source, &model, &stores, HORIZON).await;

        assert!(!report.succeeded());
        assert!(matches!(
            report.issues.as_slice(),
            [RefreshError::StoreUnwritable(_)]
        ));
        assert_eq!(model_calls(&model), 0, "Forecast must wait for the series commit");
    }

    #[test]
    fn test_contained_model_panic_skips_terminal_hook() {
        static RESTORE_HOOK_RAN: AtomicBool = AtomicBool::new(false);

        let previous = panic::take_hook();
        panic::set_hook(Box::new(|_| {
            // Shaped like the dashboard's terminal-restoring hook
            if !forecast_in_progress() {
                RESTORE_HOOK_RAN.store(true, Ordering::SeqCst);
            }
        }));
        let model = LazyModel::ready(StubModel::new(ModelMode::Panic));
        let result = generate_forecast(&model, &monthly_series(24), 12);
        panic::set_hook(previous);

        assert!(matches!(result, Err(RefreshError::ModelUnavailable(_))));
        assert!(
            !RESTORE_HOOK_RAN.load(Ordering::SeqCst),
            "A contained model panic must not restore the terminal"
        );
        assert!(!forecast_in_progress(), "Flag is cleared after the model call");
    }

    #[test]
    fn test_store_errors_map_to_taxonomy() {
        let corrupt = StoreError::Corrupt {
            path: "x".into(),
            reason: "bad".to_string(),
        };
        let unwritable = StoreError::Unwritable {
            path: "x".into(),
            reason: "ro".to_string(),
        };
        assert!(matches!(
            RefreshError::from(corrupt),
            RefreshError::StoreCorrupt(_)
        ));
        assert!(matches!(
            RefreshError::from(unwritable),
            RefreshError::StoreUnwritable(_)
        ));
    }
}
