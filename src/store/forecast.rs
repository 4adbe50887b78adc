//! CSV persistence for the forecast table and its pairing metadata
//!
//! `forecast.csv` holds `Date,Forecast,Lower CI,Upper CI` rows. `forecast.meta.json`
//! records which series snapshot and horizon produced it; older data directories may
//! lack the sidecar, which is not an error.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{ArtifactStore, StoreError};
use crate::data::{ForecastPoint, ForecastTable, Series};

/// File name of the forecast artifact
pub const FORECAST_FILE: &str = "forecast.csv";

/// File name of the forecast pairing sidecar
pub const FORECAST_META_FILE: &str = "forecast.meta.json";

#[derive(Debug, Serialize, Deserialize)]
struct ForecastRow {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Forecast")]
    forecast: f64,
    #[serde(rename = "Lower CI")]
    lower: f64,
    #[serde(rename = "Upper CI")]
    upper: f64,
}

/// Identifies the series snapshot and horizon a persisted forecast was computed from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastMeta {
    /// Fingerprint of the source series
    pub series_fingerprint: String,
    /// Requested horizon in months
    pub horizon: usize,
    /// When the forecast was generated
    pub generated_at: DateTime<Utc>,
}

impl ForecastMeta {
    pub fn for_series(series: &Series, horizon: usize) -> Self {
        Self {
            series_fingerprint: series.fingerprint(),
            horizon,
            generated_at: Utc::now(),
        }
    }

    /// Whether this metadata describes a forecast of `series` over `horizon` months
    pub fn matches(&self, series: &Series, horizon: usize) -> bool {
        self.horizon == horizon && self.series_fingerprint == series.fingerprint()
    }
}

/// Reads and replaces the persisted forecast
#[derive(Debug, Clone)]
pub struct ForecastStore {
    artifacts: ArtifactStore,
}

impl ForecastStore {
    pub fn new(artifacts: ArtifactStore) -> Self {
        Self { artifacts }
    }

    /// Loads the persisted forecast table
    ///
    /// Same contract as [`super::SeriesStore::load`]: missing or row-less artifacts are
    /// `Ok(None)`, unparseable or unordered ones are `StoreError::Corrupt`.
    pub fn load(&self) -> Result<Option<ForecastTable>, StoreError> {
        let Some(content) = self.artifacts.read_to_string(FORECAST_FILE)? else {
            return Ok(None);
        };
        let corrupt = |reason: String| StoreError::Corrupt {
            path: self.artifacts.path(FORECAST_FILE),
            reason,
        };

        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let mut points: Vec<ForecastPoint> = Vec::new();
        for row in reader.deserialize::<ForecastRow>() {
            let row = row.map_err(|e| corrupt(e.to_string()))?;
            if let Some(prev) = points.last() {
                if prev.date >= row.date {
                    return Err(corrupt(format!(
                        "dates not strictly increasing at row {}",
                        points.len() + 1
                    )));
                }
            }
            points.push(ForecastPoint {
                date: row.date,
                forecast: row.forecast,
                lower: row.lower,
                upper: row.upper,
            });
        }

        if points.is_empty() {
            return Ok(None);
        }
        Ok(Some(ForecastTable::new(points)))
    }

    /// Loads the pairing sidecar, if one was written
    pub fn load_meta(&self) -> Result<Option<ForecastMeta>, StoreError> {
        self.artifacts.read_json(FORECAST_META_FILE)
    }

    /// Replaces the persisted forecast, then its sidecar
    ///
    /// The table is committed before the sidecar. If the second write fails, the old
    /// sidecar no longer matches the new table's source series and the pair is rejected
    /// on the next load instead of being trusted.
    pub fn save(&self, table: &ForecastTable, meta: &ForecastMeta) -> Result<(), StoreError> {
        let unwritable = |reason: String| StoreError::Unwritable {
            path: self.artifacts.path(FORECAST_FILE),
            reason,
        };

        let mut writer = csv::Writer::from_writer(Vec::new());
        for point in table.points() {
            writer
                .serialize(ForecastRow {
                    date: point.date,
                    forecast: point.forecast,
                    lower: point.lower,
                    upper: point.upper,
                })
                .map_err(|e| unwritable(e.to_string()))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| unwritable(e.to_string()))?;

        self.artifacts.write_atomic(FORECAST_FILE, &bytes)?;
        self.artifacts.write_json(FORECAST_META_FILE, meta)
    }
}
