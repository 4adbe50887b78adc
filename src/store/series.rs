//! CSV persistence for the historical series
//!
//! Artifact layout: header `Date,CPI_YoY_Change`, one row per month, ascending,
//! ISO-8601 dates. Floats are written in shortest round-trip form so a reload is
//! bit-identical.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{ArtifactStore, StoreError};
use crate::data::{Series, TimeSeriesPoint};

/// File name of the series artifact
pub const SERIES_FILE: &str = "latest_cpi.csv";

#[derive(Debug, Serialize, Deserialize)]
struct SeriesRow {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "CPI_YoY_Change")]
    value: f64,
}

/// Reads and replaces the persisted CPI series
#[derive(Debug, Clone)]
pub struct SeriesStore {
    artifacts: ArtifactStore,
}

impl SeriesStore {
    pub fn new(artifacts: ArtifactStore) -> Self {
        Self { artifacts }
    }

    /// Loads the persisted series
    ///
    /// # Returns
    /// * `Ok(Some(series))` if the artifact exists, parses and holds at least one row
    /// * `Ok(None)` if there is no artifact or it holds no rows
    /// * `Err(StoreError::Corrupt)` if it cannot be parsed or its dates are not strictly increasing
    pub fn load(&self) -> Result<Option<Series>, StoreError> {
        let Some(content) = self.artifacts.read_to_string(SERIES_FILE)? else {
            return Ok(None);
        };
        let corrupt = |reason: String| StoreError::Corrupt {
            path: self.artifacts.path(SERIES_FILE),
            reason,
        };

        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let mut points = Vec::new();
        for row in reader.deserialize::<SeriesRow>() {
            let row = row.map_err(|e| corrupt(e.to_string()))?;
            points.push(TimeSeriesPoint {
                date: row.date,
                value: row.value,
            });
        }

        if points.is_empty() {
            tracing::info!("series artifact holds no rows");
            return Ok(None);
        }

        let series = Series::from_ordered(points)
            .map_err(|row| corrupt(format!("dates not strictly increasing at row {}", row + 1)))?;
        Ok(Some(series))
    }

    /// Replaces the persisted series with `series`
    pub fn save(&self, series: &Series) -> Result<(), StoreError> {
        let unwritable = |reason: String| StoreError::Unwritable {
            path: self.artifacts.path(SERIES_FILE),
            reason,
        };

        let mut writer = csv::Writer::from_writer(Vec::new());
        for point in series.points() {
            writer
                .serialize(SeriesRow {
                    date: point.date,
                    value: point.value,
                })
                .map_err(|e| unwritable(e.to_string()))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| unwritable(e.to_string()))?;

        self.artifacts.write_atomic(SERIES_FILE, &bytes)
    }
}
