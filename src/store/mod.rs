//! Persistence for the CPI series, its forecast and the unattended runner's ledger
//!
//! Every artifact lives as a flat file in one data directory. Reads report a missing
//! file as `Ok(None)`; writes replace files atomically so a reader never observes a
//! half-written artifact.

mod forecast;
mod ledger;
mod manager;
mod series;

pub use forecast::{ForecastMeta, ForecastStore, FORECAST_FILE, FORECAST_META_FILE};
pub use ledger::{RunLedger, LEDGER_FILE};
pub use manager::ArtifactStore;
pub use series::{SeriesStore, SERIES_FILE};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when reading or writing artifacts
#[derive(Debug, Error)]
pub enum StoreError {
    /// The artifact exists but cannot be read or parsed
    #[error("Corrupt artifact {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// The artifact could not be written
    #[error("Cannot write artifact {}: {reason}", path.display())]
    Unwritable { path: PathBuf, reason: String },
}

/// The three stores sharing one data directory
#[derive(Debug, Clone)]
pub struct Stores {
    pub series: SeriesStore,
    pub forecast: ForecastStore,
    pub ledger: RunLedger,
}

impl Stores {
    pub fn new(artifacts: ArtifactStore) -> Self {
        Self {
            series: SeriesStore::new(artifacts.clone()),
            forecast: ForecastStore::new(artifacts.clone()),
            ledger: RunLedger::new(artifacts),
        }
    }

    /// Stores rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self::new(ArtifactStore::with_dir(dir.into()))
    }
}
