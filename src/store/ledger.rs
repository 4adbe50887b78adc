//! Timestamp of the last successful unattended refresh

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ArtifactStore, StoreError};

/// File name of the run ledger
pub const LEDGER_FILE: &str = "last_run.json";

#[derive(Debug, Serialize, Deserialize)]
struct LedgerEntry {
    last_success: DateTime<Utc>,
}

/// Records when the unattended runner last committed a fresh series
#[derive(Debug, Clone)]
pub struct RunLedger {
    artifacts: ArtifactStore,
}

impl RunLedger {
    pub fn new(artifacts: ArtifactStore) -> Self {
        Self { artifacts }
    }

    /// When the last successful run finished, if one was ever recorded
    pub fn last_success(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self
            .artifacts
            .read_json::<LedgerEntry>(LEDGER_FILE)?
            .map(|entry| entry.last_success))
    }

    pub fn record_success(&self, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.artifacts
            .write_json(LEDGER_FILE, &LedgerEntry { last_success: at })
    }
}
