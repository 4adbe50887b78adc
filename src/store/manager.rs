//! Artifact directory for persisting the series, the forecast and run metadata
//!
//! Provides an `ArtifactStore` that reads files from a data directory and replaces them
//! atomically (write to a temporary file in the same directory, then rename).

use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::StoreError;

/// Manages reading and atomically replacing files in the data directory
///
/// The default directory is XDG-compliant (`~/.local/share/cpiwatch/` on Linux). Missing
/// files are reported as `Ok(None)`, never as errors.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    /// Directory where artifacts are stored
    dir: PathBuf,
}

impl ArtifactStore {
    /// Creates a new ArtifactStore using the XDG-compliant data directory
    ///
    /// Returns `None` if the directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "cpiwatch")?;
        let dir = project_dirs.data_dir().to_path_buf();
        Some(Self { dir })
    }

    /// Creates a new ArtifactStore with a custom directory
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path of the artifact named `name`
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Reads an artifact as text
    ///
    /// # Returns
    /// * `Ok(Some(content))` if the file exists and is readable
    /// * `Ok(None)` if the file does not exist
    /// * `Err(StoreError::Corrupt)` if the file exists but cannot be read
    pub fn read_to_string(&self, name: &str) -> Result<Option<String>, StoreError> {
        let path = self.path(name);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Corrupt {
                path,
                reason: e.to_string(),
            }),
        }
    }

    /// Replaces an artifact with `bytes`
    ///
    /// The content is written to a temporary file in the data directory and renamed over
    /// the target, so readers see either the old or the new file, never a partial one.
    pub fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path(name);
        let unwritable = |reason: String| StoreError::Unwritable {
            path: path.clone(),
            reason,
        };

        fs::create_dir_all(&self.dir).map_err(|e| unwritable(e.to_string()))?;

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| unwritable(e.to_string()))?;
        tmp.write_all(bytes).map_err(|e| unwritable(e.to_string()))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| unwritable(e.to_string()))?;
        tmp.persist(&path).map_err(|e| unwritable(e.error.to_string()))?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "artifact written");
        Ok(())
    }

    /// Reads and deserializes a JSON artifact
    pub fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StoreError> {
        let Some(content) = self.read_to_string(name)? else {
            return Ok(None);
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                path: self.path(name),
                reason: e.to_string(),
            })
    }

    /// Serializes `data` as pretty JSON and replaces the artifact
    pub fn write_json<T: Serialize>(&self, name: &str, data: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(data).map_err(|e| StoreError::Unwritable {
            path: self.path(name),
            reason: e.to_string(),
        })?;
        self.write_atomic(name, json.as_bytes())
    }
}
