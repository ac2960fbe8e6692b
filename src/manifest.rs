//! The end-of-run manifest: every moved file and where it went.
//!
//! The manifest can also be written to disk as JSON for later inspection.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Invalid manifest JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to write manifest {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read manifest {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A file that was moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub file_name: String,
    pub source: PathBuf,
    /// Full path of the file after the move, including any rename.
    pub destination: PathBuf,
}

/// A file that could not be moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedEntry {
    pub file_name: String,
    pub source: PathBuf,
    pub destination_dir: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// RFC 3339 timestamp of when the run finished.
    pub timestamp: String,
    pub watched_folder: PathBuf,
    pub moved: Vec<ManifestEntry>,
    pub failed: Vec<FailedEntry>,
    pub cancelled: bool,
}

impl Manifest {
    pub fn new(watched_folder: PathBuf) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            watched_folder,
            moved: Vec::new(),
            failed: Vec::new(),
            cancelled: false,
        }
    }

    /// Writes the manifest as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| ManifestError::Write {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let json = fs::read_to_string(path).map_err(|e| ManifestError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(serde_json::from_str(&json)?)
    }
}
