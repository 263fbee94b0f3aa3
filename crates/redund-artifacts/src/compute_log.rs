//! [`ComputeTimesLog`] – the run log as an append-only text file.
//!
//! Lines look like `2025-11-17 16:30:17,123 - INFO - <message>`.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use redund_types::RunLog;
use tracing::warn;

use crate::error::{ArtifactError, Stage};

pub struct ComputeTimesLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl ComputeTimesLog {
    /// Open `path` for appending, creating it and its parent directory.
    pub fn open(path: &Path, stage: Stage) -> Result<Self, ArtifactError> {
        let write_err = |source| ArtifactError::Write {
            path: path.to_path_buf(),
            stage,
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(write_err)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RunLog for ComputeTimesLog {
    fn log(&self, message: &str) {
        let line = format!(
            "{} - INFO - {message}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S,%3f")
        );
        let mut file = match self.file.lock() {
            Ok(file) => file,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = file.write_all(line.as_bytes()) {
            warn!(path = %self.path.display(), error = %e, "compute-times log write failed");
        }
    }
}
