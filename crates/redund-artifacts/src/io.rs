//! Reading and writing the JSON artifacts.
//!
//! Every error names the file and the stage that touched it.

use std::path::Path;

use redund_types::{ExportedPath, Metadata, SolutionSet};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::error::{ArtifactError, Stage};

/// Deserialize the JSON document at `path`.
pub fn read_json<T: DeserializeOwned>(path: &Path, stage: Stage) -> Result<T, ArtifactError> {
    let raw = std::fs::read(path).map_err(|source| ArtifactError::Read {
        path: path.to_path_buf(),
        stage,
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        stage,
        source,
    })
}

/// Serialize `value` to `path`, creating parent directories as needed.
pub fn write_json<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    stage: Stage,
) -> Result<(), ArtifactError> {
    let write_err = |source| ArtifactError::Write {
        path: path.to_path_buf(),
        stage,
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    let raw = serde_json::to_vec(value).map_err(|source| ArtifactError::Serialize {
        path: path.to_path_buf(),
        stage,
        source,
    })?;
    std::fs::write(path, raw).map_err(write_err)?;
    info!(path = %path.display(), %stage, "artifact written");
    Ok(())
}

pub fn read_solutions(path: &Path, stage: Stage) -> Result<SolutionSet, ArtifactError> {
    read_json(path, stage)
}

pub fn read_metadata(path: &Path, stage: Stage) -> Result<Metadata, ArtifactError> {
    read_json(path, stage)
}

pub fn write_solutions(path: &Path, solutions: &SolutionSet) -> Result<(), ArtifactError> {
    write_json(path, solutions, Stage::Filter)
}

pub fn write_path(path: &Path, exported: &ExportedPath) -> Result<(), ArtifactError> {
    write_json(path, exported, Stage::Optimize)
}
