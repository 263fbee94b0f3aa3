use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Pipeline stage on whose behalf an artifact is read or written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Filter,
    Optimize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Filter => f.write_str("collision filter"),
            Stage::Optimize => f.write_str("path optimizer"),
        }
    }
}

/// Missing, unreadable, malformed or unwritable artifact files.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("{stage}: no '{tag}' artifact in {dir}")]
    NotFound {
        tag: &'static str,
        dir: PathBuf,
        stage: Stage,
    },

    #[error("{stage}: cannot list {dir}: {source}")]
    Directory {
        dir: PathBuf,
        stage: Stage,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage}: cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        stage: Stage,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage}: malformed JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        stage: Stage,
        #[source]
        source: serde_json::Error,
    },

    #[error("{stage}: cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        stage: Stage,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage}: cannot serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        stage: Stage,
        #[source]
        source: serde_json::Error,
    },
}

impl ArtifactError {
    /// The stage that hit the error.
    pub fn stage(&self) -> Stage {
        match self {
            ArtifactError::NotFound { stage, .. }
            | ArtifactError::Directory { stage, .. }
            | ArtifactError::Read { stage, .. }
            | ArtifactError::Parse { stage, .. }
            | ArtifactError::Write { stage, .. }
            | ArtifactError::Serialize { stage, .. } => *stage,
        }
    }
}
