use std::path::PathBuf;

use thiserror::Error;

use crate::session::SessionMode;

/// Failures while building a collision scene or running a filter pass.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse URDF {path}: {details}")]
    Urdf { path: PathBuf, details: String },

    #[error("malformed mesh {path}: {details}")]
    Mesh { path: PathBuf, details: String },

    #[error("unsupported mesh format for {0} (expected .obj or .stl)")]
    UnsupportedMeshFormat(PathBuf),

    #[error("unsupported collision geometry on link '{link}': {details}")]
    UnsupportedGeometry { link: String, details: String },

    #[error("obstacle directory {dir} is missing {missing} (obstacles must be numbered 0.obj, 1.obj, …)")]
    ObstacleNumbering { dir: PathBuf, missing: String },

    #[error("robot has no root link")]
    NoRootLink,

    #[error("configuration has {given} joints but the robot only drives {available} from offset {offset}")]
    TooManyJoints {
        given: usize,
        available: usize,
        offset: usize,
    },

    #[error("cannot open a {0} collision session")]
    SessionUnavailable(SessionMode),

    #[error("collision query between link '{link}' and obstacle {obstacle} is unsupported")]
    UnsupportedQuery { link: String, obstacle: usize },
}
