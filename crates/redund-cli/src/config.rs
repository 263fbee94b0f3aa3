//! Run configuration – reads `<data>/redund.toml` (or `--config <path>`).
//!
//! A missing file means defaults.  `REDUND_*` environment variables are
//! applied on top of the file, and command-line flags on top of both.

use std::fs;
use std::path::{Path, PathBuf};

use redund_scene::{SceneSpec, SessionMode};
use serde::{Deserialize, Serialize};

/// File name looked up inside the data directory.
pub const CONFIG_FILE: &str = "redund.toml";

/// Everything a filter/optimize run needs besides the artifacts themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the `auto_generated/…` tree.  Relative paths below resolve
    /// against it.
    pub data_dir: PathBuf,
    pub robot: RobotConfig,
    pub obstacles: ObstacleConfig,
    pub session: SessionConfig,
    pub search: SearchConfig,
    pub run: RunConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub urdf: PathBuf,
    pub base_position: [f64; 3],
    /// Quaternion `[x, y, z, w]`.
    pub base_orientation: [f64; 4],
    /// URDF joint, counted in declaration order with fixed joints included,
    /// that receives the first configuration value.
    pub joint_offset: usize,
    /// Place the base at the metadata's `robot_spawnpoint` instead of
    /// `base_position`.
    pub use_metadata_spawnpoint: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleConfig {
    pub dir: PathBuf,
    pub position: [f64; 3],
    /// Quaternion `[x, y, z, w]`.
    pub orientation: [f64; 4],
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub mode: SessionMode,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Sampled (start, end) pairs; absent means exhaustive search.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit_secs: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Append run messages to `auto_generated/compute_times.log`.
    pub log_file: bool,
}

const IDENTITY: [f64; 4] = [0.0, 0.0, 0.0, 1.0];

/// Half turn about Z: the robot base faces -X in the cell.
const BASE_HALF_TURN: [f64; 4] = [0.0, 0.0, 1.0, 0.0];

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            robot: RobotConfig::default(),
            obstacles: ObstacleConfig::default(),
            session: SessionConfig::default(),
            search: SearchConfig::default(),
            run: RunConfig::default(),
        }
    }
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            urdf: PathBuf::from("URDF/ur20_tool_90deg.urdf"),
            base_position: [0.0; 3],
            base_orientation: BASE_HALF_TURN,
            joint_offset: 1,
            use_metadata_spawnpoint: false,
        }
    }
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("auto_generated/collision_temp"),
            position: [0.0; 3],
            orientation: IDENTITY,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { log_file: true }
    }
}

impl Config {
    /// `path` itself when absolute, otherwise joined onto the data directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }

    /// Scene inputs, with the base optionally moved to `spawnpoint`.
    pub fn scene_spec(&self, spawnpoint: Option<[f64; 3]>) -> SceneSpec {
        let base_position = match spawnpoint {
            Some(p) if self.robot.use_metadata_spawnpoint => p,
            _ => self.robot.base_position,
        };
        SceneSpec {
            urdf: self.resolve(&self.robot.urdf),
            base_position,
            base_orientation: self.robot.base_orientation,
            joint_offset: self.robot.joint_offset,
            obstacle_dir: self.resolve(&self.obstacles.dir),
            obstacle_position: self.obstacles.position,
            obstacle_orientation: self.obstacles.orientation,
        }
    }
}

/// Config file location: `--config` if given, else `<data_dir>/redund.toml`.
pub fn config_path(explicit: Option<&Path>, data_dir: &Path) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| data_dir.join(CONFIG_FILE))
}

/// Load the config at `path` with environment overrides applied.
///
/// A missing file yields the defaults (with `data_dir` set to
/// `default_data_dir`) unless `required` is set.
pub fn load(path: &Path, default_data_dir: &Path, required: bool) -> Result<Config, String> {
    let mut cfg = match load_from(path)? {
        Some(cfg) => cfg,
        None if required => {
            return Err(format!("Config file {} does not exist", path.display()));
        }
        None => Config {
            data_dir: default_data_dir.to_path_buf(),
            ..Config::default()
        },
    };
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Parse the config at `path`.  Returns `None` if the file does not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config = toml::from_str(&raw)
        .map_err(|e| format!("Failed to parse config at {}: {}", path.display(), e))?;
    Ok(Some(cfg))
}

/// Apply `REDUND_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `REDUND_DATA_DIR` | `data_dir` |
/// | `REDUND_ITERATIONS` | `search.iterations` |
/// | `REDUND_SEED` | `search.seed` |
/// | `REDUND_SESSION_MODE` | `session.mode` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("REDUND_DATA_DIR") {
        cfg.data_dir = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("REDUND_ITERATIONS")
        && let Ok(n) = v.parse::<usize>() {
            cfg.search.iterations = Some(n);
        }
    if let Ok(v) = std::env::var("REDUND_SEED")
        && let Ok(seed) = v.parse::<u64>() {
            cfg.search.seed = Some(seed);
        }
    if let Ok(v) = std::env::var("REDUND_SESSION_MODE")
        && let Ok(mode) = v.parse::<SessionMode>() {
            cfg.session.mode = mode;
        }
}
