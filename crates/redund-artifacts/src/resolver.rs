//! Artifact discovery by filename timestamp.
//!
//! Artifacts are named `YYMMDD_HHMMSS_<tag>.json`.  A [`TimestampedDir`]
//! picks the newest (or oldest) file for a tag by parsing the embedded
//! timestamp; the file system's own modification times are never consulted.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime, Timelike};
use tracing::debug;

use crate::error::{ArtifactError, Stage};

const STAMP_FORMAT: &str = "%y%m%d_%H%M%S";
const STAMP_LEN: usize = 13;

// ────────────────────────────────────────────────────────────────────────────
// Kinds and stamps
// ────────────────────────────────────────────────────────────────────────────

/// The artifact contracts exchanged between stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Candidate solutions as exported by the IK generator.
    Solutions,
    /// Candidate solutions after the upstream selection step.
    SelectedSolutions,
    Metadata,
    CollisionFreeSolutions,
    ShortestPath,
}

impl ArtifactKind {
    /// Filename tag following the timestamp.
    pub fn tag(self) -> &'static str {
        match self {
            ArtifactKind::Solutions => "solutions",
            ArtifactKind::SelectedSolutions => "solutions_selected",
            ArtifactKind::Metadata => "metadata",
            ArtifactKind::CollisionFreeSolutions => "collision_free_solutions",
            ArtifactKind::ShortestPath => "shortest_path",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// The `YYMMDD_HHMMSS` creation stamp embedded in an artifact name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Stamp(NaiveDateTime);

impl Stamp {
    /// The current local time, truncated to seconds.
    pub fn now() -> Self {
        let now = Local::now().naive_local();
        Self(now.with_nanosecond(0).unwrap_or(now))
    }

    pub fn parse(text: &str) -> Option<Self> {
        NaiveDateTime::parse_from_str(text, STAMP_FORMAT).ok().map(Self)
    }

    /// The stamp of `path` if its file name is `<stamp>_<anything>`.
    pub fn of(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let head = name.get(..STAMP_LEN)?;
        if name.as_bytes().get(STAMP_LEN) != Some(&b'_') {
            return None;
        }
        Self::parse(head)
    }

    /// `<stamp>_<tag>.json`
    pub fn file_name(self, kind: ArtifactKind) -> String {
        format!("{self}_{}.json", kind.tag())
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(STAMP_FORMAT))
    }
}

/// The stamp of `name` if it is exactly `<stamp>_<tag>.json`.
fn match_name(name: &str, kind: ArtifactKind) -> Option<Stamp> {
    let rest = name.get(STAMP_LEN..)?;
    let tag = rest.strip_prefix('_')?.strip_suffix(".json")?;
    if tag != kind.tag() {
        return None;
    }
    Stamp::parse(name.get(..STAMP_LEN)?)
}

// ────────────────────────────────────────────────────────────────────────────
// Resolution
// ────────────────────────────────────────────────────────────────────────────

/// Which of several matching artifacts to pick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    Latest,
    Oldest,
}

/// Finds the artifact file for a kind.
pub trait ArtifactResolver {
    /// Path of the selected artifact of `kind`.
    fn resolve(&self, kind: ArtifactKind, selection: Selection) -> Result<PathBuf, ArtifactError>;

    /// Path of the most recent artifact of `kind`.
    fn latest(&self, kind: ArtifactKind) -> Result<PathBuf, ArtifactError> {
        self.resolve(kind, Selection::Latest)
    }
}

/// Resolves artifacts inside one directory by their filename stamps.
#[derive(Debug, Clone)]
pub struct TimestampedDir {
    dir: PathBuf,
    stage: Stage,
}

impl TimestampedDir {
    pub fn new(dir: impl Into<PathBuf>, stage: Stage) -> Self {
        Self {
            dir: dir.into(),
            stage,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactResolver for TimestampedDir {
    fn resolve(&self, kind: ArtifactKind, selection: Selection) -> Result<PathBuf, ArtifactError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|source| ArtifactError::Directory {
            dir: self.dir.clone(),
            stage: self.stage,
            source,
        })?;

        let mut chosen: Option<(Stamp, String)> = None;
        for entry in entries.flatten() {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let Some(stamp) = match_name(&name, kind) else {
                continue;
            };
            let better = match (&chosen, selection) {
                (None, _) => true,
                (Some((best, _)), Selection::Latest) => stamp > *best,
                (Some((best, _)), Selection::Oldest) => stamp < *best,
            };
            if better {
                chosen = Some((stamp, name));
            }
        }

        match chosen {
            Some((stamp, name)) => {
                debug!(kind = %kind, %stamp, dir = %self.dir.display(), "artifact resolved");
                Ok(self.dir.join(name))
            }
            None => Err(ArtifactError::NotFound {
                tag: kind.tag(),
                dir: self.dir.clone(),
                stage: self.stage,
            }),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Data directory layout
// ────────────────────────────────────────────────────────────────────────────

/// Standard sub-directories of a data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `auto_generated/export` – IK generator output.
    pub fn export_dir(&self) -> PathBuf {
        self.root.join("auto_generated").join("export")
    }

    /// `auto_generated/planned_motion` – filter and optimizer output.
    pub fn planned_motion_dir(&self) -> PathBuf {
        self.root.join("auto_generated").join("planned_motion")
    }

    /// `auto_generated/collision_temp` – numbered obstacle meshes.
    pub fn obstacle_dir(&self) -> PathBuf {
        self.root.join("auto_generated").join("collision_temp")
    }

    /// `auto_generated/compute_times.log`
    pub fn compute_log(&self) -> PathBuf {
        self.root.join("auto_generated").join("compute_times.log")
    }
}

/// Output path for an artifact derived from `input`: same stamp, new tag,
/// placed in `dir`.  Unstamped inputs get the current time.
pub fn derived_path(input: &Path, kind: ArtifactKind, dir: &Path) -> PathBuf {
    let stamp = Stamp::of(input).unwrap_or_else(Stamp::now);
    dir.join(stamp.file_name(kind))
}
