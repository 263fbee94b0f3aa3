//! The two pipeline stages as file-in, file-out runs.
//!
//! [`run_filter`] and [`run_optimize`] resolve their inputs from the data
//! directory, call into `redund-scene` / `redund-planner`, and write the
//! stage artifact next to the others.  [`filter_stage`] and
//! [`optimize_stage`] are the same runs with the scene and the resolved
//! inputs supplied by the caller.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use redund_artifacts::{
    ArtifactError, ArtifactKind, ArtifactResolver, DataLayout, Stage, TimestampedDir,
    derived_path, read_metadata, read_solutions, write_path, write_solutions,
};
use redund_planner::{PlanError, Planner, SearchMode, SearchOptions, SearchReport};
use redund_scene::{CollisionFilter, CollisionScene, FilterReport, SceneBackend, SceneError, SessionMode};
use redund_types::{ExportedPath, RedundError, RunLog};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::Config;

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Everything that can fail a `redund` run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("collision filter: {0}")]
    Scene(#[from] SceneError),

    #[error("path optimizer: {0}")]
    Plan(#[from] PlanError),

    #[error("invalid solution set: {0}")]
    Data(#[from] RedundError),

    #[error(
        "There are {} nodes without a valid configuration. Points affected: {points:?} (output kept at {})",
        points.len(),
        output.display()
    )]
    DeadPoints { points: Vec<usize>, output: PathBuf },
}

// ────────────────────────────────────────────────────────────────────────────
// Inputs and outcomes
// ────────────────────────────────────────────────────────────────────────────

/// Explicit input files; `None` means "latest in the data directory".
#[derive(Debug, Clone, Default)]
pub struct StageInputs {
    pub solutions: Option<PathBuf>,
    pub metadata: Option<PathBuf>,
}

#[derive(Debug)]
pub struct FilterOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    pub report: FilterReport,
}

impl FilterOutcome {
    /// `Err(DeadPoints)` when the pass emptied any point.
    pub fn ensure_no_dead_points(&self) -> Result<(), PipelineError> {
        if self.report.dead_points.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::DeadPoints {
                points: self.report.dead_points.clone(),
                output: self.output.clone(),
            })
        }
    }
}

#[derive(Debug)]
pub struct OptimizeOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    pub lift: f64,
    pub report: SearchReport,
    pub exported: ExportedPath,
}

// ────────────────────────────────────────────────────────────────────────────
// Collision filter stage
// ────────────────────────────────────────────────────────────────────────────

/// Filter the latest (or given) solution set against the configured scene.
///
/// Dead points do not fail this call; check
/// [`FilterOutcome::ensure_no_dead_points`] once the run is over.
#[instrument(skip_all, fields(data = %cfg.data_dir.display()))]
pub fn run_filter(
    cfg: &Config,
    inputs: &StageInputs,
    log: &dyn RunLog,
) -> Result<FilterOutcome, PipelineError> {
    let layout = DataLayout::new(&cfg.data_dir);
    let export = TimestampedDir::new(layout.export_dir(), Stage::Filter);

    let solutions = match &inputs.solutions {
        Some(path) => path.clone(),
        None => latest_solutions(&export)?,
    };

    let spawnpoint = if cfg.robot.use_metadata_spawnpoint {
        let path = match &inputs.metadata {
            Some(path) => path.clone(),
            None => export.latest(ArtifactKind::Metadata)?,
        };
        let metadata = read_metadata(&path, Stage::Filter)?;
        log.log(&format!("metadata read from {}", path.display()));
        if metadata.robot_spawnpoint.is_none() {
            warn!(path = %path.display(), "metadata has no robot_spawnpoint; using robot.base_position");
        }
        metadata.robot_spawnpoint
    } else {
        None
    };

    let spec = cfg.scene_spec(spawnpoint);
    let scene = CollisionScene::load(&spec)?;
    log.log(&format!(
        "robot {} loaded at {:?} with {} obstacles",
        scene.robot().name(),
        spec.base_position,
        scene.obstacles().len()
    ));

    filter_stage(
        &scene,
        cfg.session.mode,
        &solutions,
        &layout.planned_motion_dir(),
        log,
    )
}

/// The filter stage on an already-loaded scene.
pub fn filter_stage(
    backend: &dyn SceneBackend,
    mode: SessionMode,
    input: &Path,
    out_dir: &Path,
    log: &dyn RunLog,
) -> Result<FilterOutcome, PipelineError> {
    let solutions = read_solutions(input, Stage::Filter)?;
    solutions.validate_arity(None)?;
    log.log(&format!("solutions read from {}", input.display()));

    let report = CollisionFilter::new(mode).filter(backend, &solutions, log)?;

    let output = derived_path(input, ArtifactKind::CollisionFreeSolutions, out_dir);
    write_solutions(&output, &report.solutions)?;
    log.log(&format!("saved at: {}", output.display()));

    Ok(FilterOutcome {
        input: input.to_path_buf(),
        output,
        report,
    })
}

/// Latest selected solutions, or the latest raw solutions if no selection
/// has been exported.
fn latest_solutions(export: &TimestampedDir) -> Result<PathBuf, ArtifactError> {
    match export.latest(ArtifactKind::SelectedSolutions) {
        Err(ArtifactError::NotFound { .. }) => export.latest(ArtifactKind::Solutions),
        other => other,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Path optimizer stage
// ────────────────────────────────────────────────────────────────────────────

/// Search the latest (or given) collision-free solutions for the cheapest
/// path and export it.
///
/// `cancel` stops the search early; the best path found until then is
/// still written.
#[instrument(skip_all, fields(data = %cfg.data_dir.display()))]
pub fn run_optimize(
    cfg: &Config,
    inputs: &StageInputs,
    cancel: Option<Arc<AtomicBool>>,
    log: &dyn RunLog,
) -> Result<OptimizeOutcome, PipelineError> {
    let layout = DataLayout::new(&cfg.data_dir);
    let planned = TimestampedDir::new(layout.planned_motion_dir(), Stage::Optimize);
    let export = TimestampedDir::new(layout.export_dir(), Stage::Optimize);

    let solutions = match &inputs.solutions {
        Some(path) => path.clone(),
        None => planned.latest(ArtifactKind::CollisionFreeSolutions)?,
    };
    let lift = lift_height(inputs.metadata.as_deref(), &export, log)?;

    let mode = SearchMode::from_iterations(cfg.search.iterations)?.with_seed(cfg.search.seed);
    let options = SearchOptions {
        cancel,
        time_limit: time_limit(cfg.search.time_limit_secs)?,
    };

    optimize_stage(
        &solutions,
        lift,
        mode,
        &options,
        &layout.planned_motion_dir(),
        log,
    )
}

/// The optimizer stage on resolved inputs.
pub fn optimize_stage(
    input: &Path,
    lift: f64,
    mode: SearchMode,
    options: &SearchOptions,
    out_dir: &Path,
    log: &dyn RunLog,
) -> Result<OptimizeOutcome, PipelineError> {
    let solutions = read_solutions(input, Stage::Optimize)?;
    if solutions.is_empty() {
        return Err(RedundError::EmptySolutionSet.into());
    }
    solutions.validate_arity(None)?;
    log.log(&format!("solutions read from {}", input.display()));

    let planner = Planner::from_solutions(&solutions, lift, log);
    let report = planner.find_best_path(mode, options, log)?;
    let exported = planner.export(&report.best);

    let output = derived_path(input, ArtifactKind::ShortestPath, out_dir);
    write_path(&output, &exported)?;
    if report.interrupted {
        log.log("Process interrupted. Current shortest path saved.");
    }
    log.log(&format!("saved at: {}", output.display()));
    info!(
        cost = report.best.cost,
        pairs = report.pairs_evaluated,
        output = %output.display(),
        "path exported"
    );

    Ok(OptimizeOutcome {
        input: input.to_path_buf(),
        output,
        lift,
        report,
        exported,
    })
}

/// Lift height from the given or latest metadata.  No metadata at all means
/// a lift of 0; metadata that exists but cannot be read is an error.
fn lift_height(
    explicit: Option<&Path>,
    export: &TimestampedDir,
    log: &dyn RunLog,
) -> Result<f64, PipelineError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match export.latest(ArtifactKind::Metadata) {
            Ok(path) => path,
            Err(ArtifactError::NotFound { .. } | ArtifactError::Directory { .. }) => {
                warn!(dir = %export.dir().display(), "no metadata found; lift height is 0");
                return Ok(0.0);
            }
            Err(e) => return Err(e.into()),
        },
    };
    let metadata = read_metadata(&path, Stage::Optimize)?;
    log.log(&format!("metadata read from {}", path.display()));
    Ok(metadata.lift_height)
}

fn time_limit(secs: Option<f64>) -> Result<Option<Duration>, PipelineError> {
    secs.map(|s| {
        Duration::try_from_secs_f64(s)
            .map_err(|e| PipelineError::Config(format!("search.time_limit_secs = {s}: {e}")))
    })
    .transpose()
}
