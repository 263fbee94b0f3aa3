//! [`CollisionFilter`] – drops every configuration that penetrates an
//! obstacle.
//!
//! One session is opened per pass and released when the pass ends, on the
//! success path and on every error path alike.  Point order and the order of
//! configurations inside a point are preserved.  A point that loses all of
//! its configurations is kept as an empty point and listed in
//! [`FilterReport::dead_points`]; deciding what a dead point means for the
//! run is left to the caller.

use std::time::{Duration, Instant};

use redund_types::{Point, RunLog, SolutionSet};
use tracing::{debug, instrument, warn};

use crate::error::SceneError;
use crate::session::{SceneBackend, SessionMode, open_with_fallback};

/// Outcome of one filter pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterReport {
    /// Collision-free configurations, same shape and order as the input.
    pub solutions: SolutionSet,
    /// Indices of points that were non-empty before the pass and are empty now.
    pub dead_points: Vec<usize>,
    pub starting: usize,
    pub surviving: usize,
    /// Rejected configuration count per point.
    pub rejected_per_point: Vec<usize>,
    pub elapsed: Duration,
}

/// Removes colliding configurations from a solution set.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollisionFilter {
    mode: SessionMode,
}

impl CollisionFilter {
    pub fn new(mode: SessionMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Run one pass over `solutions` against the scene behind `backend`.
    ///
    /// # Errors
    ///
    /// Session acquisition failures (after the headless fallback) and any
    /// error raised while posing the robot or querying collisions.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use redund_scene::{CollisionFilter, CollisionScene, SessionMode};
    /// # fn run(scene: &CollisionScene, set: &redund_types::SolutionSet) -> Result<(), redund_scene::SceneError> {
    /// let report = CollisionFilter::new(SessionMode::Headless)
    ///     .filter(scene, set, &redund_types::TracingLog)?;
    /// println!("{} of {} survive", report.surviving, report.starting);
    /// # Ok(()) }
    /// ```
    #[instrument(skip_all, fields(mode = %self.mode, points = solutions.len()))]
    pub fn filter(
        &self,
        backend: &dyn SceneBackend,
        solutions: &SolutionSet,
        log: &dyn RunLog,
    ) -> Result<FilterReport, SceneError> {
        let started = Instant::now();
        let mut session = open_with_fallback(backend, self.mode)?;

        let mut points = Vec::with_capacity(solutions.len());
        let mut rejected_per_point = Vec::with_capacity(solutions.len());
        for (index, point) in solutions.points().iter().enumerate() {
            let mut kept = Vec::with_capacity(point.len());
            for configuration in point.iter() {
                session.set_configuration(configuration)?;
                let hits = session.penetrating_obstacles()?;
                if hits.is_empty() {
                    kept.push(configuration.clone());
                } else {
                    debug!(point = index, obstacles = ?hits, "configuration rejected");
                }
            }
            rejected_per_point.push(point.len() - kept.len());
            points.push(Point::new(kept));
        }
        drop(session);

        let filtered = SolutionSet::new(points);
        let dead_points: Vec<usize> = solutions
            .points()
            .iter()
            .zip(filtered.points())
            .enumerate()
            .filter(|(_, (before, after))| !before.is_empty() && after.is_empty())
            .map(|(i, _)| i)
            .collect();
        if !dead_points.is_empty() {
            warn!(?dead_points, "points without a collision-free configuration");
        }

        let elapsed = started.elapsed();
        let starting = solutions.total_configurations();
        let surviving = filtered.total_configurations();
        log.log(&format!(
            "Collision Check for {starting} Solutions in {} Seconds",
            elapsed.as_secs_f64()
        ));
        log.log(&format!(
            "Starting Solutions: {starting} reduced to {surviving} solutions"
        ));

        Ok(FilterReport {
            solutions: filtered,
            dead_points,
            starting,
            surviving,
            rejected_per_point,
            elapsed,
        })
    }
}
