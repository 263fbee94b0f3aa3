//! [`Planner`] – graph construction plus search for one solution set.

use std::time::{Duration, Instant};

use redund_types::{ExportedPath, RunLog, SolutionSet};
use tracing::{info, instrument, warn};

use crate::error::PlanError;
use crate::export::finalize;
use crate::graph::ConfigurationGraph;
use crate::search::{BestPath, SearchMode, SearchOptions, SearchReport, find_best_path};

/// A built configuration graph together with the lift height to export with.
#[derive(Debug, Clone)]
pub struct Planner {
    graph: ConfigurationGraph,
    num_solutions: usize,
    lift: f64,
    build_time: Duration,
    dead_points: Vec<usize>,
}

impl Planner {
    /// Build the graph for an in-memory solution set.
    #[instrument(skip_all, fields(points = solutions.len()))]
    pub fn from_solutions(solutions: &SolutionSet, lift: f64, log: &dyn RunLog) -> Self {
        let started = Instant::now();
        let graph = ConfigurationGraph::build(solutions);
        let build_time = started.elapsed();
        let num_solutions = solutions.total_configurations();

        log.log(&format!(
            "Graph construction took {:.3} seconds for {} points with a total of {} solutions",
            build_time.as_secs_f64(),
            solutions.len(),
            num_solutions
        ));
        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            elapsed_s = build_time.as_secs_f64(),
            "configuration graph built"
        );

        let dead_points = solutions.dead_points();
        if !dead_points.is_empty() {
            warn!(?dead_points, "points without configurations; the graph is disconnected");
        }

        Self {
            graph,
            num_solutions,
            lift,
            build_time,
            dead_points,
        }
    }

    pub fn graph(&self) -> &ConfigurationGraph {
        &self.graph
    }

    pub fn num_points(&self) -> usize {
        self.graph.layer_count()
    }

    pub fn num_solutions(&self) -> usize {
        self.num_solutions
    }

    pub fn lift(&self) -> f64 {
        self.lift
    }

    pub fn build_time(&self) -> Duration {
        self.build_time
    }

    /// Points that had no configuration when the graph was built.
    pub fn dead_points(&self) -> &[usize] {
        &self.dead_points
    }

    /// Search from the first point to the last.
    pub fn find_best_path(
        &self,
        mode: SearchMode,
        options: &SearchOptions,
        log: &dyn RunLog,
    ) -> Result<SearchReport, PlanError> {
        find_best_path(&self.graph, self.num_points(), mode, options, log)
    }

    /// The configurations of `best` with this planner's lift prepended.
    pub fn export(&self, best: &BestPath) -> ExportedPath {
        finalize(&self.graph, best, self.lift)
    }
}
