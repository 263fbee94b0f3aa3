//! Best-path search over a [`ConfigurationGraph`].
//!
//! The search runs single-pair Dijkstra for (start, end) pairs drawn from the
//! first and last layer and keeps the cheapest path found.  In
//! [`SearchMode::Exhaustive`] every pair is tried; in
//! [`SearchMode::Sampling`] a fixed number of pairs is drawn uniformly at
//! random, with replacement.  Pairs without a connecting path are skipped.
//!
//! Every improvement is written to the [`RunLog`] as it happens, and the
//! search can be stopped early through [`SearchOptions`]; an interrupted
//! search still returns the best path found up to that point.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::{Duration, Instant};

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use redund_types::RunLog;
use tracing::{debug, info, instrument, warn};

use crate::error::PlanError;
use crate::graph::{ConfigurationGraph, NodeId};

// ────────────────────────────────────────────────────────────────────────────
// Public types
// ────────────────────────────────────────────────────────────────────────────

/// Which (start, end) pairs the search evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Every start in the first layer against every end in the last layer.
    Exhaustive,
    /// `iterations` uniformly drawn pairs, with replacement.
    Sampling {
        iterations: NonZeroUsize,
        /// Fixed RNG seed for reproducible runs; `None` seeds from entropy.
        seed: Option<u64>,
    },
}

impl SearchMode {
    /// `None` selects exhaustive search, `Some(k)` samples `k` pairs.
    ///
    /// # Errors
    ///
    /// [`PlanError::InvalidIterations`] for `Some(0)`.
    pub fn from_iterations(iterations: Option<usize>) -> Result<Self, PlanError> {
        match iterations {
            None => Ok(SearchMode::Exhaustive),
            Some(k) => NonZeroUsize::new(k)
                .map(|iterations| SearchMode::Sampling {
                    iterations,
                    seed: None,
                })
                .ok_or(PlanError::InvalidIterations),
        }
    }

    /// Fix the sampling seed.  No effect on exhaustive search.
    pub fn with_seed(self, seed: Option<u64>) -> Self {
        match self {
            SearchMode::Sampling { iterations, .. } => SearchMode::Sampling { iterations, seed },
            SearchMode::Exhaustive => SearchMode::Exhaustive,
        }
    }
}

/// Early-stop controls for a long search.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Checked before every pair; setting it stops the search.
    pub cancel: Option<Arc<AtomicBool>>,
    /// Wall-clock budget for the whole search.
    pub time_limit: Option<Duration>,
}

impl SearchOptions {
    fn should_stop(&self, started: Instant) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(AtomicOrdering::Relaxed))
            || self.time_limit.is_some_and(|limit| started.elapsed() >= limit)
    }
}

/// A path through the graph: one node per layer, first to last.
#[derive(Debug, Clone, PartialEq)]
pub struct BestPath {
    pub nodes: Vec<NodeId>,
    pub cost: f64,
}

/// Which pair produced an improvement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iteration {
    /// Indices of the start and end node inside their layers.
    Pair { start: usize, end: usize },
    /// Sample number.
    Sample(usize),
}

impl fmt::Display for Iteration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Iteration::Pair { start, end } => write!(f, "{start}/{end}"),
            Iteration::Sample(i) => write!(f, "{i}"),
        }
    }
}

/// One strictly cheaper path found during the search.
#[derive(Debug, Clone, PartialEq)]
pub struct Improvement {
    pub elapsed: Duration,
    pub cost: f64,
    pub iteration: Iteration,
}

/// Result of [`find_best_path`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchReport {
    pub best: BestPath,
    /// The search stopped before evaluating every planned pair.
    pub interrupted: bool,
    pub pairs_evaluated: usize,
    pub pairs_without_path: usize,
    pub improvements: Vec<Improvement>,
    pub elapsed: Duration,
}

// ────────────────────────────────────────────────────────────────────────────
// Single-pair Dijkstra
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct State {
    cost: f64,
    node: NodeId,
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for State {}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for State {
    // Min-heap on cost, ties broken on the lower node id.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Cheapest path from `from` to `to`, or `None` when `to` is unreachable.
///
/// The first time `to` is popped from the queue its cost is final, so the
/// search stops there.
pub fn shortest_path(graph: &ConfigurationGraph, from: NodeId, to: NodeId) -> Option<BestPath> {
    let n = graph.node_count();
    if from >= n || to >= n {
        return None;
    }
    let mut dist = vec![f64::INFINITY; n];
    let mut prev: Vec<Option<NodeId>> = vec![None; n];
    let mut heap = BinaryHeap::new();

    dist[from] = 0.0;
    heap.push(State { cost: 0.0, node: from });

    while let Some(State { cost, node }) = heap.pop() {
        if node == to {
            let mut nodes = vec![to];
            let mut cursor = to;
            while let Some(p) = prev[cursor] {
                nodes.push(p);
                cursor = p;
            }
            nodes.reverse();
            return Some(BestPath { nodes, cost });
        }
        if cost > dist[node] {
            continue;
        }
        for edge in graph.edges(node) {
            let next = cost + edge.weight;
            if next < dist[edge.to] {
                dist[edge.to] = next;
                prev[edge.to] = Some(node);
                heap.push(State {
                    cost: next,
                    node: edge.to,
                });
            }
        }
    }
    None
}

// ────────────────────────────────────────────────────────────────────────────
// Best-path search
// ────────────────────────────────────────────────────────────────────────────

/// Find the cheapest path from layer 0 to layer `num_layers - 1`.
///
/// # Errors
///
/// - [`PlanError::EmptyGraph`] when `num_layers` is zero.
/// - [`PlanError::LayerCount`] when `num_layers` exceeds the graph.
/// - [`PlanError::NoPath`] when no evaluated pair is connected.
/// - [`PlanError::Interrupted`] when stopped before any path was found.
///
/// # Example
///
/// ```
/// use redund_planner::{ConfigurationGraph, SearchMode, SearchOptions, find_best_path};
/// use redund_types::{NullLog, SolutionSet};
///
/// let set = SolutionSet::from_nested(vec![
///     vec![vec![0.0], vec![5.0]],
///     vec![vec![1.0], vec![4.0]],
///     vec![vec![2.0]],
/// ]);
/// let graph = ConfigurationGraph::build(&set);
/// let report = find_best_path(&graph, 3, SearchMode::Exhaustive, &SearchOptions::default(), &NullLog)?;
/// assert_eq!(report.best.nodes, vec![0, 2, 4]);
/// assert_eq!(report.best.cost, 2.0);
/// # Ok::<(), redund_planner::PlanError>(())
/// ```
#[instrument(skip_all, fields(layers = num_layers, mode = ?mode))]
pub fn find_best_path(
    graph: &ConfigurationGraph,
    num_layers: usize,
    mode: SearchMode,
    options: &SearchOptions,
    log: &dyn RunLog,
) -> Result<SearchReport, PlanError> {
    if num_layers == 0 {
        return Err(PlanError::EmptyGraph);
    }
    if num_layers > graph.layer_count() {
        return Err(PlanError::LayerCount {
            requested: num_layers,
            available: graph.layer_count(),
        });
    }

    let starts: Vec<NodeId> = graph.layer(0).collect();
    let ends: Vec<NodeId> = graph.layer(num_layers - 1).collect();
    let started = Instant::now();
    let mut search = Search {
        graph,
        log,
        started,
        best: None,
        improvements: Vec::new(),
        evaluated: 0,
        without_path: 0,
    };
    let mut interrupted = false;

    match mode {
        SearchMode::Exhaustive => {
            'pairs: for (i, &start) in starts.iter().enumerate() {
                for (j, &end) in ends.iter().enumerate() {
                    if options.should_stop(started) {
                        interrupted = true;
                        break 'pairs;
                    }
                    search.evaluate(start, end, Iteration::Pair { start: i, end: j });
                }
            }
        }
        SearchMode::Sampling { iterations, seed } => {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            for i in 0..iterations.get() {
                if options.should_stop(started) {
                    interrupted = true;
                    break;
                }
                let (Some(&start), Some(&end)) = (starts.choose(&mut rng), ends.choose(&mut rng))
                else {
                    break;
                };
                search.evaluate(start, end, Iteration::Sample(i));
            }
        }
    }

    let elapsed = started.elapsed();
    let Search {
        best,
        improvements,
        evaluated,
        without_path,
        ..
    } = search;

    match best {
        Some(best) => {
            log.log(&format!("Shortest path length: {}", best.cost));
            info!(
                cost = best.cost,
                pairs = evaluated,
                interrupted,
                elapsed_s = elapsed.as_secs_f64(),
                "best path selected"
            );
            Ok(SearchReport {
                best,
                interrupted,
                pairs_evaluated: evaluated,
                pairs_without_path: without_path,
                improvements,
                elapsed,
            })
        }
        None if interrupted => {
            warn!(pairs = evaluated, "search interrupted before any path was found");
            Err(PlanError::Interrupted { pairs: evaluated })
        }
        None => {
            log.log("Shortest path length: inf");
            warn!(pairs = evaluated, "no start/end pair is connected");
            Err(PlanError::NoPath { pairs: evaluated })
        }
    }
}

/// Running state of one [`find_best_path`] call.
struct Search<'a> {
    graph: &'a ConfigurationGraph,
    log: &'a dyn RunLog,
    started: Instant,
    best: Option<BestPath>,
    improvements: Vec<Improvement>,
    evaluated: usize,
    without_path: usize,
}

impl Search<'_> {
    fn evaluate(&mut self, start: NodeId, end: NodeId, iteration: Iteration) {
        self.evaluated += 1;
        let Some(path) = shortest_path(self.graph, start, end) else {
            self.without_path += 1;
            debug!(start, end, "pair has no path");
            return;
        };
        if self.best.as_ref().is_some_and(|b| path.cost >= b.cost) {
            return;
        }
        let elapsed = self.started.elapsed();
        self.log.log(&format!(
            "found a shorter path at {:.3}, length: {}, iteration: {iteration}",
            elapsed.as_secs_f64(),
            path.cost
        ));
        self.improvements.push(Improvement {
            elapsed,
            cost: path.cost,
            iteration,
        });
        self.best = Some(path);
    }
}
