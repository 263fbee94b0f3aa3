//! `redund-planner` – minimum joint-travel path through a solution set.
//!
//! Builds a layered graph with one layer per point and one node per
//! configuration, then searches it for the cheapest path that visits one
//! configuration per point, first to last.  Edge weights are the L1 distance
//! between joint vectors, i.e. total actuator travel.
//!
//! # Modules
//!
//! - [`graph`] – [`ConfigurationGraph`][graph::ConfigurationGraph]: node
//!   numbering and parallel edge construction.
//! - [`search`] – [`find_best_path`][search::find_best_path]: exhaustive or
//!   sampled single-pair Dijkstra, with progress reporting and early stop.
//! - [`export`] – [`finalize`][export::finalize]: node sequence to
//!   configurations with the lift height prepended.
//! - [`planner`] – [`Planner`][planner::Planner]: the three steps above for
//!   one solution set.
//!
//! # Example
//!
//! ```
//! use redund_planner::{Planner, SearchMode, SearchOptions};
//! use redund_types::{NullLog, SolutionSet};
//!
//! let set = SolutionSet::from_nested(vec![
//!     vec![vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]],
//!     vec![vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.7], vec![1.0; 6]],
//! ]);
//! let planner = Planner::from_solutions(&set, 0.05, &NullLog);
//! let report = planner.find_best_path(SearchMode::Exhaustive, &SearchOptions::default(), &NullLog)?;
//! let exported = planner.export(&report.best);
//! assert_eq!(exported.configurations()[0].joints()[0], 0.05);
//! # Ok::<(), redund_planner::PlanError>(())
//! ```

pub mod error;
pub mod export;
pub mod graph;
pub mod planner;
pub mod search;

pub use error::PlanError;
pub use export::finalize;
pub use graph::{ConfigurationGraph, Edge, NodeId};
pub use planner::Planner;
pub use search::{
    BestPath, Improvement, Iteration, SearchMode, SearchOptions, SearchReport, find_best_path,
    shortest_path,
};
