use thiserror::Error;

/// Failures of the path optimizer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("no path found: none of the {pairs} evaluated start/end pairs is connected")]
    NoPath { pairs: usize },

    #[error("search interrupted after {pairs} pairs before any path was found")]
    Interrupted { pairs: usize },

    #[error("sampling needs at least one iteration")]
    InvalidIterations,

    #[error("the configuration graph has no layers")]
    EmptyGraph,

    #[error("search over {requested} layers requested but the graph only has {available}")]
    LayerCount { requested: usize, available: usize },
}
