//! Turning a winning node sequence back into exportable configurations.

use redund_types::ExportedPath;

use crate::graph::ConfigurationGraph;
use crate::search::BestPath;

/// Configurations of `best` in path order, each with `lift` inserted as
/// joint 0.
///
/// The graph is left untouched; the lift is applied to copies.
pub fn finalize(graph: &ConfigurationGraph, best: &BestPath, lift: f64) -> ExportedPath {
    ExportedPath::new(
        best.nodes
            .iter()
            .map(|&node| {
                let mut configuration = graph.configuration(node).clone();
                configuration.prepend_lift(lift);
                configuration
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use redund_types::SolutionSet;

    #[test]
    fn lift_is_prepended_as_joint_zero() {
        let set = SolutionSet::from_nested(vec![vec![vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]]]);
        let graph = ConfigurationGraph::build(&set);
        let best = BestPath { nodes: vec![0], cost: 0.0 };
        let exported = finalize(&graph, &best, 0.05);
        assert_eq!(
            exported.configurations()[0].joints(),
            &[0.05, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6]
        );
    }

    #[test]
    fn configurations_follow_path_order_and_graph_is_unchanged() {
        let set = SolutionSet::from_nested(vec![
            vec![vec![1.0], vec![2.0]],
            vec![vec![3.0], vec![4.0]],
        ]);
        let graph = ConfigurationGraph::build(&set);
        let exported = finalize(&graph, &BestPath { nodes: vec![1, 2], cost: 1.0 }, 0.0);
        let joints: Vec<&[f64]> = exported.configurations().iter().map(|c| c.joints()).collect();
        assert_eq!(joints, vec![&[0.0, 2.0][..], &[0.0, 3.0][..]]);
        assert_eq!(graph.configuration(1).joints(), &[2.0]);
    }
}
