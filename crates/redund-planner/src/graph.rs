//! [`ConfigurationGraph`] – the layered transition graph.
//!
//! One layer per point, one node per configuration.  Node ids are assigned
//! point by point and, inside a point, in configuration order, so the same
//! solution set always yields the same numbering.  Every node of layer `i`
//! has a directed edge to every node of layer `i + 1`, weighted by the L1
//! distance between the two joint vectors.  There are no other edges.

use std::ops::Range;

use rayon::prelude::*;
use redund_types::{Configuration, SolutionSet};

/// Dense node identifier.
pub type NodeId = usize;

/// One directed, weighted transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub to: NodeId,
    pub weight: f64,
}

#[derive(Debug, Clone)]
struct Node {
    layer: usize,
    configuration: Configuration,
}

/// Layered directed graph over the configurations of a solution set.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationGraph {
    nodes: Vec<Node>,
    layers: Vec<Range<NodeId>>,
    adjacency: Vec<Vec<Edge>>,
    edge_count: usize,
}

impl ConfigurationGraph {
    /// Build the graph for `solutions`.
    ///
    /// Edges between each pair of adjacent layers are computed in parallel
    /// and joined in layer order; the result does not depend on the number of
    /// worker threads.  An empty layer simply has no edges in or out.
    ///
    /// # Example
    ///
    /// ```
    /// use redund_planner::ConfigurationGraph;
    /// use redund_types::SolutionSet;
    ///
    /// let set = SolutionSet::from_nested(vec![
    ///     vec![vec![0.0, 0.0, 0.0]],
    ///     vec![vec![1.0, 2.0, -3.0], vec![0.0, 0.0, 1.0]],
    /// ]);
    /// let graph = ConfigurationGraph::build(&set);
    /// assert_eq!(graph.node_count(), 3);
    /// assert_eq!(graph.edges(0)[0].weight, 6.0);
    /// ```
    pub fn build(solutions: &SolutionSet) -> Self {
        let mut nodes = Vec::with_capacity(solutions.total_configurations());
        let mut layers = Vec::with_capacity(solutions.len());
        for (layer, point) in solutions.points().iter().enumerate() {
            let first = nodes.len();
            nodes.extend(point.iter().map(|c| Node {
                layer,
                configuration: c.clone(),
            }));
            layers.push(first..nodes.len());
        }

        let per_layer: Vec<Vec<Vec<Edge>>> = layers
            .par_windows(2)
            .map(|pair| {
                let (current, next) = (&pair[0], &pair[1]);
                current
                    .clone()
                    .map(|from| {
                        next.clone()
                            .map(|to| Edge {
                                to,
                                weight: nodes[from]
                                    .configuration
                                    .l1_distance(&nodes[to].configuration),
                            })
                            .collect::<Vec<Edge>>()
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        let mut adjacency: Vec<Vec<Edge>> = per_layer.into_iter().flatten().collect();
        adjacency.resize_with(nodes.len(), Vec::new);
        let edge_count = adjacency.iter().map(Vec::len).sum();

        Self {
            nodes,
            layers,
            adjacency,
            edge_count,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Number of layers, including empty ones.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Node ids of layer `index`; empty when out of range.
    pub fn layer(&self, index: usize) -> Range<NodeId> {
        self.layers.get(index).cloned().unwrap_or(0..0)
    }

    /// Layer of `node`.
    pub fn layer_of(&self, node: NodeId) -> usize {
        self.nodes[node].layer
    }

    pub fn configuration(&self, node: NodeId) -> &Configuration {
        &self.nodes[node].configuration
    }

    /// Outgoing edges of `node`, in target id order.
    pub fn edges(&self, node: NodeId) -> &[Edge] {
        &self.adjacency[node]
    }

    /// Every edge as `(from, to, weight)`, ordered by `from` then `to`.
    pub fn edge_list(&self) -> Vec<(NodeId, NodeId, f64)> {
        self.adjacency
            .iter()
            .enumerate()
            .flat_map(|(from, edges)| edges.iter().map(move |e| (from, e.to, e.weight)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> SolutionSet {
        SolutionSet::from_nested(vec![
            vec![vec![0.0, 0.0], vec![1.0, 1.0]],
            vec![vec![0.5, 0.0], vec![2.0, 2.0], vec![0.0, 1.0]],
            vec![vec![1.0, 0.0], vec![0.0, 0.0]],
        ])
    }

    #[test]
    fn node_ids_follow_point_then_configuration_order() {
        let g = ConfigurationGraph::build(&set());
        assert_eq!(g.node_count(), 7);
        assert_eq!(g.layer(0), 0..2);
        assert_eq!(g.layer(1), 2..5);
        assert_eq!(g.layer(2), 5..7);
        assert_eq!(g.layer_of(4), 1);
        assert_eq!(g.configuration(3).joints(), &[2.0, 2.0]);
    }

    #[test]
    fn edges_only_join_adjacent_layers_forward() {
        let g = ConfigurationGraph::build(&set());
        assert_eq!(g.edge_count(), 2 * 3 + 3 * 2);
        for (from, to, _) in g.edge_list() {
            assert_eq!(g.layer_of(to), g.layer_of(from) + 1);
        }
        assert!(g.edges(5).is_empty() && g.edges(6).is_empty());
    }

    #[test]
    fn edge_weight_is_l1_distance() {
        let s = SolutionSet::from_nested(vec![vec![vec![0.0, 0.0, 0.0]], vec![vec![1.0, 2.0, -3.0]]]);
        let g = ConfigurationGraph::build(&s);
        assert_eq!(g.edges(0), &[Edge { to: 1, weight: 6.0 }]);
    }

    #[test]
    fn build_is_independent_of_thread_count() {
        let single = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap()
            .install(|| ConfigurationGraph::build(&set()));
        let many = rayon::ThreadPoolBuilder::new()
            .num_threads(4)
            .build()
            .unwrap()
            .install(|| ConfigurationGraph::build(&set()));
        assert_eq!(single.edge_list(), many.edge_list());
        assert_eq!(single.layers, many.layers);
    }

    #[test]
    fn empty_middle_layer_has_no_edges_through_it() {
        let s = SolutionSet::from_nested(vec![vec![vec![0.0]], vec![], vec![vec![1.0]]]);
        let g = ConfigurationGraph::build(&s);
        assert_eq!(g.layer_count(), 3);
        assert!(g.layer(1).is_empty());
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn empty_solution_set_builds_empty_graph() {
        let g = ConfigurationGraph::build(&SolutionSet::default());
        assert_eq!((g.node_count(), g.edge_count(), g.layer_count()), (0, 0, 0));
        assert!(g.layer(0).is_empty());
    }
}
