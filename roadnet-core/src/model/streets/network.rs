//! Candidate network passed between build stages and the final routable graph

use geo::Point;
use hashbrown::HashMap;
use petgraph::{
    Directed,
    graph::{DiGraph, EdgeIndex, Edges, NodeIndex},
};
use rstar::{RTree, primitives::GeomWithData};

use super::components::{DirectedEdge, RoadNode};
use crate::{Meters, NodeId, loading::Projector};

/// Directed multigraph under construction
///
/// Edges reference nodes by [`NodeId`], so stages can drop or add nodes
/// without renumbering the survivors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectedNetwork {
    pub nodes: Vec<RoadNode>,
    pub edges: Vec<DirectedEdge>,
}

impl DirectedNetwork {
    pub fn new(nodes: Vec<RoadNode>, edges: Vec<DirectedEdge>) -> Self {
        Self { nodes, edges }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&RoadNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Number of weakly connected components, isolated nodes included
    pub fn weak_component_count(&self) -> usize {
        let mut graph: DiGraph<NodeId, ()> =
            DiGraph::with_capacity(self.nodes.len(), self.edges.len());
        let index: HashMap<NodeId, NodeIndex> = self
            .nodes
            .iter()
            .map(|node| (node.id, graph.add_node(node.id)))
            .collect();

        for edge in &self.edges {
            if let (Some(&from), Some(&to)) = (index.get(&edge.origin), index.get(&edge.destination))
            {
                graph.add_edge(from, to, ());
            }
        }

        // On a directed graph this counts weakly connected components
        petgraph::algo::connected_components(&graph)
    }

    /// Number of distinct neighbours of every node, ignoring edge direction
    pub fn undirected_degrees(&self) -> HashMap<NodeId, usize> {
        let mut neighbours: HashMap<NodeId, Vec<NodeId>> = self
            .nodes
            .iter()
            .map(|node| (node.id, Vec::new()))
            .collect();

        for edge in &self.edges {
            if edge.origin == edge.destination {
                continue;
            }
            if let Some(list) = neighbours.get_mut(&edge.origin) {
                list.push(edge.destination);
            }
            if let Some(list) = neighbours.get_mut(&edge.destination) {
                list.push(edge.origin);
            }
        }

        neighbours
            .into_iter()
            .map(|(id, mut list)| {
                list.sort_unstable();
                list.dedup();
                (id, list.len())
            })
            .collect()
    }
}

/// Point in the spatial index, carrying the graph node it belongs to
pub type IndexedPoint = GeomWithData<[f64; 2], NodeIndex>;

/// Assembled directed multigraph, immutable once built
#[derive(Debug, Clone)]
pub struct RoadGraph {
    pub graph: DiGraph<RoadNode, DirectedEdge>,
    rtree: RTree<IndexedPoint>,
    node_lookup: HashMap<NodeId, NodeIndex>,
    projector: Projector,
}

impl RoadGraph {
    /// Builds the graph and its spatial index.
    ///
    /// Edges whose endpoints are not in `network.nodes` are ignored.
    pub fn new(network: DirectedNetwork, projector: Projector) -> Self {
        let DirectedNetwork { nodes, edges } = network;
        let mut graph = DiGraph::with_capacity(nodes.len(), edges.len());
        let mut node_lookup = HashMap::with_capacity(nodes.len());

        for node in nodes {
            let id = node.id;
            let index = graph.add_node(node);
            node_lookup.insert(id, index);
        }

        for edge in edges {
            if let (Some(&from), Some(&to)) = (
                node_lookup.get(&edge.origin),
                node_lookup.get(&edge.destination),
            ) {
                graph.add_edge(from, to, edge);
            }
        }

        let points = graph
            .node_indices()
            .map(|index| {
                let geometry = graph[index].geometry;
                IndexedPoint::new([geometry.x(), geometry.y()], index)
            })
            .collect();

        Self {
            graph,
            rtree: RTree::bulk_load(points),
            node_lookup,
            projector,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn node_index(&self, id: NodeId) -> Option<NodeIndex> {
        self.node_lookup.get(&id).copied()
    }

    pub fn node(&self, index: NodeIndex) -> Option<&RoadNode> {
        self.graph.node_weight(index)
    }

    pub fn edge(&self, index: EdgeIndex) -> Option<&DirectedEdge> {
        self.graph.edge_weight(index)
    }

    /// Outgoing edges of a node
    pub fn edges(&self, node: NodeIndex) -> Edges<'_, DirectedEdge, Directed> {
        self.graph.edges(node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &RoadNode> {
        self.graph.node_weights()
    }

    pub fn directed_edges(&self) -> impl Iterator<Item = &DirectedEdge> {
        self.graph.edge_weights()
    }

    /// Projection the node coordinates are expressed in
    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    /// Nearest node to a point in projected metres, with its distance
    pub fn nearest_node(&self, point: &Point<f64>) -> Option<(NodeIndex, Meters)> {
        let query = [point.x(), point.y()];
        self.rtree.nearest_neighbor(&query).map(|nearest| {
            let [x, y] = *nearest.geom();
            let distance = (x - query[0]).hypot(y - query[1]);
            (nearest.data, distance)
        })
    }
}
