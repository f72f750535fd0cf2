use std::collections::BinaryHeap;

use fixedbitset::FixedBitSet;
use hashbrown::HashMap;
use petgraph::{
    graph::{EdgeIndex, NodeIndex},
    visit::EdgeRef,
};

use super::state::State;
use crate::{Minutes, model::RoadGraph};

/// Least-time path between two nodes
#[derive(Debug, Clone, PartialEq)]
pub struct TracedPath {
    /// Visited nodes, start and target included
    pub nodes: Vec<NodeIndex>,
    /// Traversed edges in travel order
    pub edges: Vec<EdgeIndex>,
    pub cost: Minutes,
}

/// Dijkstra's algorithm over edge travel times, stopping at `target`.
///
/// Impassable edges (non-finite travel time) are never relaxed. Among
/// parallel edges the cheapest one ends up on the path. Returns `None` when
/// `target` cannot be reached.
pub fn least_time_path(graph: &RoadGraph, start: NodeIndex, target: NodeIndex) -> Option<TracedPath> {
    let node_count = graph.node_count();
    if start.index() >= node_count || target.index() >= node_count {
        return None;
    }

    let estimated_nodes = node_count.min(1000);
    let mut distances: HashMap<NodeIndex, Minutes> = HashMap::with_capacity(estimated_nodes);
    let mut predecessors: HashMap<NodeIndex, EdgeIndex> = HashMap::with_capacity(estimated_nodes);
    let mut settled = FixedBitSet::with_capacity(node_count);
    let mut heap = BinaryHeap::with_capacity(estimated_nodes / 4);

    heap.push(State {
        cost: 0.0,
        node: start,
    });
    distances.insert(start, 0.0);

    let mut reached = None;
    while let Some(State { cost, node }) = heap.pop() {
        if settled.put(node.index()) {
            continue;
        }
        if node == target {
            reached = Some(cost);
            break;
        }

        for edge in graph.edges(node) {
            let next = edge.target();
            let travel_time = edge.weight().travel_time_min;
            if !travel_time.is_finite() || settled.contains(next.index()) {
                continue;
            }
            let next_cost = cost + travel_time;

            match distances.entry(next) {
                hashbrown::hash_map::Entry::Vacant(entry) => {
                    entry.insert(next_cost);
                }
                hashbrown::hash_map::Entry::Occupied(mut entry) => {
                    if next_cost >= *entry.get() {
                        continue;
                    }
                    *entry.get_mut() = next_cost;
                }
            }
            predecessors.insert(next, edge.id());
            heap.push(State {
                cost: next_cost,
                node: next,
            });
        }
    }

    let cost = reached?;

    // Follow predecessor edges backward from target to start
    let mut edges = Vec::new();
    let mut nodes = vec![target];
    let mut current = target;
    while current != start {
        let edge = *predecessors.get(&current)?;
        let (source, _) = graph.graph.edge_endpoints(edge)?;
        edges.push(edge);
        nodes.push(source);
        current = source;
    }
    edges.reverse();
    nodes.reverse();

    Some(TracedPath { nodes, edges, cost })
}
