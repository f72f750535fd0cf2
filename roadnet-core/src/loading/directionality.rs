//! Conversion of undirected segments into directed edges
//!
//! Each segment is resolved on its own traffic direction. A one-way segment
//! yields exactly one edge and never a synthesized reverse edge.

use geo::{Coord, LineString, Point};
use hashbrown::HashMap;
use log::info;
use serde::Serialize;

use super::config::CostModel;
use crate::{
    NodeId,
    model::{DirectedEdge, DirectedNetwork, ProjectedSegment, RoadNode, TrafficDirection},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionReport {
    pub segments: usize,
    pub bidirectional: usize,
    /// Unknown-direction segments resolved as bidirectional
    pub unknown_as_bidirectional: usize,
    pub forward_only: usize,
    pub reverse_only: usize,
    pub edges: usize,
    pub nodes: usize,
}

/// Travel directions a segment produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Traversal {
    Both,
    Forward,
    Reverse,
}

impl From<TrafficDirection> for Traversal {
    fn from(direction: TrafficDirection) -> Self {
        match direction {
            TrafficDirection::BothDirections | TrafficDirection::Unknown => Traversal::Both,
            TrafficDirection::SameDirection => Traversal::Forward,
            TrafficDirection::OppositeDirection => Traversal::Reverse,
        }
    }
}

/// Assigns node identities to segment extremities by snapping them to a grid
struct NodeRegistry {
    snap: f64,
    keys: HashMap<(i64, i64), NodeId>,
    nodes: Vec<RoadNode>,
}

impl NodeRegistry {
    fn new(snap: f64) -> Self {
        Self {
            snap,
            keys: HashMap::new(),
            nodes: Vec::new(),
        }
    }

    fn node_for(&mut self, coord: Coord<f64>) -> NodeId {
        let next_id = self.nodes.len();
        if !(coord.x.is_finite() && coord.y.is_finite()) {
            // Never share a node between unprojectable extremities
            self.nodes.push(RoadNode::new(next_id, Point::from(coord)));
            return next_id;
        }

        #[allow(clippy::cast_possible_truncation)]
        let key = (
            (coord.x / self.snap).round() as i64,
            (coord.y / self.snap).round() as i64,
        );
        *self.keys.entry(key).or_insert_with(|| {
            self.nodes.push(RoadNode::new(next_id, Point::from(coord)));
            next_id
        })
    }
}

/// Resolves every segment into one or two directed edges
pub fn resolve_directions(
    segments: Vec<ProjectedSegment>,
    node_snap_m: f64,
    cost: &CostModel,
) -> (DirectedNetwork, ResolutionReport) {
    let mut report = ResolutionReport {
        segments: segments.len(),
        ..ResolutionReport::default()
    };
    let mut registry = NodeRegistry::new(node_snap_m);
    let mut edges = Vec::with_capacity(segments.len() * 2);

    for segment in segments {
        let origin = registry.node_for(segment.origin);
        let destination = registry.node_for(segment.destination);
        let direction = segment.attributes.traffic_direction;

        match Traversal::from(direction) {
            Traversal::Both if direction == TrafficDirection::Unknown => {
                report.unknown_as_bidirectional += 1;
            }
            Traversal::Both => report.bidirectional += 1,
            Traversal::Forward => report.forward_only += 1,
            Traversal::Reverse => report.reverse_only += 1,
        }

        edges.extend(directed_edges(segment, origin, destination, cost));
    }

    report.edges = edges.len();
    report.nodes = registry.nodes.len();
    info!(
        "Resolved {} segments into {} directed edges and {} nodes ({} two-way, {} unknown treated as two-way, {} forward, {} reverse)",
        report.segments,
        report.edges,
        report.nodes,
        report.bidirectional,
        report.unknown_as_bidirectional,
        report.forward_only,
        report.reverse_only
    );

    (DirectedNetwork::new(registry.nodes, edges), report)
}

fn directed_edges(
    segment: ProjectedSegment,
    origin: NodeId,
    destination: NodeId,
    cost: &CostModel,
) -> Vec<DirectedEdge> {
    let traversal = Traversal::from(segment.attributes.traffic_direction);
    let mut forward = DirectedEdge {
        segment_id: segment.segment_id,
        origin,
        destination,
        geometry: segment.geometry,
        length_m: segment.length_m,
        speed_kmh: 0.0,
        travel_time_min: 0.0,
        attributes: segment.attributes,
    };
    forward.price(cost);

    match traversal {
        Traversal::Forward => vec![forward],
        // Travel direction lives in the node order; the recorded geometry is kept as is
        Traversal::Reverse => {
            forward.origin = destination;
            forward.destination = origin;
            vec![forward]
        }
        Traversal::Both => {
            let mut reverse = forward.clone();
            reverse.origin = destination;
            reverse.destination = origin;
            reverse.geometry = LineString::new(forward.geometry.coords().rev().copied().collect());
            vec![forward, reverse]
        }
    }
}

#[cfg(test)]
mod tests {
    use geo::{Euclidean, Length, line_string};

    use super::*;
    use crate::model::RoadAttributes;

    fn projected(id: &str, line: LineString<f64>, direction: TrafficDirection) -> ProjectedSegment {
        let coords = &line.0;
        ProjectedSegment {
            segment_id: id.to_string(),
            node_id: None,
            origin: coords[0],
            destination: coords[coords.len() - 1],
            length_m: Euclidean.length(&line),
            geometry: line,
            attributes: RoadAttributes {
                traffic_direction: direction,
                speed_limit: Some(40.0),
                ..RoadAttributes::default()
            },
        }
    }

    fn sample_line() -> LineString<f64> {
        line_string![(x: 0.0, y: 0.0), (x: 300.0, y: 400.0), (x: 600.0, y: 400.0)]
    }

    #[test]
    fn two_way_and_unknown_produce_mirrored_pairs() {
        for direction in [TrafficDirection::BothDirections, TrafficDirection::Unknown] {
            let (network, _) = resolve_directions(
                vec![projected("a", sample_line(), direction)],
                0.1,
                &CostModel::default(),
            );
            assert_eq!(network.edges.len(), 2);

            let (forward, reverse) = (&network.edges[0], &network.edges[1]);
            assert_eq!(forward.origin, reverse.destination);
            assert_eq!(forward.destination, reverse.origin);
            assert_eq!(forward.length_m, reverse.length_m);
            assert_eq!(forward.travel_time_min, reverse.travel_time_min);

            let mirrored: Vec<_> = reverse.geometry.coords().rev().copied().collect();
            assert_eq!(forward.geometry.0, mirrored);
        }
    }

    #[test]
    fn one_way_segments_never_get_a_reverse_edge() {
        let (network, report) = resolve_directions(
            vec![
                projected("fwd", sample_line(), TrafficDirection::SameDirection),
                projected("rev", sample_line(), TrafficDirection::OppositeDirection),
            ],
            0.1,
            &CostModel::default(),
        );
        assert_eq!(network.edges.len(), 2);
        assert_eq!(report.forward_only, 1);
        assert_eq!(report.reverse_only, 1);

        let forward = &network.edges[0];
        let reverse = &network.edges[1];
        assert_eq!(forward.origin, reverse.destination);
        assert_eq!(forward.destination, reverse.origin);
        // Opposite-direction edges keep the recorded vertex order
        assert_eq!(reverse.geometry, sample_line());
    }

    #[test]
    fn shared_extremities_share_a_node() {
        let (network, report) = resolve_directions(
            vec![
                projected(
                    "a",
                    line_string![(x: 0.0, y: 0.0), (x: 100.0, y: 0.0)],
                    TrafficDirection::SameDirection,
                ),
                projected(
                    "b",
                    line_string![(x: 100.02, y: 0.0), (x: 200.0, y: 0.0)],
                    TrafficDirection::SameDirection,
                ),
            ],
            0.1,
            &CostModel::default(),
        );
        assert_eq!(report.nodes, 3);
        assert_eq!(network.edges[0].destination, network.edges[1].origin);
    }

    #[test]
    fn kilometre_at_forty_costs_a_minute_and_a_half() {
        let (network, _) = resolve_directions(
            vec![projected(
                "km",
                line_string![(x: 0.0, y: 0.0), (x: 1000.0, y: 0.0)],
                TrafficDirection::BothDirections,
            )],
            0.1,
            &CostModel::default(),
        );
        for edge in &network.edges {
            assert!((edge.travel_time_min - 1.5).abs() < 1e-9);
        }
    }
}
