//! Removal of coordinate artifacts from the directed network
//!
//! Every check here only removes; surviving nodes and edges are passed
//! through untouched.

use hashbrown::HashSet;
use log::{info, warn};
use serde::Serialize;

use super::config::{BoundingEnvelope, SegmentLimits};
use crate::{NodeId, model::DirectedNetwork};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactReport {
    /// Nodes outside the envelope or with non-finite coordinates
    pub nodes_out_of_bounds: usize,
    /// Edges touching a removed node
    pub edges_orphaned: usize,
    /// Edges with an interior vertex outside the envelope
    pub edges_out_of_bounds: usize,
    /// Edges longer than the plausible maximum
    pub edges_too_long: usize,
    /// Nodes left without any edge
    pub isolated_nodes: usize,
}

impl ArtifactReport {
    pub fn nodes_removed(&self) -> usize {
        self.nodes_out_of_bounds + self.isolated_nodes
    }

    pub fn edges_removed(&self) -> usize {
        self.edges_orphaned + self.edges_out_of_bounds + self.edges_too_long
    }
}

/// Drops nodes and edges whose coordinates fall outside the envelope,
/// edges of implausible length, and nodes left isolated afterwards
pub fn filter_artifacts(
    network: DirectedNetwork,
    envelope: &BoundingEnvelope,
    limits: &SegmentLimits,
) -> (DirectedNetwork, ArtifactReport) {
    let mut report = ArtifactReport::default();
    let DirectedNetwork { nodes, mut edges } = network;

    let (mut nodes, outside): (Vec<_>, Vec<_>) = nodes
        .into_iter()
        .partition(|node| envelope.contains(node.geometry.0));
    report.nodes_out_of_bounds = outside.len();

    let kept: HashSet<NodeId> = nodes.iter().map(|node| node.id).collect();
    edges.retain(|edge| {
        if !(kept.contains(&edge.origin) && kept.contains(&edge.destination)) {
            report.edges_orphaned += 1;
            return false;
        }
        if !edge.geometry.coords().all(|c| envelope.contains(*c)) {
            report.edges_out_of_bounds += 1;
            return false;
        }
        // NaN lengths fail this comparison as well
        if !(edge.length_m <= limits.max_segment_length_m) {
            report.edges_too_long += 1;
            return false;
        }
        true
    });

    let connected: HashSet<NodeId> = edges
        .iter()
        .flat_map(|edge| [edge.origin, edge.destination])
        .collect();
    let before = nodes.len();
    nodes.retain(|node| connected.contains(&node.id));
    report.isolated_nodes = before - nodes.len();

    if report.nodes_out_of_bounds > 0 || report.edges_out_of_bounds > 0 {
        warn!(
            "Found {} nodes and {} edges outside the bounding envelope",
            report.nodes_out_of_bounds, report.edges_out_of_bounds
        );
    }
    info!(
        "Artifact filter removed {} nodes and {} edges ({} too long), {} nodes and {} edges remain",
        report.nodes_removed(),
        report.edges_removed(),
        report.edges_too_long,
        nodes.len(),
        edges.len()
    );

    (DirectedNetwork::new(nodes, edges), report)
}

#[cfg(test)]
mod tests {
    use geo::{LineString, Point, line_string};

    use super::*;
    use crate::model::{DirectedEdge, RoadAttributes, RoadNode};

    fn envelope() -> BoundingEnvelope {
        BoundingEnvelope {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 10_000.0,
            max_y: 10_000.0,
        }
    }

    fn edge(origin: NodeId, destination: NodeId, geometry: LineString<f64>, length_m: f64) -> DirectedEdge {
        DirectedEdge {
            segment_id: format!("{origin}-{destination}"),
            origin,
            destination,
            geometry,
            length_m,
            speed_kmh: 40.0,
            travel_time_min: length_m / 1000.0 / 40.0 * 60.0,
            attributes: RoadAttributes::default(),
        }
    }

    #[test]
    fn drops_nodes_outside_envelope_and_their_edges() {
        let network = DirectedNetwork::new(
            vec![
                RoadNode::new(0, Point::new(100.0, 100.0)),
                RoadNode::new(1, Point::new(200.0, 100.0)),
                RoadNode::new(2, Point::new(-5_000.0, 100.0)),
                RoadNode::new(3, Point::new(f64::NAN, f64::NAN)),
            ],
            vec![
                edge(0, 1, line_string![(x: 100.0, y: 100.0), (x: 200.0, y: 100.0)], 100.0),
                edge(1, 2, line_string![(x: 200.0, y: 100.0), (x: -5_000.0, y: 100.0)], 5_200.0),
                edge(3, 0, line_string![(x: f64::NAN, y: f64::NAN), (x: 100.0, y: 100.0)], f64::NAN),
            ],
        );
        let (filtered, report) = filter_artifacts(network, &envelope(), &SegmentLimits::default());

        assert_eq!(filtered.edge_count(), 1);
        assert_eq!(filtered.node_count(), 2);
        assert_eq!(report.nodes_out_of_bounds, 2);
        assert_eq!(report.edges_orphaned, 2);
    }

    #[test]
    fn drops_excursions_and_overlong_edges_then_isolated_nodes() {
        let limits = SegmentLimits {
            max_segment_length_m: 1_000.0,
            ..SegmentLimits::default()
        };
        let network = DirectedNetwork::new(
            vec![
                RoadNode::new(0, Point::new(100.0, 100.0)),
                RoadNode::new(1, Point::new(200.0, 100.0)),
                RoadNode::new(2, Point::new(5_000.0, 100.0)),
            ],
            vec![
                edge(
                    0,
                    1,
                    line_string![(x: 100.0, y: 100.0), (x: 150.0, y: 20_000.0), (x: 200.0, y: 100.0)],
                    39_800.0,
                ),
                edge(1, 2, line_string![(x: 200.0, y: 100.0), (x: 5_000.0, y: 100.0)], 4_800.0),
            ],
        );
        let (filtered, report) = filter_artifacts(network, &envelope(), &limits);

        assert_eq!(report.edges_out_of_bounds, 1);
        assert_eq!(report.edges_too_long, 1);
        assert_eq!(report.isolated_nodes, 3);
        assert!(filtered.nodes.is_empty());
        assert!(filtered.edges.is_empty());
    }

    #[test]
    fn valid_network_passes_unchanged() {
        let network = DirectedNetwork::new(
            vec![
                RoadNode::new(0, Point::new(100.0, 100.0)),
                RoadNode::new(1, Point::new(200.0, 100.0)),
            ],
            vec![
                edge(0, 1, line_string![(x: 100.0, y: 100.0), (x: 200.0, y: 100.0)], 100.0),
                edge(1, 0, line_string![(x: 200.0, y: 100.0), (x: 100.0, y: 100.0)], 100.0),
            ],
        );
        let (filtered, report) =
            filter_artifacts(network.clone(), &envelope(), &SegmentLimits::default());
        assert_eq!(filtered, network);
        assert_eq!(report, ArtifactReport::default());
    }
}
