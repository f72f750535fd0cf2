//! Intersection consolidation with a connectivity guard and failure fallback
//!
//! The clustering itself sits behind [`ConsolidationRoutine`]. The wrapper
//! [`consolidate_intersections`] decides whether the routine runs at all and
//! returns the untouched network whenever it is skipped or fails, so a build
//! always completes.

use std::panic::{self, AssertUnwindSafe};

use geo::{Coord, LineString, Point};
use hashbrown::{HashMap, HashSet};
use log::{debug, info, warn};
use petgraph::unionfind::UnionFind;
use rstar::{RTree, primitives::GeomWithData};
use serde::Serialize;

use super::config::ConsolidationConfig;
use crate::{
    Error, NodeId,
    error::panic_message,
    model::{DirectedEdge, DirectedNetwork, RoadNode, TrafficDirection},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConsolidationStats {
    pub nodes_before: usize,
    pub nodes_after: usize,
    pub edges_before: usize,
    pub edges_after: usize,
    /// Clusters of two or more nodes that were merged
    pub clusters: usize,
    /// Node pairs found within tolerance, over all clustering rounds
    pub candidate_pairs: usize,
    pub self_loops_dropped: usize,
    pub pass_through_removed: usize,
}

/// What the consolidator did with the network
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConsolidationOutcome {
    Disabled,
    /// Too many weak components; the routine was not invoked
    Skipped { components: usize, threshold: usize },
    Consolidated {
        components: usize,
        stats: ConsolidationStats,
    },
    /// The routine errored or panicked; the input network was kept
    Failed { components: usize, reason: String },
}

impl ConsolidationOutcome {
    /// Whether the unconsolidated network was kept as a fallback
    pub fn fell_back(&self) -> bool {
        matches!(self, Self::Skipped { .. } | Self::Failed { .. })
    }
}

/// Node-merging strategy run by [`consolidate_intersections`]
pub trait ConsolidationRoutine {
    fn consolidate(
        &self,
        network: &DirectedNetwork,
        config: &ConsolidationConfig,
    ) -> Result<(DirectedNetwork, ConsolidationStats), Error>;
}

/// Runs `routine` unless the network is too fragmented, falling back to the
/// input network when the routine fails
pub fn consolidate_intersections(
    network: DirectedNetwork,
    config: &ConsolidationConfig,
    routine: &dyn ConsolidationRoutine,
) -> (DirectedNetwork, ConsolidationOutcome) {
    if !config.enabled {
        info!("Intersection consolidation disabled");
        return (network, ConsolidationOutcome::Disabled);
    }

    let components = network.weak_component_count();
    if components > config.component_skip_threshold {
        warn!(
            "Network has {} weakly connected components (threshold {}) - skipping consolidation",
            components, config.component_skip_threshold
        );
        return (
            network,
            ConsolidationOutcome::Skipped {
                components,
                threshold: config.component_skip_threshold,
            },
        );
    }

    let attempt = panic::catch_unwind(AssertUnwindSafe(|| routine.consolidate(&network, config)));
    let reason = match attempt {
        Ok(Ok((consolidated, stats))) => {
            info!(
                "Consolidated {} nodes into {} ({} clusters, {} self-loops dropped, {} pass-through nodes removed)",
                stats.nodes_before,
                stats.nodes_after,
                stats.clusters,
                stats.self_loops_dropped,
                stats.pass_through_removed
            );
            return (
                consolidated,
                ConsolidationOutcome::Consolidated { components, stats },
            );
        }
        Ok(Err(err)) => err.to_string(),
        Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
    };

    warn!("Consolidation failed ({reason}) - using the unconsolidated network");
    (network, ConsolidationOutcome::Failed { components, reason })
}

/// Single-linkage clustering of nearby intersections
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterConsolidation;

impl ConsolidationRoutine for ClusterConsolidation {
    fn consolidate(
        &self,
        network: &DirectedNetwork,
        config: &ConsolidationConfig,
    ) -> Result<(DirectedNetwork, ConsolidationStats), Error> {
        let mut stats = ConsolidationStats {
            nodes_before: network.node_count(),
            edges_before: network.edge_count(),
            ..ConsolidationStats::default()
        };

        let degrees = network.undirected_degrees();
        let candidates: Vec<&RoadNode> = network
            .nodes
            .iter()
            .filter(|node| config.merge_dead_ends || degrees.get(&node.id).is_some_and(|&d| d > 1))
            .collect();

        let clusters = cluster_nodes(
            &candidates,
            config.tolerance_m,
            config.max_candidate_pairs,
            &mut stats,
        )?;
        stats.clusters = clusters.len();

        let mut merged = merge_clusters(network, &clusters, &mut stats);
        if config.simplify_pass_through {
            stats.pass_through_removed = simplify_pass_through(&mut merged);
        }

        stats.nodes_after = merged.node_count();
        stats.edges_after = merged.edge_count();
        Ok((merged, stats))
    }
}

type IndexedCentroid = GeomWithData<[f64; 2], usize>;

/// Groups candidates into clusters whose centroids are pairwise farther
/// apart than `tolerance`; only clusters of two or more are returned
fn cluster_nodes(
    candidates: &[&RoadNode],
    tolerance: f64,
    budget: Option<usize>,
    stats: &mut ConsolidationStats,
) -> Result<Vec<Vec<NodeId>>, Error> {
    let positions: Vec<[f64; 2]> = candidates
        .iter()
        .map(|node| [node.geometry.x(), node.geometry.y()])
        .collect();
    let mut clusters: Vec<Vec<usize>> = (0..candidates.len()).map(|i| vec![i]).collect();
    let mut centroids = positions.clone();
    let max_distance_2 = tolerance * tolerance;
    let mut round = 0;

    loop {
        round += 1;
        let tree = RTree::bulk_load(
            centroids
                .iter()
                .enumerate()
                .map(|(idx, centroid)| IndexedCentroid::new(*centroid, idx))
                .collect(),
        );

        let mut union_find = UnionFind::<usize>::new(clusters.len());
        let mut merged_any = false;
        for (idx, centroid) in centroids.iter().enumerate() {
            for neighbour in tree.locate_within_distance(*centroid, max_distance_2) {
                if neighbour.data <= idx {
                    continue;
                }
                stats.candidate_pairs += 1;
                if let Some(budget) = budget {
                    if stats.candidate_pairs > budget {
                        return Err(Error::ConsolidationBudgetExceeded {
                            pairs: stats.candidate_pairs,
                            budget,
                        });
                    }
                }
                merged_any |= union_find.union(idx, neighbour.data);
            }
        }

        if !merged_any {
            break;
        }

        let mut groups: Vec<Vec<usize>> = vec![Vec::new(); clusters.len()];
        for (cluster, label) in union_find.into_labeling().into_iter().enumerate() {
            groups[label].append(&mut clusters[cluster]);
        }
        clusters = groups.into_iter().filter(|g| !g.is_empty()).collect();
        centroids = clusters
            .iter()
            .map(|members| centroid(members.iter().map(|&m| positions[m])))
            .collect();
        debug!("Clustering round {round}: {} clusters", clusters.len());
    }

    Ok(clusters
        .into_iter()
        .filter(|members| members.len() > 1)
        .map(|members| members.into_iter().map(|m| candidates[m].id).collect())
        .collect())
}

fn centroid(points: impl Iterator<Item = [f64; 2]>) -> [f64; 2] {
    let (mut x, mut y, mut count) = (0.0, 0.0, 0.0);
    for [px, py] in points {
        x += px;
        y += py;
        count += 1.0;
    }
    [x / count, y / count]
}

/// Replaces every cluster by one node at its centroid and rewires edges.
///
/// The merged node keeps the smallest member id.
fn merge_clusters(
    network: &DirectedNetwork,
    clusters: &[Vec<NodeId>],
    stats: &mut ConsolidationStats,
) -> DirectedNetwork {
    let original: HashMap<NodeId, &RoadNode> =
        network.nodes.iter().map(|node| (node.id, node)).collect();
    let mut remap: HashMap<NodeId, NodeId> = HashMap::new();
    let mut merged_nodes: HashMap<NodeId, RoadNode> = HashMap::with_capacity(clusters.len());
    let mut centroids: HashMap<NodeId, Coord<f64>> = HashMap::with_capacity(clusters.len());

    for members in clusters {
        let Some(&representative) = members.iter().min() else {
            continue;
        };
        let member_nodes: Vec<&RoadNode> =
            members.iter().filter_map(|id| original.get(id).copied()).collect();
        let [x, y] = centroid(member_nodes.iter().map(|n| [n.geometry.x(), n.geometry.y()]));

        for &member in members {
            remap.insert(member, representative);
        }
        centroids.insert(representative, Coord { x, y });
        merged_nodes.insert(
            representative,
            RoadNode {
                id: representative,
                geometry: Point::new(x, y),
                merged_from: member_nodes.iter().map(|n| n.merged_from).sum(),
            },
        );
    }

    let nodes = network
        .nodes
        .iter()
        .filter_map(|node| match remap.get(&node.id) {
            None => Some(node.clone()),
            Some(_) => merged_nodes.remove(&node.id),
        })
        .collect();

    let mut edges = Vec::with_capacity(network.edges.len());
    for edge in &network.edges {
        let origin = remap.get(&edge.origin).copied();
        let destination = remap.get(&edge.destination).copied();
        if origin.is_none() && destination.is_none() {
            edges.push(edge.clone());
            continue;
        }

        let new_origin = origin.unwrap_or(edge.origin);
        let new_destination = destination.unwrap_or(edge.destination);
        if new_origin == new_destination && edge.origin != edge.destination {
            stats.self_loops_dropped += 1;
            continue;
        }

        let position = |id: NodeId| original.get(&id).map(|node| node.geometry.0);
        let target = |id: NodeId| remap.get(&id).and_then(|rep| centroids.get(rep)).copied();

        let mut rewired = edge.clone();
        rewired.origin = new_origin;
        rewired.destination = new_destination;
        if let (Some(from), Some(to)) = (position(edge.origin), position(edge.destination)) {
            let (origin_end, destination_end) = extremity_indices(&rewired.geometry, from, to);
            if let Some(point) = target(edge.origin) {
                rewired.geometry.0[origin_end] = point;
            }
            if let Some(point) = target(edge.destination) {
                rewired.geometry.0[destination_end] = point;
            }
        }
        rewired.measure();
        edges.push(rewired);
    }

    DirectedNetwork::new(nodes, edges)
}

/// Indices of the polyline vertices at the origin and destination nodes.
///
/// Reverse-only edges keep their recorded vertex order, so the origin can
/// sit at either end of the geometry.
fn extremity_indices(line: &LineString<f64>, origin: Coord<f64>, destination: Coord<f64>) -> (usize, usize) {
    let last = line.0.len().saturating_sub(1);
    let (Some(first_coord), Some(last_coord)) = (line.0.first(), line.0.last()) else {
        return (0, last);
    };
    let distance = |a: &Coord<f64>, b: Coord<f64>| (a.x - b.x).hypot(a.y - b.y);
    let forward = distance(first_coord, origin) + distance(last_coord, destination);
    let backward = distance(first_coord, destination) + distance(last_coord, origin);
    if forward <= backward { (0, last) } else { (last, 0) }
}

/// Collapses nodes whose only traffic passes straight through between two
/// neighbours on identical road attributes. Returns the number of nodes removed.
fn simplify_pass_through(network: &mut DirectedNetwork) -> usize {
    let positions: HashMap<NodeId, Coord<f64>> = network
        .nodes
        .iter()
        .map(|node| (node.id, node.geometry.0))
        .collect();
    let mut incident: HashMap<NodeId, Vec<usize>> = HashMap::new();
    for (idx, edge) in network.edges.iter().enumerate() {
        incident.entry(edge.origin).or_default().push(idx);
        if edge.destination != edge.origin {
            incident.entry(edge.destination).or_default().push(idx);
        }
    }
    let mut edges: Vec<Option<DirectedEdge>> =
        std::mem::take(&mut network.edges).into_iter().map(Some).collect();

    let mut removed: HashSet<NodeId> = HashSet::new();
    let candidates: Vec<NodeId> = network.nodes.iter().map(|node| node.id).collect();
    for node in candidates {
        let Some(chains) = pass_through_chains(node, &incident, &edges) else {
            continue;
        };
        let Some(&junction) = positions.get(&node) else {
            continue;
        };

        for (inbound, outbound) in chains {
            let (Some(first), Some(second)) = (edges[inbound].take(), edges[outbound].take()) else {
                continue;
            };
            let joined = join_edges(first, second, junction);
            let new_idx = edges.len();
            for endpoint in [joined.origin, joined.destination] {
                if let Some(list) = incident.get_mut(&endpoint) {
                    list.retain(|&idx| idx != inbound && idx != outbound);
                    list.push(new_idx);
                }
            }
            edges.push(Some(joined));
        }
        incident.remove(&node);
        removed.insert(node);
    }

    network.edges = edges.into_iter().flatten().collect();
    network.nodes.retain(|node| !removed.contains(&node.id));
    removed.len()
}

/// Inbound/outbound edge pairs forming straight chains through `node`
fn pass_through_chains(
    node: NodeId,
    incident: &HashMap<NodeId, Vec<usize>>,
    edges: &[Option<DirectedEdge>],
) -> Option<Vec<(usize, usize)>> {
    let live: Vec<(usize, &DirectedEdge)> = incident
        .get(&node)?
        .iter()
        .filter_map(|&idx| edges[idx].as_ref().map(|edge| (idx, edge)))
        .collect();
    if live.iter().any(|(_, edge)| edge.origin == edge.destination) {
        return None;
    }

    let neighbours: HashSet<NodeId> = live
        .iter()
        .map(|(_, edge)| if edge.origin == node { edge.destination } else { edge.origin })
        .collect();
    if neighbours.len() != 2 {
        return None;
    }

    let inbound: Vec<_> = live.iter().filter(|(_, e)| e.destination == node).collect();
    let outbound: Vec<_> = live.iter().filter(|(_, e)| e.origin == node).collect();
    let chains = |pairs: &[(usize, usize)]| -> Option<Vec<(usize, usize)>> {
        pairs
            .iter()
            .map(|&(i, o)| {
                let (in_idx, in_edge) = inbound[i];
                let (out_idx, out_edge) = outbound[o];
                (in_edge.origin != out_edge.destination && in_edge.same_road_as(out_edge))
                    .then_some((*in_idx, *out_idx))
            })
            .collect()
    };

    match (inbound.len(), outbound.len()) {
        (1, 1) => chains(&[(0, 0)]),
        (2, 2) => chains(&[(0, 0), (1, 1)]).or_else(|| chains(&[(0, 1), (1, 0)])),
        _ => None,
    }
}

/// Chains `first` (a -> n) and `second` (n -> b) into one edge a -> b
fn join_edges(first: DirectedEdge, second: DirectedEdge, junction: Coord<f64>) -> DirectedEdge {
    let near = |a: Coord<f64>, b: Coord<f64>| (a.x - b.x).hypot(a.y - b.y);
    let in_travel_order = |edge: &DirectedEdge, ends_at_junction: bool| -> Vec<Coord<f64>> {
        let mut coords = edge.geometry.0.clone();
        let (Some(&head), Some(&tail)) = (coords.first(), coords.last()) else {
            return coords;
        };
        let junction_at_tail = near(tail, junction) <= near(head, junction);
        if junction_at_tail != ends_at_junction {
            coords.reverse();
        }
        coords
    };

    let mut coords = in_travel_order(&first, true);
    coords.extend(in_travel_order(&second, false).into_iter().skip(1));
    if first.attributes.traffic_direction == TrafficDirection::OppositeDirection {
        coords.reverse();
    }

    let mut joined = DirectedEdge {
        segment_id: format!("{}+{}", first.segment_id, second.segment_id),
        origin: first.origin,
        destination: second.destination,
        geometry: LineString::new(coords),
        length_m: 0.0,
        speed_kmh: first.speed_kmh,
        travel_time_min: first.travel_time_min + second.travel_time_min,
        attributes: first.attributes,
    };
    joined.measure();
    joined
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use geo::line_string;

    use super::*;
    use crate::model::{RoadAttributes, RoadClass};

    fn two_way(origin: NodeId, destination: NodeId, from: (f64, f64), to: (f64, f64)) -> [DirectedEdge; 2] {
        let forward = DirectedEdge {
            segment_id: format!("{origin}-{destination}"),
            origin,
            destination,
            geometry: line_string![(x: from.0, y: from.1), (x: to.0, y: to.1)],
            length_m: (to.0 - from.0).hypot(to.1 - from.1),
            speed_kmh: 40.0,
            travel_time_min: 0.0,
            attributes: RoadAttributes {
                traffic_direction: TrafficDirection::BothDirections,
                speed_limit: Some(40.0),
                ..RoadAttributes::default()
            },
        };
        let mut reverse = forward.clone();
        reverse.origin = destination;
        reverse.destination = origin;
        reverse.geometry = LineString::new(forward.geometry.0.iter().rev().copied().collect());
        [forward, reverse]
    }

    /// Crossroads whose centre is split into two nodes 4 m apart
    fn split_crossroads() -> DirectedNetwork {
        let nodes = vec![
            RoadNode::new(0, Point::new(0.0, 0.0)),
            RoadNode::new(1, Point::new(4.0, 0.0)),
            RoadNode::new(2, Point::new(-200.0, 0.0)),
            RoadNode::new(3, Point::new(200.0, 0.0)),
            RoadNode::new(4, Point::new(0.0, 200.0)),
            RoadNode::new(5, Point::new(4.0, -200.0)),
        ];
        let edges = [
            two_way(2, 0, (-200.0, 0.0), (0.0, 0.0)),
            two_way(0, 1, (0.0, 0.0), (4.0, 0.0)),
            two_way(1, 3, (4.0, 0.0), (200.0, 0.0)),
            two_way(4, 0, (0.0, 200.0), (0.0, 0.0)),
            two_way(1, 5, (4.0, 0.0), (4.0, -200.0)),
        ]
        .into_iter()
        .flatten()
        .collect();
        DirectedNetwork::new(nodes, edges)
    }

    /// `count` disconnected two-node road pieces
    fn fragmented(count: usize) -> DirectedNetwork {
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        for piece in 0..count {
            let x = piece as f64 * 1_000.0;
            let (a, b) = (piece * 2, piece * 2 + 1);
            nodes.push(RoadNode::new(a, Point::new(x, 0.0)));
            nodes.push(RoadNode::new(b, Point::new(x + 100.0, 0.0)));
            edges.extend(two_way(a, b, (x, 0.0), (x + 100.0, 0.0)));
        }
        DirectedNetwork::new(nodes, edges)
    }

    #[derive(Default)]
    struct CountingRoutine {
        calls: Cell<usize>,
    }

    impl ConsolidationRoutine for CountingRoutine {
        fn consolidate(
            &self,
            network: &DirectedNetwork,
            config: &ConsolidationConfig,
        ) -> Result<(DirectedNetwork, ConsolidationStats), Error> {
            self.calls.set(self.calls.get() + 1);
            ClusterConsolidation.consolidate(network, config)
        }
    }

    struct FailingRoutine;

    impl ConsolidationRoutine for FailingRoutine {
        fn consolidate(
            &self,
            _: &DirectedNetwork,
            _: &ConsolidationConfig,
        ) -> Result<(DirectedNetwork, ConsolidationStats), Error> {
            Err(Error::Consolidation("out of memory".to_string()))
        }
    }

    struct PanickingRoutine;

    impl ConsolidationRoutine for PanickingRoutine {
        fn consolidate(
            &self,
            _: &DirectedNetwork,
            _: &ConsolidationConfig,
        ) -> Result<(DirectedNetwork, ConsolidationStats), Error> {
            panic!("cluster index overflow")
        }
    }

    #[test]
    fn merges_split_intersection() {
        let (network, outcome) = consolidate_intersections(
            split_crossroads(),
            &ConsolidationConfig::default(),
            &ClusterConsolidation,
        );

        let ConsolidationOutcome::Consolidated { stats, .. } = outcome else {
            panic!("expected consolidation, got {outcome:?}");
        };
        assert_eq!(stats.clusters, 1);
        assert_eq!(stats.self_loops_dropped, 2);
        assert_eq!(network.node_count(), 5);
        assert_eq!(network.edge_count(), 8);

        let centre = network.node(0).expect("merged node keeps smallest id");
        assert_eq!(centre.merged_from, 2);
        assert!((centre.geometry.x() - 2.0).abs() < 1e-9);

        // Edge extremities follow the merged node and lengths are re-measured
        let west = network
            .edges
            .iter()
            .find(|e| e.origin == 2 && e.destination == 0)
            .expect("west approach");
        assert_eq!(west.geometry.0.last().map(|c| c.x), Some(2.0));
        assert!((west.length_m - 202.0).abs() < 1e-9);
        let south = network
            .edges
            .iter()
            .find(|e| e.origin == 5 && e.destination == 0)
            .expect("south approach");
        assert!((south.length_m - 2.0_f64.hypot(200.0)).abs() < 1e-9);
        assert_eq!(south.geometry.0.last().map(|c| (c.x, c.y)), Some((2.0, 0.0)));
    }

    #[test]
    fn no_two_nodes_within_tolerance_after_merge() {
        // A chain of nodes 10 m apart collapses transitively
        let nodes: Vec<_> = (0..5)
            .map(|i| RoadNode::new(i, Point::new(i as f64 * 10.0, 0.0)))
            .chain([
                RoadNode::new(10, Point::new(0.0, 500.0)),
                RoadNode::new(11, Point::new(40.0, 500.0)),
            ])
            .collect();
        let mut edges: Vec<_> = (0..4)
            .flat_map(|i| {
                two_way(i, i + 1, (i as f64 * 10.0, 0.0), ((i + 1) as f64 * 10.0, 0.0))
            })
            .collect();
        edges.extend(two_way(10, 0, (0.0, 500.0), (0.0, 0.0)));
        edges.extend(two_way(11, 4, (40.0, 500.0), (40.0, 0.0)));
        edges.extend(two_way(10, 11, (0.0, 500.0), (40.0, 500.0)));

        let config = ConsolidationConfig::default();
        let (network, outcome) =
            consolidate_intersections(DirectedNetwork::new(nodes, edges), &config, &ClusterConsolidation);
        assert!(matches!(outcome, ConsolidationOutcome::Consolidated { .. }));

        for (i, a) in network.nodes.iter().enumerate() {
            for b in &network.nodes[i + 1..] {
                let distance = (a.geometry.x() - b.geometry.x()).hypot(a.geometry.y() - b.geometry.y());
                assert!(distance > config.tolerance_m, "{} and {} are {distance} m apart", a.id, b.id);
            }
        }
    }

    #[test]
    fn dead_ends_are_kept_unless_configured() {
        let nodes = vec![
            RoadNode::new(0, Point::new(0.0, 0.0)),
            RoadNode::new(1, Point::new(5.0, 0.0)),
        ];
        let edges = two_way(0, 1, (0.0, 0.0), (5.0, 0.0)).to_vec();
        let network = DirectedNetwork::new(nodes, edges);

        let (kept, _) =
            consolidate_intersections(network.clone(), &ConsolidationConfig::default(), &ClusterConsolidation);
        assert_eq!(kept, network);

        let config = ConsolidationConfig {
            merge_dead_ends: true,
            ..ConsolidationConfig::default()
        };
        let (merged, _) = consolidate_intersections(network, &config, &ClusterConsolidation);
        assert_eq!(merged.node_count(), 1);
        assert!(merged.edges.is_empty());
    }

    #[test]
    fn fragmented_network_skips_the_routine() {
        let network = fragmented(51);
        assert_eq!(network.weak_component_count(), 51);

        let routine = CountingRoutine::default();
        let (result, outcome) =
            consolidate_intersections(network.clone(), &ConsolidationConfig::default(), &routine);

        assert_eq!(routine.calls.get(), 0);
        assert_eq!(result, network);
        assert_eq!(
            outcome,
            ConsolidationOutcome::Skipped {
                components: 51,
                threshold: 50
            }
        );
        assert!(outcome.fell_back());
    }

    #[test]
    fn threshold_is_inclusive() {
        let routine = CountingRoutine::default();
        let (_, outcome) =
            consolidate_intersections(fragmented(50), &ConsolidationConfig::default(), &routine);
        assert_eq!(routine.calls.get(), 1);
        assert!(matches!(outcome, ConsolidationOutcome::Consolidated { components: 50, .. }));
    }

    #[test]
    fn failing_routine_falls_back_to_input() {
        let network = split_crossroads();
        let (result, outcome) =
            consolidate_intersections(network.clone(), &ConsolidationConfig::default(), &FailingRoutine);
        assert_eq!(result, network);
        assert!(matches!(outcome, ConsolidationOutcome::Failed { ref reason, .. } if reason.contains("out of memory")));
    }

    #[test]
    fn panicking_routine_falls_back_to_input() {
        let network = split_crossroads();
        let (result, outcome) =
            consolidate_intersections(network.clone(), &ConsolidationConfig::default(), &PanickingRoutine);
        assert_eq!(result, network);
        assert!(matches!(outcome, ConsolidationOutcome::Failed { ref reason, .. } if reason.contains("cluster index overflow")));
    }

    #[test]
    fn pair_budget_turns_into_fallback() {
        let config = ConsolidationConfig {
            max_candidate_pairs: Some(0),
            ..ConsolidationConfig::default()
        };
        let network = split_crossroads();
        let (result, outcome) = consolidate_intersections(network.clone(), &config, &ClusterConsolidation);
        assert_eq!(result, network);
        assert!(matches!(outcome, ConsolidationOutcome::Failed { .. }));
    }

    #[test]
    fn disabled_consolidation_passes_through() {
        let config = ConsolidationConfig {
            enabled: false,
            ..ConsolidationConfig::default()
        };
        let network = split_crossroads();
        let (result, outcome) = consolidate_intersections(network.clone(), &config, &ClusterConsolidation);
        assert_eq!(result, network);
        assert_eq!(outcome, ConsolidationOutcome::Disabled);
    }

    #[test]
    fn pass_through_nodes_are_collapsed() {
        let nodes = vec![
            RoadNode::new(0, Point::new(0.0, 0.0)),
            RoadNode::new(1, Point::new(100.0, 0.0)),
            RoadNode::new(2, Point::new(200.0, 50.0)),
        ];
        let edges = [
            two_way(0, 1, (0.0, 0.0), (100.0, 0.0)),
            two_way(1, 2, (100.0, 0.0), (200.0, 50.0)),
        ]
        .into_iter()
        .flatten()
        .collect();
        let config = ConsolidationConfig {
            simplify_pass_through: true,
            ..ConsolidationConfig::default()
        };

        let (network, outcome) =
            consolidate_intersections(DirectedNetwork::new(nodes, edges), &config, &ClusterConsolidation);
        let ConsolidationOutcome::Consolidated { stats, .. } = outcome else {
            panic!("expected consolidation, got {outcome:?}");
        };
        assert_eq!(stats.pass_through_removed, 1);
        assert_eq!(network.node_count(), 2);
        assert_eq!(network.edge_count(), 2);

        let expected = 100.0 + 100.0_f64.hypot(50.0);
        for edge in &network.edges {
            assert!((edge.length_m - expected).abs() < 1e-9);
            assert_eq!(edge.geometry.0.len(), 3);
        }
        let forward = network
            .edges
            .iter()
            .find(|e| e.origin == 0)
            .expect("forward chain");
        assert_eq!(forward.destination, 2);
        assert_eq!(forward.geometry.0[0], Coord { x: 0.0, y: 0.0 });
    }

    fn chain_of_two(adjust: impl Fn(usize, &mut DirectedEdge)) -> DirectedNetwork {
        let nodes = vec![
            RoadNode::new(0, Point::new(0.0, 0.0)),
            RoadNode::new(1, Point::new(100.0, 0.0)),
            RoadNode::new(2, Point::new(200.0, 0.0)),
        ];
        let mut edges: Vec<DirectedEdge> = [
            two_way(0, 1, (0.0, 0.0), (100.0, 0.0)),
            two_way(1, 2, (100.0, 0.0), (200.0, 0.0)),
        ]
        .into_iter()
        .flatten()
        .collect();
        for (idx, edge) in edges.iter_mut().enumerate() {
            adjust(idx / 2, edge);
        }
        DirectedNetwork::new(nodes, edges)
    }

    fn simplified(network: DirectedNetwork) -> (DirectedNetwork, ConsolidationStats) {
        let config = ConsolidationConfig {
            simplify_pass_through: true,
            ..ConsolidationConfig::default()
        };
        let (network, outcome) = consolidate_intersections(network, &config, &ClusterConsolidation);
        let ConsolidationOutcome::Consolidated { stats, .. } = outcome else {
            panic!("expected consolidation, got {outcome:?}");
        };
        (network, stats)
    }

    #[test]
    fn ferry_legs_keep_their_own_boarding() {
        let (network, stats) = simplified(chain_of_two(|_, edge| {
            edge.attributes.road_class = RoadClass::Ferry;
        }));
        assert_eq!(stats.pass_through_removed, 0);
        assert_eq!(network.node_count(), 3);
        assert_eq!(network.edge_count(), 4);
    }

    #[test]
    fn differing_provenance_blocks_chaining() {
        let (network, stats) = simplified(chain_of_two(|leg, edge| {
            edge.attributes.jurisdiction = Some(format!("district-{leg}"));
        }));
        assert_eq!(stats.pass_through_removed, 0);
        assert_eq!(network.edge_count(), 4);

        let (network, stats) = simplified(chain_of_two(|leg, edge| {
            edge.attributes.inferred.speed_limit = leg == 1;
        }));
        assert_eq!(stats.pass_through_removed, 0);
        assert_eq!(network.edge_count(), 4);
    }
}
