//! Final graph assembly and attribute coverage statistics

use std::collections::BTreeMap;

use log::info;
use serde::Serialize;

use super::{config::CostModel, projection::Projector};
use crate::model::{
    DirectedEdge, DirectedNetwork, PavementSurface, RoadClass, RoadGraph, TrafficDirection,
};

/// Share of edges per provenance, in percent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AttributeCoverage {
    pub known_pct: f64,
    pub inferred_pct: f64,
    pub unknown_pct: f64,
}

impl AttributeCoverage {
    #[allow(clippy::cast_precision_loss)]
    fn tally<'a>(
        edges: impl Iterator<Item = &'a DirectedEdge>,
        classify: impl Fn(&DirectedEdge) -> (bool, bool),
    ) -> Self {
        let (mut known, mut inferred, mut unknown) = (0usize, 0usize, 0usize);
        for edge in edges {
            match classify(edge) {
                (_, true) => inferred += 1,
                (true, false) => known += 1,
                (false, false) => unknown += 1,
            }
        }
        let total = (known + inferred + unknown) as f64;
        if total == 0.0 {
            return Self::default();
        }
        Self {
            known_pct: known as f64 / total * 100.0,
            inferred_pct: inferred as f64 / total * 100.0,
            unknown_pct: unknown as f64 / total * 100.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoverageReport {
    pub nodes: usize,
    pub edges: usize,
    /// Edges with infinite travel time
    pub impassable_edges: usize,
    pub traffic_direction: AttributeCoverage,
    pub pavement_surface: AttributeCoverage,
    pub road_class: AttributeCoverage,
    pub speed_limit: AttributeCoverage,
    pub edges_by_class: BTreeMap<RoadClass, usize>,
}

/// Prices every edge and folds the network into a [`RoadGraph`]
pub fn assemble_graph(
    mut network: DirectedNetwork,
    projector: Projector,
    cost: &CostModel,
) -> (RoadGraph, CoverageReport) {
    for edge in &mut network.edges {
        edge.price(cost);
    }

    let report = coverage(&network);
    info!(
        "Assembled graph with {} nodes and {} edges ({} impassable)",
        report.nodes, report.edges, report.impassable_edges
    );
    info!(
        "Coverage (known/inferred/unknown %): direction {:.1}/{:.1}/{:.1}, surface {:.1}/{:.1}/{:.1}, class {:.1}/{:.1}/{:.1}",
        report.traffic_direction.known_pct,
        report.traffic_direction.inferred_pct,
        report.traffic_direction.unknown_pct,
        report.pavement_surface.known_pct,
        report.pavement_surface.inferred_pct,
        report.pavement_surface.unknown_pct,
        report.road_class.known_pct,
        report.road_class.inferred_pct,
        report.road_class.unknown_pct
    );

    (RoadGraph::new(network, projector), report)
}

fn coverage(network: &DirectedNetwork) -> CoverageReport {
    let edges = &network.edges;
    let mut edges_by_class = BTreeMap::new();
    for edge in edges {
        *edges_by_class.entry(edge.road_class()).or_insert(0) += 1;
    }

    CoverageReport {
        nodes: network.node_count(),
        edges: edges.len(),
        impassable_edges: edges.iter().filter(|e| !e.is_passable()).count(),
        traffic_direction: AttributeCoverage::tally(edges.iter(), |e| {
            (
                e.attributes.traffic_direction != TrafficDirection::Unknown,
                e.attributes.inferred.traffic_direction,
            )
        }),
        pavement_surface: AttributeCoverage::tally(edges.iter(), |e| {
            (
                e.attributes.pavement_surface != PavementSurface::Unknown,
                e.attributes.inferred.pavement_surface,
            )
        }),
        // Road class is never inferred
        road_class: AttributeCoverage::tally(edges.iter(), |e| {
            (e.attributes.road_class != RoadClass::Unknown, false)
        }),
        speed_limit: AttributeCoverage::tally(edges.iter(), |e| {
            (e.attributes.speed_limit.is_some(), e.attributes.inferred.speed_limit)
        }),
        edges_by_class,
    }
}
