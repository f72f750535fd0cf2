//! Parallel route audit against an assembled graph
//!
//! Queries run on a dedicated rayon pool and share the graph read-only.
//! Results come back in submission order, and a failing query never takes
//! down the rest of the batch.

use std::panic::{self, AssertUnwindSafe};

use geo::{LineString, Point};
use log::{info, warn};
use petgraph::graph::NodeIndex;
use rayon::prelude::*;
use serde::Serialize;

use super::{
    dijkstra::{TracedPath, least_time_path},
    itinerary::RouteBreakdown,
};
use crate::{
    Error, Meters, Minutes, NodeId,
    error::panic_message,
    loading::AuditConfig,
    model::{PavementStatus, PavementSurface, RoadClass, RoadGraph, TrafficDirection},
};

/// Origin-destination pair in geographic coordinates (longitude, latitude)
#[derive(Debug, Clone, PartialEq)]
pub struct RouteQuery {
    pub id: String,
    pub origin: Point<f64>,
    pub destination: Point<f64>,
}

impl RouteQuery {
    pub fn new(id: impl Into<String>, origin: Point<f64>, destination: Point<f64>) -> Self {
        Self {
            id: id.into(),
            origin,
            destination,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnreachableReason {
    /// Both endpoints snapped, but no directed path connects them
    NoPath,
    /// An endpoint lies outside the projection domain or too far from any node
    OutOfNetwork,
    EmptyGraph,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum RouteStatus {
    Found,
    Unreachable(UnreachableReason),
    /// The query itself raised an error or panicked
    Failed(String),
}

/// One edge of a found route with the attributes used to cost it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraversedEdge {
    pub segment_id: String,
    pub origin: NodeId,
    pub destination: NodeId,
    pub road_class: RoadClass,
    pub pavement_surface: PavementSurface,
    pub pavement_status: PavementStatus,
    pub traffic_direction: TrafficDirection,
    pub speed_kmh: f64,
    pub length_m: Meters,
    pub travel_time_min: Minutes,
    /// Projected polyline as stored on the edge
    #[serde(skip)]
    pub geometry: LineString<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteResult {
    /// Position of the query in the submitted batch
    pub query_index: usize,
    pub query_id: String,
    pub status: RouteStatus,
    pub origin_node: Option<NodeId>,
    pub destination_node: Option<NodeId>,
    /// Distance from each query endpoint to its snapped node
    pub origin_snap_m: Option<Meters>,
    pub destination_snap_m: Option<Meters>,
    pub distance_m: Meters,
    pub travel_time_min: Minutes,
    pub edges: Vec<TraversedEdge>,
    pub breakdown: RouteBreakdown,
}

impl RouteResult {
    fn empty(query_index: usize, query: &RouteQuery, status: RouteStatus) -> Self {
        Self {
            query_index,
            query_id: query.id.clone(),
            status,
            origin_node: None,
            destination_node: None,
            origin_snap_m: None,
            destination_snap_m: None,
            distance_m: 0.0,
            travel_time_min: 0.0,
            edges: Vec::new(),
            breakdown: RouteBreakdown::default(),
        }
    }

    pub fn is_found(&self) -> bool {
        self.status == RouteStatus::Found
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self.status, RouteStatus::Unreachable(_))
    }
}

/// Runs every query on a worker pool sized by `config`
///
/// # Errors
///
/// Returns an error only if the worker pool cannot be created. Unreachable
/// and failing queries are reported per result.
pub fn audit_routes(
    graph: &RoadGraph,
    queries: &[RouteQuery],
    config: &AuditConfig,
) -> Result<Vec<RouteResult>, Error> {
    audit_routes_with(graph, queries, config, solve_route)
}

/// Runs every query through `solver` on a worker pool sized by `config`
///
/// # Errors
///
/// Returns an error only if the worker pool cannot be created.
pub fn audit_routes_with<F>(
    graph: &RoadGraph,
    queries: &[RouteQuery],
    config: &AuditConfig,
    solver: F,
) -> Result<Vec<RouteResult>, Error>
where
    F: Fn(&RoadGraph, usize, &RouteQuery, &AuditConfig) -> Result<RouteResult, Error> + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_threads.unwrap_or(0))
        .thread_name(|idx| format!("route-audit-{idx}"))
        .build()
        .map_err(|e| Error::WorkerPool(e.to_string()))?;

    info!(
        "Auditing {} routes on {} worker threads",
        queries.len(),
        pool.current_num_threads()
    );

    let results: Vec<RouteResult> = pool.install(|| {
        queries
            .par_iter()
            .enumerate()
            .map(|(idx, query)| run_isolated(&solver, graph, idx, query, config))
            .collect()
    });

    let found = results.iter().filter(|r| r.is_found()).count();
    let unreachable = results.iter().filter(|r| r.is_unreachable()).count();
    let failed = results.len() - found - unreachable;
    if failed > 0 {
        warn!("{failed} route queries failed");
    }
    info!("Route audit finished: {found} found, {unreachable} unreachable, {failed} failed");

    Ok(results)
}

fn run_isolated<F>(
    solver: &F,
    graph: &RoadGraph,
    idx: usize,
    query: &RouteQuery,
    config: &AuditConfig,
) -> RouteResult
where
    F: Fn(&RoadGraph, usize, &RouteQuery, &AuditConfig) -> Result<RouteResult, Error>,
{
    let status = match panic::catch_unwind(AssertUnwindSafe(|| solver(graph, idx, query, config)))
    {
        Ok(Ok(result)) => return result,
        Ok(Err(err)) => RouteStatus::Failed(err.to_string()),
        Err(payload) => RouteStatus::Failed(format!("panicked: {}", panic_message(payload.as_ref()))),
    };
    warn!("Route query '{}' failed: {status:?}", query.id);
    RouteResult::empty(idx, query, status)
}

/// Snaps both endpoints and searches the least-time path between them
///
/// # Errors
///
/// Returns an error if the traced path references an edge missing from the graph.
pub fn solve_route(
    graph: &RoadGraph,
    query_index: usize,
    query: &RouteQuery,
    config: &AuditConfig,
) -> Result<RouteResult, Error> {
    let unreachable = |reason: UnreachableReason| -> Result<RouteResult, Error> {
        Ok(RouteResult::empty(query_index, query, RouteStatus::Unreachable(reason)))
    };

    if graph.is_empty() {
        return unreachable(UnreachableReason::EmptyGraph);
    }

    let (Some(origin), Some(destination)) = (
        snap(graph, query.origin, config),
        snap(graph, query.destination, config),
    ) else {
        return unreachable(UnreachableReason::OutOfNetwork);
    };

    let Some(path) = least_time_path(graph, origin.0, destination.0) else {
        let mut result = RouteResult::empty(
            query_index,
            query,
            RouteStatus::Unreachable(UnreachableReason::NoPath),
        );
        result.origin_node = graph.node(origin.0).map(|n| n.id);
        result.destination_node = graph.node(destination.0).map(|n| n.id);
        result.origin_snap_m = Some(origin.1);
        result.destination_snap_m = Some(destination.1);
        return Ok(result);
    };

    let edges = traversed_edges(graph, &path)?;
    Ok(RouteResult {
        query_index,
        query_id: query.id.clone(),
        status: RouteStatus::Found,
        origin_node: graph.node(origin.0).map(|n| n.id),
        destination_node: graph.node(destination.0).map(|n| n.id),
        origin_snap_m: Some(origin.1),
        destination_snap_m: Some(destination.1),
        distance_m: edges.iter().map(|e| e.length_m).sum(),
        travel_time_min: path.cost,
        breakdown: RouteBreakdown::from_edges(&edges),
        edges,
    })
}

/// Nearest node to a geographic point, within the configured snap distance
fn snap(
    graph: &RoadGraph,
    point: Point<f64>,
    config: &AuditConfig,
) -> Option<(NodeIndex, Meters)> {
    let projected = graph.projector().project_point(point);
    if !(projected.x().is_finite() && projected.y().is_finite()) {
        return None;
    }
    let (index, distance) = graph.nearest_node(&projected)?;
    match config.max_snap_distance_m {
        Some(max) if distance > max => None,
        _ => Some((index, distance)),
    }
}

fn traversed_edges(graph: &RoadGraph, path: &TracedPath) -> Result<Vec<TraversedEdge>, Error> {
    path.edges
        .iter()
        .map(|&index| {
            let edge = graph.edge(index).ok_or(Error::InvalidEdgeIndex)?;
            Ok(TraversedEdge {
                segment_id: edge.segment_id.clone(),
                origin: edge.origin,
                destination: edge.destination,
                road_class: edge.attributes.road_class,
                pavement_surface: edge.attributes.pavement_surface,
                pavement_status: edge.attributes.pavement_status,
                traffic_direction: edge.attributes.traffic_direction,
                speed_kmh: edge.speed_kmh,
                length_m: edge.length_m,
                travel_time_min: edge.travel_time_min,
                geometry: edge.geometry.clone(),
            })
        })
        .collect()
}
