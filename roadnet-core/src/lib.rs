//! Road network graph construction and route auditing.
//!
//! Raw road segments go through a sequential build pipeline
//! (sanitize, project, infer, resolve direction, filter artifacts,
//! consolidate, assemble) and end up as an immutable [`RoadGraph`].
//! The graph is then shared read-only by the route audit worker pool.

pub mod error;
pub mod loading;
pub mod model;
pub mod prelude;
pub mod routing;

pub use error::Error;
pub use loading::{BuildReport, PipelineConfig, build_road_graph};
pub use model::{
    DirectedEdge, DirectedNetwork, PavementStatus, PavementSurface, ProjectedSegment, RawSegment,
    RoadAttributes, RoadClass, RoadGraph, RoadNode, Segment, TrafficDirection,
};
pub use routing::{RouteQuery, RouteResult, RouteStatus, audit_routes};

/// Identifier of a graph node, stable across the build stages
pub type NodeId = usize;
/// Distance in metres
pub type Meters = f64;
/// Travel time in minutes
pub type Minutes = f64;
