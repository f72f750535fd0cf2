//! Shortest-path search and the route audit engine

pub mod audit;
pub mod dijkstra;
pub mod itinerary;

pub use audit::{
    RouteQuery, RouteResult, RouteStatus, TraversedEdge, UnreachableReason, audit_routes,
    audit_routes_with, solve_route,
};
pub use dijkstra::{TracedPath, least_time_path};
pub use itinerary::{AttributeShare, RouteBreakdown};
