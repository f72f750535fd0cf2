//! Road network graph building and route auditing.
//!
//! [`RoadNetwork`] wraps the build pipeline from `roadnet_core` together with
//! its report and configuration. Batches of route queries are summarised by
//! [`AuditRun`], and graphs or routes can be exported as `GeoJSON`.

pub mod audit;
pub mod export;
pub mod model;

pub use audit::{AuditRun, AuditStats, MetricSummary, TripRank};
pub use export::{
    edges_to_geojson, edges_to_geojson_string, nodes_to_geojson, routes_to_geojson,
    routes_to_geojson_string,
};
pub use model::RoadNetwork;
pub use roadnet_core::prelude;
