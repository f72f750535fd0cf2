// Re-export key components
pub use crate::loading::{
    AuditConfig, BoundingEnvelope, BuildReport, ClusterConsolidation, ConsolidationConfig,
    ConsolidationOutcome, ConsolidationRoutine, CostModel, DefaultSpeeds, PipelineConfig,
    Projector, build_road_graph, build_road_graph_with,
};
pub use crate::model::{
    DirectedEdge, DirectedNetwork, PavementStatus, PavementSurface, ProjectedSegment, RawSegment,
    RoadAttributes, RoadClass, RoadGraph, RoadNode, Segment, TrafficDirection,
};
pub use crate::routing::{
    AttributeShare, RouteBreakdown, RouteQuery, RouteResult, RouteStatus, TraversedEdge,
    UnreachableReason, audit_routes, audit_routes_with,
};

// Core scalar types
pub use crate::Error;
pub use crate::Meters;
pub use crate::Minutes;
pub use crate::NodeId;
