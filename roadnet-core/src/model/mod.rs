//! Data model for road network construction and routing
//!
//! Contains the raw and canonical segment records, the candidate
//! directed network handed between build stages and the final graph.

pub mod segment;
pub mod streets;

pub use segment::{
    Category, InferenceFlags, PavementStatus, PavementSurface, ProjectedSegment, RawSegment,
    RoadAttributes, RoadClass, Segment, TrafficDirection,
};
pub use streets::{DirectedEdge, DirectedNetwork, IndexedPoint, RoadGraph, RoadNode};
