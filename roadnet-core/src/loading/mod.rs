//! This module turns raw road segment records into a routable graph.
//!
//! Stages run strictly in order: sanitize, project, infer attributes,
//! resolve traffic direction, filter artifacts, consolidate intersections,
//! assemble.

mod artifacts;
mod assembly;
mod builder;
mod config;
mod consolidation;
mod directionality;
mod inference;
mod projection;
mod sanitize;

pub use artifacts::{ArtifactReport, filter_artifacts};
pub use assembly::{AttributeCoverage, CoverageReport, assemble_graph};
pub use builder::{BuildReport, build_road_graph, build_road_graph_with};
pub use config::{
    AuditConfig, BoundingEnvelope, ConsolidationConfig, CostModel, DefaultSpeeds, PipelineConfig,
    ProjectionParams, SegmentLimits,
};
pub use consolidation::{
    ClusterConsolidation, ConsolidationOutcome, ConsolidationRoutine, ConsolidationStats,
    consolidate_intersections,
};
pub use directionality::{ResolutionReport, resolve_directions};
pub use inference::{FieldCoverage, InferenceReport, infer_attributes};
pub use projection::Projector;
pub use sanitize::{SanitizeReport, UnrecognizedValues, sanitize_segments};
