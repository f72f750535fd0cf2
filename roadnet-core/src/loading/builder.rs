use log::{info, warn};
use serde::Serialize;

use super::{
    artifacts::{ArtifactReport, filter_artifacts},
    assembly::{CoverageReport, assemble_graph},
    config::PipelineConfig,
    consolidation::{
        ClusterConsolidation, ConsolidationOutcome, ConsolidationRoutine,
        consolidate_intersections,
    },
    directionality::{ResolutionReport, resolve_directions},
    inference::{InferenceReport, infer_attributes},
    projection::Projector,
    sanitize::{SanitizeReport, sanitize_segments},
};
use crate::{
    Error,
    model::{RawSegment, RoadGraph},
};

/// Diagnostic counts from every build stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildReport {
    pub sanitize: SanitizeReport,
    pub inference: InferenceReport,
    pub resolution: ResolutionReport,
    pub artifacts: ArtifactReport,
    pub consolidation: ConsolidationOutcome,
    pub coverage: CoverageReport,
}

/// Builds a routable graph from raw segments with the default consolidation
///
/// # Errors
///
/// Returns an error if the configuration is invalid. Data-quality problems
/// never fail the build; they are counted in the returned [`BuildReport`].
pub fn build_road_graph(
    segments: Vec<RawSegment>,
    config: &PipelineConfig,
) -> Result<(RoadGraph, BuildReport), Error> {
    build_road_graph_with(segments, config, &ClusterConsolidation)
}

/// Builds a routable graph, merging intersections with `routine`
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
pub fn build_road_graph_with(
    segments: Vec<RawSegment>,
    config: &PipelineConfig,
    routine: &dyn ConsolidationRoutine,
) -> Result<(RoadGraph, BuildReport), Error> {
    config.validate()?;
    let projector = Projector::new(config.projection)?;

    info!("Building road graph from {} raw segments", segments.len());

    let (segments, sanitize) = sanitize_segments(segments);
    let mut segments = projector.project_segments(segments);
    let inference = infer_attributes(&mut segments, &config.speeds);
    let (network, resolution) =
        resolve_directions(segments, config.limits.node_snap_m, &config.cost);
    let (network, artifacts) = filter_artifacts(network, &config.envelope, &config.limits);
    let (network, consolidation) =
        consolidate_intersections(network, &config.consolidation, routine);
    let (graph, coverage) = assemble_graph(network, projector, &config.cost);

    if graph.is_empty() {
        warn!("Road graph is empty - every segment was dropped or filtered");
    }
    info!("Road graph built successfully");

    // Projection buffers and the intermediate networks are large; return
    // the freed tail of the heap to the system.
    //
    // # Safety
    //
    // This call is safe to use on linux with glibc implementation
    // which is checked by the cfg attribute in compile time.
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    unsafe {
        if libc::malloc_trim(0) == 0 {
            log::debug!("No heap memory released by trimming");
        } else {
            log::debug!("Successfully trimmed unused heap memory");
        }
    }

    Ok((
        graph,
        BuildReport {
            sanitize,
            inference,
            resolution,
            artifacts,
            consolidation,
            coverage,
        },
    ))
}
