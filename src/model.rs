use std::fmt;

use log::info;
use roadnet_core::prelude::*;

use crate::audit::AuditRun;

/// RoadNetwork
///
/// Routable road graph built from raw segment records, together with the
/// diagnostics of every build stage and the configuration it was built with.
///
/// Core components:
///
/// - Directed multigraph with per-edge travel times
/// - Spatial index for snapping query points to nodes
/// - Build report with per-stage counts and attribute coverage
#[derive(Debug, Clone)]
pub struct RoadNetwork {
    pub(crate) graph: RoadGraph,
    report: BuildReport,
    config: PipelineConfig,
}

impl RoadNetwork {
    /// Runs the full build pipeline
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid.
    pub fn build(segments: Vec<RawSegment>, config: PipelineConfig) -> Result<Self, Error> {
        let (graph, report) = build_road_graph(segments, &config)?;
        let network = Self {
            graph,
            report,
            config,
        };
        info!("{network}");
        Ok(network)
    }

    /// Runs the build pipeline with a custom intersection consolidation
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid.
    pub fn build_with(
        segments: Vec<RawSegment>,
        config: PipelineConfig,
        routine: &dyn ConsolidationRoutine,
    ) -> Result<Self, Error> {
        let (graph, report) = build_road_graph_with(segments, &config, routine)?;
        Ok(Self {
            graph,
            report,
            config,
        })
    }

    /// Builds from a JSON array of raw segment records
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or `config` is invalid.
    pub fn from_json(json: &str, config: PipelineConfig) -> Result<Self, Error> {
        let segments: Vec<RawSegment> = serde_json::from_str(json).map_err(std::io::Error::from)?;
        Self::build(segments, config)
    }

    pub fn graph(&self) -> &RoadGraph {
        &self.graph
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Build report serialized as pretty-printed JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the report cannot be serialized.
    pub fn report_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(&self.report).map_err(std::io::Error::from)?)
    }

    /// Runs a batch of route queries on the configured worker pool
    ///
    /// # Errors
    ///
    /// Returns an error if the worker pool cannot be created.
    pub fn audit(&self, queries: &[RouteQuery]) -> Result<AuditRun, Error> {
        let results = audit_routes(&self.graph, queries, &self.config.audit)?;
        Ok(AuditRun::new(results))
    }
}

impl fmt::Display for RoadNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let consolidation = match &self.report.consolidation {
            ConsolidationOutcome::Disabled => "disabled".to_string(),
            ConsolidationOutcome::Skipped { components, .. } => {
                format!("skipped, {components} components")
            }
            ConsolidationOutcome::Consolidated { stats, .. } => {
                format!("{} clusters merged", stats.clusters)
            }
            ConsolidationOutcome::Failed { reason, .. } => format!("failed, {reason}"),
        };
        write!(
            f,
            "RoadNetwork with {} nodes and {} edges from {} segments (consolidation: {})",
            self.node_count(),
            self.edge_count(),
            self.report.sanitize.input,
            consolidation
        )
    }
}
