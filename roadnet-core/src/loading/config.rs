//! Pipeline configuration

use std::path::Path;

use geo::Coord;
use serde::{Deserialize, Serialize};

use crate::{
    Error, Meters, Minutes,
    model::{PavementStatus, PavementSurface, RoadAttributes, RoadClass},
};

/// Settings for a full graph build and route audit
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub projection: ProjectionParams,
    pub envelope: BoundingEnvelope,
    pub speeds: DefaultSpeeds,
    pub cost: CostModel,
    pub limits: SegmentLimits,
    pub consolidation: ConsolidationConfig,
    pub audit: AuditConfig,
}

impl PipelineConfig {
    /// Parses and validates a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, Error> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!("Failed to read config '{}': {}", path.display(), e),
            )
        })?;
        Self::from_toml_str(&content)
    }

    /// Rejects settings that indicate a configuration mistake.
    ///
    /// Called before any build stage runs.
    pub fn validate(&self) -> Result<(), Error> {
        self.projection.validate()?;
        self.envelope.validate()?;
        self.speeds.validate()?;
        self.cost.validate()?;
        self.limits.validate()?;
        self.consolidation.validate()?;
        self.audit.validate()
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidConfig(message.into())
}

/// Ellipsoidal Albers equal-area conic parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionParams {
    pub semi_major_axis: f64,
    pub inverse_flattening: f64,
    /// First standard parallel, degrees
    pub standard_parallel_1: f64,
    /// Second standard parallel, degrees
    pub standard_parallel_2: f64,
    /// Latitude of origin, degrees
    pub latitude_of_origin: f64,
    /// Central meridian, degrees
    pub central_meridian: f64,
    pub false_easting: f64,
    pub false_northing: f64,
}

impl Default for ProjectionParams {
    /// NAD83 / BC Albers
    fn default() -> Self {
        Self {
            semi_major_axis: 6_378_137.0,
            inverse_flattening: 298.257_222_101,
            standard_parallel_1: 50.0,
            standard_parallel_2: 58.5,
            latitude_of_origin: 45.0,
            central_meridian: -126.0,
            false_easting: 1_000_000.0,
            false_northing: 0.0,
        }
    }
}

impl ProjectionParams {
    fn validate(&self) -> Result<(), Error> {
        if !(self.semi_major_axis.is_finite() && self.semi_major_axis > 0.0) {
            return Err(invalid("projection semi-major axis must be positive"));
        }
        if !(self.inverse_flattening.is_finite() && self.inverse_flattening > 1.0) {
            return Err(invalid("projection inverse flattening must be greater than 1"));
        }
        for (name, lat) in [
            ("standard_parallel_1", self.standard_parallel_1),
            ("standard_parallel_2", self.standard_parallel_2),
            ("latitude_of_origin", self.latitude_of_origin),
        ] {
            if !lat.is_finite() || lat.abs() >= 90.0 {
                return Err(invalid(format!("projection {name} must lie in (-90, 90)")));
            }
        }
        if (self.standard_parallel_1 + self.standard_parallel_2).abs() < 1e-9 {
            return Err(invalid(
                "projection standard parallels must not be symmetric about the equator",
            ));
        }
        if !self.central_meridian.is_finite()
            || !self.false_easting.is_finite()
            || !self.false_northing.is_finite()
        {
            return Err(invalid("projection offsets must be finite"));
        }
        Ok(())
    }
}

/// Plausible extent of the modelled region in projected metres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundingEnvelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Default for BoundingEnvelope {
    fn default() -> Self {
        Self {
            min_x: 200_000.0,
            min_y: 300_000.0,
            max_x: 1_900_000.0,
            max_y: 1_700_000.0,
        }
    }
}

impl BoundingEnvelope {
    /// Inclusive containment; non-finite coordinates are never contained
    pub fn contains(&self, coord: Coord<f64>) -> bool {
        coord.x >= self.min_x && coord.x <= self.max_x && coord.y >= self.min_y && coord.y <= self.max_y
    }

    fn validate(&self) -> Result<(), Error> {
        let finite = [self.min_x, self.min_y, self.max_x, self.max_y]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.min_x >= self.max_x || self.min_y >= self.max_y {
            return Err(invalid(format!(
                "bounding envelope [{}, {}] x [{}, {}] is empty or not finite",
                self.min_x, self.max_x, self.min_y, self.max_y
            )));
        }
        Ok(())
    }
}

/// Default speed per road class and the plausible range for posted speeds, km/h
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultSpeeds {
    pub freeway: f64,
    pub expressway: f64,
    pub arterial: f64,
    pub collector: f64,
    pub local: f64,
    pub resource: f64,
    pub ferry: f64,
    pub rapid_transit: f64,
    pub alleyway: f64,
    pub unknown: f64,
    pub min_kmh: f64,
    pub max_kmh: f64,
}

impl Default for DefaultSpeeds {
    fn default() -> Self {
        Self {
            freeway: 90.0,
            expressway: 90.0,
            arterial: 60.0,
            collector: 50.0,
            local: 40.0,
            resource: 30.0,
            ferry: 10.0,
            rapid_transit: 0.0,
            alleyway: 15.0,
            unknown: 40.0,
            min_kmh: 10.0,
            max_kmh: 130.0,
        }
    }
}

impl DefaultSpeeds {
    pub fn for_class(&self, class: RoadClass) -> f64 {
        match class {
            RoadClass::Freeway => self.freeway,
            RoadClass::Expressway => self.expressway,
            RoadClass::Arterial => self.arterial,
            RoadClass::Collector => self.collector,
            RoadClass::Local => self.local,
            RoadClass::Resource => self.resource,
            RoadClass::Ferry => self.ferry,
            RoadClass::RapidTransit => self.rapid_transit,
            RoadClass::Alleyway => self.alleyway,
            RoadClass::Unknown => self.unknown,
        }
    }

    /// Clamps a posted speed into the plausible range
    pub fn clip(&self, speed: f64) -> f64 {
        speed.clamp(self.min_kmh, self.max_kmh)
    }

    fn validate(&self) -> Result<(), Error> {
        if !(self.min_kmh.is_finite() && self.max_kmh.is_finite())
            || self.min_kmh <= 0.0
            || self.min_kmh > self.max_kmh
        {
            return Err(invalid(format!(
                "speed range [{}, {}] km/h is invalid",
                self.min_kmh, self.max_kmh
            )));
        }
        if let Some(class) = RoadClass::ALL
            .into_iter()
            .find(|&class| !(self.for_class(class).is_finite() && self.for_class(class) >= 0.0))
        {
            return Err(invalid(format!("default speed for {class} must be non-negative")));
        }
        Ok(())
    }
}

/// Converts edge length and attributes into travel time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModel {
    /// Speed multiplier on gravel or unpaved roads
    pub unpaved_speed_factor: f64,
    /// Fixed boarding wait added to every ferry crossing
    pub ferry_boarding_min: Minutes,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            unpaved_speed_factor: 0.6,
            ferry_boarding_min: 30.0,
        }
    }
}

impl CostModel {
    /// Resolved speed after surface penalties; unknown surfaces are treated as paved
    pub fn effective_speed(&self, attributes: &RoadAttributes) -> f64 {
        let speed = attributes.speed_limit.unwrap_or(0.0);
        if attributes.pavement_surface == PavementSurface::Gravel
            || attributes.pavement_status == PavementStatus::Unpaved
        {
            speed * self.unpaved_speed_factor
        } else {
            speed
        }
    }

    /// `(length_m / 1000) / speed * 60`, infinite when the speed is zero
    pub fn travel_time(&self, length_m: Meters, speed_kmh: f64, attributes: &RoadAttributes) -> Minutes {
        if speed_kmh <= 0.0 {
            return f64::INFINITY;
        }
        let minutes = (length_m / 1000.0) / speed_kmh * 60.0;
        if attributes.road_class == RoadClass::Ferry {
            minutes + self.ferry_boarding_min
        } else {
            minutes
        }
    }

    fn validate(&self) -> Result<(), Error> {
        if !(self.unpaved_speed_factor.is_finite()
            && self.unpaved_speed_factor > 0.0
            && self.unpaved_speed_factor <= 1.0)
        {
            return Err(invalid("unpaved speed factor must be in (0, 1]"));
        }
        if !(self.ferry_boarding_min.is_finite() && self.ferry_boarding_min >= 0.0) {
            return Err(invalid("ferry boarding time must be non-negative"));
        }
        Ok(())
    }
}

/// Per-segment plausibility limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentLimits {
    /// Longest plausible single segment
    pub max_segment_length_m: Meters,
    /// Grid size used to decide that two segment extremities are the same node
    pub node_snap_m: Meters,
}

impl Default for SegmentLimits {
    fn default() -> Self {
        Self {
            max_segment_length_m: 100_000.0,
            node_snap_m: 0.1,
        }
    }
}

impl SegmentLimits {
    fn validate(&self) -> Result<(), Error> {
        if !(self.max_segment_length_m.is_finite() && self.max_segment_length_m > 0.0) {
            return Err(invalid("maximum segment length must be positive"));
        }
        if !(self.node_snap_m.is_finite() && self.node_snap_m > 0.0) {
            return Err(invalid("node snap grid must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidationConfig {
    pub enabled: bool,
    /// Nodes closer than this are merged into one intersection
    pub tolerance_m: Meters,
    /// Consolidation is skipped when the graph has more weak components than this
    pub component_skip_threshold: usize,
    /// Whether dead-end nodes take part in clustering
    pub merge_dead_ends: bool,
    /// Whether degree-2 pass-through nodes are collapsed into their edges
    pub simplify_pass_through: bool,
    /// Upper bound on candidate node pairs examined before giving up
    pub max_candidate_pairs: Option<usize>,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tolerance_m: 15.0,
            component_skip_threshold: 50,
            merge_dead_ends: false,
            simplify_pass_through: false,
            max_candidate_pairs: None,
        }
    }
}

impl ConsolidationConfig {
    fn validate(&self) -> Result<(), Error> {
        if !(self.tolerance_m.is_finite() && self.tolerance_m >= 0.0) {
            return Err(invalid(format!(
                "consolidation tolerance must be non-negative, got {}",
                self.tolerance_m
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Worker pool size; all available cores when unset
    pub worker_threads: Option<usize>,
    /// Query endpoints farther than this from any node are out of network
    pub max_snap_distance_m: Option<Meters>,
}

impl AuditConfig {
    fn validate(&self) -> Result<(), Error> {
        if self.worker_threads == Some(0) {
            return Err(invalid("worker pool needs at least one thread"));
        }
        if let Some(distance) = self.max_snap_distance_m {
            if !(distance.is_finite() && distance >= 0.0) {
                return Err(invalid("maximum snap distance must be non-negative"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn negative_tolerance_is_fatal() {
        let mut config = PipelineConfig::default();
        config.consolidation.tolerance_m = -1.0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn inverted_envelope_is_fatal() {
        let mut config = PipelineConfig::default();
        config.envelope.min_x = config.envelope.max_x;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml_str(
            r"
            [consolidation]
            tolerance_m = 20.0
            component_skip_threshold = 10

            [audit]
            worker_threads = 2
            ",
        )
        .expect("valid config");
        assert_eq!(config.consolidation.tolerance_m, 20.0);
        assert_eq!(config.consolidation.component_skip_threshold, 10);
        assert_eq!(config.audit.worker_threads, Some(2));
        assert_eq!(config.speeds, DefaultSpeeds::default());
    }

    #[test]
    fn toml_with_bad_values_is_rejected() {
        let result = PipelineConfig::from_toml_str(
            r"
            [audit]
            worker_threads = 0
            ",
        );
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
        assert!(matches!(
            PipelineConfig::from_toml_str("consolidation = 3"),
            Err(Error::ConfigParse(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let path = std::env::temp_dir().join(format!("roadnet-config-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[limits]\nmax_segment_length_m = 50000.0\n\n[cost]\nferry_boarding_min = 20.0\n",
        )
        .expect("temp dir is writable");

        let loaded = PipelineConfig::load(&path);
        std::fs::remove_file(&path).ok();

        let config = loaded.expect("valid config file");
        assert_eq!(config.limits.max_segment_length_m, 50_000.0);
        assert_eq!(config.cost.ferry_boarding_min, 20.0);
        assert_eq!(config.consolidation, ConsolidationConfig::default());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = std::env::temp_dir().join("roadnet-config-does-not-exist.toml");
        assert!(matches!(PipelineConfig::load(path), Err(Error::IoError(_))));
    }

    #[test]
    fn ferry_boarding_and_gravel_penalty() {
        let cost = CostModel::default();
        let gravel = RoadAttributes {
            speed_limit: Some(50.0),
            pavement_surface: PavementSurface::Gravel,
            ..RoadAttributes::default()
        };
        assert!((cost.effective_speed(&gravel) - 30.0).abs() < 1e-9);

        let ferry = RoadAttributes {
            road_class: RoadClass::Ferry,
            speed_limit: Some(10.0),
            ..RoadAttributes::default()
        };
        let minutes = cost.travel_time(1000.0, 10.0, &ferry);
        assert!((minutes - 36.0).abs() < 1e-9);
        assert!(cost.travel_time(1000.0, 0.0, &ferry).is_infinite());
    }
}
