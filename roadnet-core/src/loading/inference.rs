//! Deterministic inference of missing attributes
//!
//! Rules only ever replace `Unknown` or absent values, so running them again
//! on inferred data changes nothing.

use log::info;
use serde::Serialize;

use super::config::DefaultSpeeds;
use crate::model::{
    PavementStatus, PavementSurface, ProjectedSegment, RoadAttributes, TrafficDirection,
};

/// Known / inferred / still-unknown tally for one attribute
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FieldCoverage {
    pub known: usize,
    pub inferred: usize,
    pub unknown: usize,
}

impl FieldCoverage {
    fn record(&mut self, known: bool, inferred: bool) {
        if inferred {
            self.inferred += 1;
        } else if known {
            self.known += 1;
        } else {
            self.unknown += 1;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InferenceReport {
    pub pavement_surface: FieldCoverage,
    pub traffic_direction: FieldCoverage,
    pub speed_limit: FieldCoverage,
    /// Supplied speeds moved into the plausible range
    pub speeds_clipped: usize,
    /// Attribute values changed by this run
    pub changes: usize,
}

/// Applies the inference rules to every segment in place
pub fn infer_attributes(segments: &mut [ProjectedSegment], speeds: &DefaultSpeeds) -> InferenceReport {
    let mut report = InferenceReport::default();

    for segment in segments.iter_mut() {
        let attributes = &mut segment.attributes;
        report.changes += infer_surface(attributes);
        report.changes += infer_direction(attributes);
        let (speed_changes, clipped) = infer_speed(attributes, speeds);
        report.changes += speed_changes;
        report.speeds_clipped += usize::from(clipped);

        report.pavement_surface.record(
            attributes.pavement_surface != PavementSurface::Unknown,
            attributes.inferred.pavement_surface,
        );
        report.traffic_direction.record(
            attributes.traffic_direction != TrafficDirection::Unknown,
            attributes.inferred.traffic_direction,
        );
        report
            .speed_limit
            .record(attributes.speed_limit.is_some(), attributes.inferred.speed_limit);
    }

    info!(
        "Attribute inference: {} changes, surface {}/{}/{}, direction {}/{}/{} (known/inferred/unknown), {} speeds clipped",
        report.changes,
        report.pavement_surface.known,
        report.pavement_surface.inferred,
        report.pavement_surface.unknown,
        report.traffic_direction.known,
        report.traffic_direction.inferred,
        report.traffic_direction.unknown,
        report.speeds_clipped
    );

    report
}

fn infer_surface(attributes: &mut RoadAttributes) -> usize {
    if attributes.pavement_surface != PavementSurface::Unknown {
        return 0;
    }

    let surface = match attributes.pavement_status {
        PavementStatus::Paved => PavementSurface::Paved,
        PavementStatus::Unpaved => PavementSurface::Gravel,
        PavementStatus::Unknown if attributes.road_class.is_major() => PavementSurface::Paved,
        PavementStatus::Unknown => return 0,
    };

    attributes.pavement_surface = surface;
    attributes.inferred.pavement_surface = true;
    1
}

/// Freeway and expressway directions are left unknown on purpose: guessing
/// one-way status for a divided highway is unsafe, and the resolver treats
/// unknown as bidirectional anyway.
fn infer_direction(attributes: &mut RoadAttributes) -> usize {
    if attributes.traffic_direction == TrafficDirection::Unknown
        && attributes.road_class.is_assumed_bidirectional()
    {
        attributes.traffic_direction = TrafficDirection::BothDirections;
        attributes.inferred.traffic_direction = true;
        1
    } else {
        0
    }
}

fn infer_speed(attributes: &mut RoadAttributes, speeds: &DefaultSpeeds) -> (usize, bool) {
    match attributes.speed_limit {
        None => {
            attributes.speed_limit = Some(speeds.for_class(attributes.road_class));
            attributes.inferred.speed_limit = true;
            (1, false)
        }
        // Class defaults may legitimately sit outside the posted-speed range
        Some(_) if attributes.inferred.speed_limit => (0, false),
        Some(speed) => {
            let clipped = speeds.clip(speed);
            if clipped == speed {
                (0, false)
            } else {
                attributes.speed_limit = Some(clipped);
                (1, true)
            }
        }
    }
}
