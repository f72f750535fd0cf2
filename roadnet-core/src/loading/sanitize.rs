//! Geometry validation and attribute canonicalization of raw segments

use geo::{Coord, LineString};
use log::{info, trace};
use serde::Serialize;

use crate::model::{
    Category, InferenceFlags, PavementStatus, PavementSurface, RawSegment, RoadAttributes,
    RoadClass, Segment, TrafficDirection,
};

/// Counts of raw values that did not match any known spelling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UnrecognizedValues {
    pub road_class: usize,
    pub pavement_surface: usize,
    pub pavement_status: usize,
    pub traffic_direction: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SanitizeReport {
    pub input: usize,
    pub kept: usize,
    pub repaired: usize,
    pub dropped_empty: usize,
    pub dropped_degenerate: usize,
    pub unrecognized: UnrecognizedValues,
}

impl SanitizeReport {
    pub fn dropped(&self) -> usize {
        self.dropped_empty + self.dropped_degenerate
    }
}

#[derive(Debug, PartialEq)]
enum GeometryCheck {
    Valid(LineString<f64>),
    Repaired(LineString<f64>),
    Empty,
    Degenerate,
}

/// Validates geometries and canonicalizes categorical attributes.
///
/// Invalid polylines are repaired when possible; empty and degenerate
/// ones are dropped and counted.
pub fn sanitize_segments(raw: Vec<RawSegment>) -> (Vec<Segment>, SanitizeReport) {
    let mut report = SanitizeReport {
        input: raw.len(),
        ..SanitizeReport::default()
    };
    let mut segments = Vec::with_capacity(raw.len());

    for record in raw {
        let geometry = match check_geometry(record.geometry.as_deref()) {
            GeometryCheck::Valid(line) => line,
            GeometryCheck::Repaired(line) => {
                report.repaired += 1;
                line
            }
            GeometryCheck::Empty => {
                trace!("Segment {} has no geometry - dropping", record.segment_id);
                report.dropped_empty += 1;
                continue;
            }
            GeometryCheck::Degenerate => {
                trace!("Segment {} is degenerate - dropping", record.segment_id);
                report.dropped_degenerate += 1;
                continue;
            }
        };

        let attributes = canonical_attributes(&record, &mut report.unrecognized);
        segments.push(Segment {
            segment_id: record.segment_id,
            node_id: record.node_id,
            geometry,
            attributes,
        });
    }

    report.kept = segments.len();
    info!(
        "Sanitized {} segments: kept {}, repaired {}, dropped {} empty and {} degenerate",
        report.input, report.kept, report.repaired, report.dropped_empty, report.dropped_degenerate
    );

    (segments, report)
}

fn check_geometry(vertices: Option<&[[f64; 2]]>) -> GeometryCheck {
    let Some(vertices) = vertices.filter(|v| !v.is_empty()) else {
        return GeometryCheck::Empty;
    };

    let mut coords: Vec<Coord<f64>> = vertices
        .iter()
        .filter(|[x, y]| x.is_finite() && y.is_finite())
        .map(|&[x, y]| Coord { x, y })
        .collect();
    coords.dedup();

    if coords.len() < 2 {
        return GeometryCheck::Degenerate;
    }

    if coords.len() == vertices.len() {
        GeometryCheck::Valid(LineString::new(coords))
    } else {
        GeometryCheck::Repaired(LineString::new(coords))
    }
}

fn canonical_attributes(record: &RawSegment, unrecognized: &mut UnrecognizedValues) -> RoadAttributes {
    fn canonical<T: Category>(raw: Option<&String>, counter: &mut usize) -> T {
        let (value, recognized) = T::canonicalize(raw.map(String::as_str));
        if !recognized {
            *counter += 1;
        }
        value
    }

    let road_class: RoadClass = canonical(record.road_class.as_ref(), &mut unrecognized.road_class);
    let pavement_surface: PavementSurface =
        canonical(record.pavement_surface.as_ref(), &mut unrecognized.pavement_surface);
    let pavement_status: PavementStatus =
        canonical(record.pavement_status.as_ref(), &mut unrecognized.pavement_status);
    let traffic_direction: TrafficDirection =
        canonical(record.traffic_direction.as_ref(), &mut unrecognized.traffic_direction);

    RoadAttributes {
        road_class,
        speed_limit: record
            .speed_limit
            .filter(|speed| speed.is_finite() && *speed > 0.0),
        pavement_surface,
        pavement_status,
        traffic_direction,
        jurisdiction: record
            .jurisdiction
            .as_deref()
            .map(str::trim)
            .filter(|j| !j.is_empty() && !matches!(j.to_lowercase().as_str(), "none" | "unknown" | "nan"))
            .map(str::to_string),
        inferred: InferenceFlags::default(),
    }
}
