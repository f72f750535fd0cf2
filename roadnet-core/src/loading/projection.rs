//! Geographic to metric projection
//!
//! Ellipsoidal Albers equal-area conic, following Snyder's
//! "Map Projections: A Working Manual" (USGS PP 1395), eqs. 14-1 to 14-21.
//! Segments are projected as one flat coordinate batch so every vertex of
//! every polyline, not only the extremities, ends up in metres.

use geo::{Coord, Euclidean, Length, LineString, Point};
use log::{info, warn};

use super::config::ProjectionParams;
use crate::{
    Error,
    model::{ProjectedSegment, Segment},
};

const INVERSE_MAX_ITERATIONS: usize = 15;
const INVERSE_TOLERANCE: f64 = 1e-12;

/// Forward and inverse Albers equal-area conic projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projector {
    params: ProjectionParams,
    a: f64,
    e: f64,
    e2: f64,
    n: f64,
    c: f64,
    rho0: f64,
    lon0: f64,
}

impl Default for Projector {
    fn default() -> Self {
        // Default parameters are known to be valid
        Self::from_constants(ProjectionParams::default())
    }
}

impl Projector {
    pub fn new(params: ProjectionParams) -> Result<Self, Error> {
        let projector = Self::from_constants(params);
        if ![projector.n, projector.c, projector.rho0]
            .iter()
            .all(|v| v.is_finite())
            || projector.n == 0.0
        {
            return Err(Error::Projection(format!(
                "degenerate Albers parameters: {params:?}"
            )));
        }
        Ok(projector)
    }

    fn from_constants(params: ProjectionParams) -> Self {
        let a = params.semi_major_axis;
        let f = 1.0 / params.inverse_flattening;
        let e2 = 2.0 * f - f * f;
        let e = e2.sqrt();

        let phi1 = params.standard_parallel_1.to_radians();
        let phi2 = params.standard_parallel_2.to_radians();
        let phi0 = params.latitude_of_origin.to_radians();

        let m1 = m(phi1, e2);
        let m2 = m(phi2, e2);
        let q0 = q(phi0, e, e2);
        let q1 = q(phi1, e, e2);
        let q2 = q(phi2, e, e2);

        let n = if (phi1 - phi2).abs() < 1e-12 {
            phi1.sin()
        } else {
            (m1 * m1 - m2 * m2) / (q2 - q1)
        };
        let c = m1 * m1 + n * q1;
        let rho0 = a * (c - n * q0).sqrt() / n;

        Self {
            params,
            a,
            e,
            e2,
            n,
            c,
            rho0,
            lon0: params.central_meridian.to_radians(),
        }
    }

    /// Projects a longitude/latitude pair in degrees to metres.
    ///
    /// Coordinates outside the geographic domain yield NaN.
    pub fn project(&self, coord: Coord<f64>) -> Coord<f64> {
        if !(coord.x.abs() <= 180.0 && coord.y.abs() <= 90.0) {
            return Coord {
                x: f64::NAN,
                y: f64::NAN,
            };
        }
        let phi = coord.y.to_radians();
        let lambda = coord.x.to_radians();

        let rho = self.a * (self.c - self.n * q(phi, self.e, self.e2)).sqrt() / self.n;
        let theta = self.n * wrap_angle(lambda - self.lon0);

        Coord {
            x: self.params.false_easting + rho * theta.sin(),
            y: self.params.false_northing + self.rho0 - rho * theta.cos(),
        }
    }

    /// Inverse projection from metres back to longitude/latitude degrees
    pub fn unproject(&self, coord: Coord<f64>) -> Coord<f64> {
        let x = coord.x - self.params.false_easting;
        let y = self.rho0 - (coord.y - self.params.false_northing);

        let sign = self.n.signum();
        let rho = (x * x + y * y).sqrt() * sign;
        let theta = (x * sign).atan2(y * sign);
        let q_target = (self.c - (rho * self.n / self.a).powi(2)) / self.n;

        let mut phi = (q_target / 2.0).clamp(-1.0, 1.0).asin();
        for _ in 0..INVERSE_MAX_ITERATIONS {
            let sin_phi = phi.sin();
            let cos_phi = phi.cos();
            let es = self.e * sin_phi;
            let one_minus = 1.0 - es * es;
            let delta = one_minus * one_minus / (2.0 * cos_phi)
                * (q_target / (1.0 - self.e2) - sin_phi / one_minus
                    + (1.0 / (2.0 * self.e)) * ((1.0 - es) / (1.0 + es)).ln());
            phi += delta;
            if delta.abs() < INVERSE_TOLERANCE {
                break;
            }
        }

        Coord {
            x: wrap_angle(self.lon0 + theta / self.n).to_degrees(),
            y: phi.to_degrees(),
        }
    }

    pub fn project_point(&self, point: Point<f64>) -> Point<f64> {
        self.project(point.0).into()
    }

    pub fn unproject_point(&self, point: Point<f64>) -> Point<f64> {
        self.unproject(point.0).into()
    }

    /// Projects a flat coordinate buffer in place
    pub fn project_batch(&self, coords: &mut [Coord<f64>]) {
        for coord in coords.iter_mut() {
            *coord = self.project(*coord);
        }
    }

    pub fn unproject_line(&self, line: &LineString<f64>) -> LineString<f64> {
        line.coords().map(|c| self.unproject(*c)).collect()
    }

    /// Projects every vertex and both extremities of each segment in one batch
    pub fn project_segments(&self, segments: Vec<Segment>) -> Vec<ProjectedSegment> {
        let before = segments.len();
        let segments: Vec<Segment> = segments
            .into_iter()
            .filter(|s| !s.geometry.0.is_empty())
            .collect();
        if segments.len() < before {
            warn!("Skipped {} segments without vertices", before - segments.len());
        }

        // Layout per segment: origin, destination, then every vertex
        let mut offsets = Vec::with_capacity(segments.len() + 1);
        let mut buffer: Vec<Coord<f64>> = Vec::with_capacity(
            segments.iter().map(|s| s.geometry.0.len() + 2).sum(),
        );
        for segment in &segments {
            let coords = &segment.geometry.0;
            if let (Some(&first), Some(&last)) = (coords.first(), coords.last()) {
                offsets.push(buffer.len());
                buffer.push(first);
                buffer.push(last);
                buffer.extend_from_slice(coords);
            }
        }
        offsets.push(buffer.len());

        self.project_batch(&mut buffer);

        let projected: Vec<ProjectedSegment> = segments
            .into_iter()
            .enumerate()
            .map(|(idx, segment)| {
                let block = &buffer[offsets[idx]..offsets[idx + 1]];
                let geometry = LineString::new(block[2..].to_vec());
                let length_m = Euclidean.length(&geometry);
                ProjectedSegment {
                    segment_id: segment.segment_id,
                    node_id: segment.node_id,
                    origin: block[0],
                    destination: block[1],
                    length_m,
                    geometry,
                    attributes: segment.attributes,
                }
            })
            .collect();

        let non_finite = projected
            .iter()
            .filter(|s| !s.length_m.is_finite())
            .count();
        if non_finite > 0 {
            warn!("{non_finite} segments have coordinates outside the geographic domain");
        }
        info!(
            "Projected {} segments ({} vertices)",
            projected.len(),
            buffer.len()
        );

        projected
    }
}

fn m(phi: f64, e2: f64) -> f64 {
    let sin_phi = phi.sin();
    phi.cos() / (1.0 - e2 * sin_phi * sin_phi).sqrt()
}

fn q(phi: f64, e: f64, e2: f64) -> f64 {
    let sin_phi = phi.sin();
    let es = e * sin_phi;
    (1.0 - e2) * (sin_phi / (1.0 - es * es) - (1.0 / (2.0 * e)) * ((1.0 - es) / (1.0 + es)).ln())
}

fn wrap_angle(angle: f64) -> f64 {
    use std::f64::consts::PI;
    if (-PI..=PI).contains(&angle) {
        angle
    } else {
        (angle + PI).rem_euclid(2.0 * PI) - PI
    }
}
