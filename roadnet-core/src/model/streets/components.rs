//! Road network components - nodes and directed edges

use geo::{Euclidean, Length, LineString, Point};
use serde::Serialize;

use crate::{
    Meters, Minutes, NodeId,
    loading::CostModel,
    model::{RoadAttributes, RoadClass},
};

/// Intersection or segment endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoadNode {
    pub id: NodeId,
    /// Node coordinates in projected metres
    #[serde(skip)]
    pub geometry: Point<f64>,
    /// Number of raw endpoints collapsed into this node
    pub merged_from: usize,
}

impl RoadNode {
    pub fn new(id: NodeId, geometry: Point<f64>) -> Self {
        Self {
            id,
            geometry,
            merged_from: 1,
        }
    }
}

/// One traversable direction of a road segment
#[derive(Debug, Clone, PartialEq)]
pub struct DirectedEdge {
    pub segment_id: String,
    pub origin: NodeId,
    pub destination: NodeId,
    /// Polyline in projected metres, in the order it was recorded at the source
    pub geometry: LineString<f64>,
    pub length_m: Meters,
    /// Speed used for costing, after surface penalties
    pub speed_kmh: f64,
    /// Cost of traversal; infinite for impassable edges
    pub travel_time_min: Minutes,
    pub attributes: RoadAttributes,
}

impl DirectedEdge {
    /// Recomputes `length_m` from the current geometry
    pub fn measure(&mut self) {
        self.length_m = Euclidean.length(&self.geometry);
    }

    /// Recomputes speed and travel time from length and attributes
    pub fn price(&mut self, cost: &CostModel) {
        self.speed_kmh = cost.effective_speed(&self.attributes);
        self.travel_time_min = cost.travel_time(self.length_m, self.speed_kmh, &self.attributes);
    }

    pub fn is_passable(&self) -> bool {
        self.travel_time_min.is_finite()
    }

    pub fn road_class(&self) -> RoadClass {
        self.attributes.road_class
    }

    /// Whether two edges can be chained into one without changing semantics.
    ///
    /// Ferry legs never chain: each one carries its own boarding time.
    pub(crate) fn same_road_as(&self, other: &DirectedEdge) -> bool {
        let (a, b) = (&self.attributes, &other.attributes);
        a.road_class != RoadClass::Ferry
            && a.road_class == b.road_class
            && a.speed_limit == b.speed_limit
            && a.pavement_surface == b.pavement_surface
            && a.pavement_status == b.pavement_status
            && a.traffic_direction == b.traffic_direction
            && a.jurisdiction == b.jurisdiction
            && a.inferred == b.inferred
    }
}
