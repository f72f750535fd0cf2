//! Per-route summaries by road class and surface

use std::{collections::BTreeMap, fmt::Display};

use itertools::Itertools;
use serde::Serialize;

use super::audit::TraversedEdge;
use crate::{Meters, Minutes};

/// Portion of a route sharing one attribute value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeShare {
    pub value: String,
    pub edge_count: usize,
    pub distance_m: Meters,
    pub travel_time_min: Minutes,
    /// Share of the route distance, in percent
    pub distance_pct: f64,
}

/// Distance and time of a route split by road class and by surface
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RouteBreakdown {
    /// Largest share first
    pub by_road_class: Vec<AttributeShare>,
    pub by_surface: Vec<AttributeShare>,
}

impl RouteBreakdown {
    pub fn from_edges(edges: &[TraversedEdge]) -> Self {
        Self {
            by_road_class: shares(edges, |edge| edge.road_class),
            by_surface: shares(edges, |edge| edge.pavement_surface),
        }
    }

    /// Share for a single road class or surface value, if present on the route
    pub fn road_class_share(&self, value: impl Display) -> Option<&AttributeShare> {
        let value = value.to_string();
        self.by_road_class.iter().find(|share| share.value == value)
    }

    pub fn surface_share(&self, value: impl Display) -> Option<&AttributeShare> {
        let value = value.to_string();
        self.by_surface.iter().find(|share| share.value == value)
    }
}

fn shares<K: Ord + Display>(
    edges: &[TraversedEdge],
    key: impl Fn(&TraversedEdge) -> K,
) -> Vec<AttributeShare> {
    let total: Meters = edges.iter().map(|edge| edge.length_m).sum();

    let mut groups: BTreeMap<K, (usize, Meters, Minutes)> = BTreeMap::new();
    for edge in edges {
        let entry = groups.entry(key(edge)).or_default();
        entry.0 += 1;
        entry.1 += edge.length_m;
        entry.2 += edge.travel_time_min;
    }

    groups
        .into_iter()
        .map(|(value, (edge_count, distance_m, travel_time_min))| AttributeShare {
            value: value.to_string(),
            edge_count,
            distance_m,
            travel_time_min,
            distance_pct: if total > 0.0 {
                distance_m / total * 100.0
            } else {
                0.0
            },
        })
        .sorted_by(|a, b| b.distance_m.total_cmp(&a.distance_m))
        .collect()
}
