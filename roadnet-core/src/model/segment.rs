//! Road segment records and their categorical attributes

use std::fmt;

use geo::{Coord, LineString};
use serde::{Deserialize, Serialize};

/// Closed categorical attribute with a canonical spelling
///
/// Source data spells the same category many ways ("Both", "Both Directions",
/// "BIDIRECTIONAL"). Tokens are compared after [`normalize_token`], so
/// implementors only list lowercase alphanumeric spellings.
pub trait Category: Sized + Default + Copy {
    /// Maps a normalized token to a category, `None` if the spelling is not recognised
    fn from_token(token: &str) -> Option<Self>;

    /// Canonicalizes a raw value.
    ///
    /// Returns the category and whether the raw value was recognised.
    /// Missing or explicitly-unknown values are recognised and map to the default.
    fn canonicalize(raw: Option<&str>) -> (Self, bool) {
        let Some(raw) = raw else {
            return (Self::default(), true);
        };
        let token = normalize_token(raw);
        if is_missing_token(&token) {
            return (Self::default(), true);
        }
        match Self::from_token(&token) {
            Some(value) => (value, true),
            None => (Self::default(), false),
        }
    }
}

/// Lowercases and strips whitespace, underscores and hyphens
pub(crate) fn normalize_token(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

fn is_missing_token(token: &str) -> bool {
    matches!(token, "" | "none" | "nan" | "null" | "unknown" | "n/a")
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum RoadClass {
    Freeway,
    Expressway,
    Arterial,
    Collector,
    Local,
    Resource,
    Ferry,
    RapidTransit,
    Alleyway,
    #[default]
    Unknown,
}

impl RoadClass {
    pub const ALL: [RoadClass; 10] = [
        RoadClass::Freeway,
        RoadClass::Expressway,
        RoadClass::Arterial,
        RoadClass::Collector,
        RoadClass::Local,
        RoadClass::Resource,
        RoadClass::Ferry,
        RoadClass::RapidTransit,
        RoadClass::Alleyway,
        RoadClass::Unknown,
    ];

    /// Major roads are assumed paved when the surface is not recorded
    pub fn is_major(self) -> bool {
        matches!(
            self,
            RoadClass::Freeway | RoadClass::Expressway | RoadClass::Arterial | RoadClass::Collector
        )
    }

    /// Classes whose unrecorded traffic direction is assumed bidirectional
    pub fn is_assumed_bidirectional(self) -> bool {
        matches!(
            self,
            RoadClass::Local | RoadClass::Collector | RoadClass::Resource | RoadClass::Ferry
        )
    }
}

impl Category for RoadClass {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "freeway" => Some(RoadClass::Freeway),
            "expressway" | "expresswayhighway" => Some(RoadClass::Expressway),
            "arterial" => Some(RoadClass::Arterial),
            "collector" => Some(RoadClass::Collector),
            "local" | "localstreet" | "localstrata" | "localunknown" => Some(RoadClass::Local),
            "resource" | "resourcerecreation" | "recreation" => Some(RoadClass::Resource),
            "ferry" => Some(RoadClass::Ferry),
            "rapidtransit" => Some(RoadClass::RapidTransit),
            "alleyway" | "alley" | "lane" | "alleywaylane" => Some(RoadClass::Alleyway),
            _ => None,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum PavementSurface {
    Paved,
    Gravel,
    #[default]
    Unknown,
}

impl Category for PavementSurface {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "paved" | "rigid" | "flexible" | "asphalt" | "concrete" | "blocks" => {
                Some(PavementSurface::Paved)
            }
            "gravel" | "loose" | "rough" | "dirt" | "earth" | "unpaved" => {
                Some(PavementSurface::Gravel)
            }
            _ => None,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum PavementStatus {
    Paved,
    Unpaved,
    #[default]
    Unknown,
}

impl Category for PavementStatus {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "paved" => Some(PavementStatus::Paved),
            "unpaved" => Some(PavementStatus::Unpaved),
            _ => None,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum TrafficDirection {
    BothDirections,
    SameDirection,
    OppositeDirection,
    #[default]
    Unknown,
}

impl Category for TrafficDirection {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "bothdirections" | "both" | "bidirectional" | "twoway" => {
                Some(TrafficDirection::BothDirections)
            }
            "samedirection" | "positive" | "forward" | "oneway" => {
                Some(TrafficDirection::SameDirection)
            }
            "oppositedirection" | "negative" | "reverse" => {
                Some(TrafficDirection::OppositeDirection)
            }
            _ => None,
        }
    }
}

macro_rules! display_as_debug {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        })*
    };
}

display_as_debug!(RoadClass, PavementSurface, PavementStatus, TrafficDirection);

/// Which attributes were filled by inference rather than read from the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InferenceFlags {
    pub pavement_surface: bool,
    pub traffic_direction: bool,
    pub speed_limit: bool,
}

/// Canonical categorical and numeric attributes of a road
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoadAttributes {
    pub road_class: RoadClass,
    /// Posted or inferred speed in km/h
    pub speed_limit: Option<f64>,
    pub pavement_surface: PavementSurface,
    pub pavement_status: PavementStatus,
    pub traffic_direction: TrafficDirection,
    pub jurisdiction: Option<String>,
    pub inferred: InferenceFlags,
}

/// Road record as delivered by a data loader, before any validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSegment {
    pub segment_id: String,
    pub node_id: Option<String>,
    /// Polyline vertices as `[x, y]` (longitude, latitude) pairs
    pub geometry: Option<Vec<[f64; 2]>>,
    pub road_class: Option<String>,
    pub speed_limit: Option<f64>,
    pub pavement_surface: Option<String>,
    pub pavement_status: Option<String>,
    pub traffic_direction: Option<String>,
    pub jurisdiction: Option<String>,
}

/// Undirected road segment with a valid geographic polyline
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub segment_id: String,
    /// Junction reference supplied by the source, shared between segments
    pub node_id: Option<String>,
    pub geometry: LineString<f64>,
    pub attributes: RoadAttributes,
}

/// Segment whose polyline and extremities are expressed in projected metres
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedSegment {
    pub segment_id: String,
    pub node_id: Option<String>,
    pub geometry: LineString<f64>,
    /// Projected first vertex
    pub origin: Coord<f64>,
    /// Projected last vertex
    pub destination: Coord<f64>,
    pub length_m: f64,
    pub attributes: RoadAttributes,
}
