//! Road network model

pub mod components;
pub mod network;

pub use components::{DirectedEdge, RoadNode};
pub use network::{DirectedNetwork, IndexedPoint, RoadGraph};
