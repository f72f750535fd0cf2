mod state;
pub mod traced_dijkstra;

pub use traced_dijkstra::{TracedPath, least_time_path};
