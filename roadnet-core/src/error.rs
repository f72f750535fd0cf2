use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Projection error: {0}")]
    Projection(String),
    #[error("Consolidation budget exceeded: {pairs} candidate pairs (budget {budget})")]
    ConsolidationBudgetExceeded { pairs: usize, budget: usize },
    #[error("Consolidation failed: {0}")]
    Consolidation(String),
    #[error("Invalid edge index")]
    InvalidEdgeIndex,
    #[error("Worker pool error: {0}")]
    WorkerPool(String),
    #[error("GeoJSON error: {0}")]
    GeoJsonError(String),
}

/// Text carried by a caught panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
