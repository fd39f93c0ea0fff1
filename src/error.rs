//! Error types for the inventory run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config: {0}")]
    Config(String),

    #[error("Digest auth: {0}")]
    Auth(String),

    #[error("{host} answered HTTP {status}")]
    Status { host: String, status: u16 },
}

pub type Result<T> = std::result::Result<T, InventoryError>;
