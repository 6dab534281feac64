use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Logging error: {0}")]
    Logging(String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
}
