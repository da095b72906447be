use thiserror::Error;

#[derive(Error, Debug)]
pub enum IqmsError {
    #[error("Database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API Error: {0}")]
    Api(String),

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Background task failed: {0}")]
    Task(String),
}

impl IqmsError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, IqmsError::Cancelled)
    }
}
