use thiserror::Error;

#[derive(Error, Debug)]
pub enum PulseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Slack API error: {method}: {error}")]
    Api { method: String, error: String },

    #[error("Slack API returned HTTP {status} for {method}")]
    Status { method: String, status: u16 },

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, PulseError>;
