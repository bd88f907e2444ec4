use thiserror::Error;

#[derive(Error, Debug)]
pub enum BulkfeedError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("Unexpected response format: {0}")]
    Format(String),

    #[error("No new items at offset {offset} ({received} records received)")]
    EmptyPage { offset: usize, received: usize },

    #[error("Image probe failed: {0}")]
    Probe(String),

    #[error("Title rewrite failed: {0}")]
    Rewrite(String),

    #[error("Export failed: {0}")]
    Serialization(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BulkfeedError {
    /// Informational conditions that should not be reported as failures.
    pub fn is_notice(&self) -> bool {
        matches!(self, BulkfeedError::EmptyPage { .. })
    }
}

pub type Result<T> = std::result::Result<T, BulkfeedError>;
