//! Error types for the navigation engine.

/// All errors the engine can produce.
///
/// Fetch-related variants never escape the prefetch or navigation boundary;
/// they are converted into outcomes there.
#[derive(thiserror::Error, Debug)]
pub enum NavError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid selector: {0}")]
    Selector(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NavError {
    /// Whether this error came from talking to the page-content source.
    pub fn is_fetch_error(&self) -> bool {
        matches!(self, NavError::Http(_) | NavError::Status { .. })
    }
}

pub type NavResult<T> = Result<T, NavError>;
