use thiserror::Error;

/// Failure to obtain a page payload.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Http { status: u16, url: String },
    #[error("timed out fetching {url}")]
    Timeout { url: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("browser error: {0}")]
    Browser(String),
    #[error("client setup failed: {0}")]
    Client(String),
}

impl FetchError {
    pub fn from_reqwest(err: reqwest::Error, url: &str) -> Self {
        if err.is_timeout() {
            FetchError::Timeout { url: url.to_string() }
        } else if let Some(status) = err.status() {
            FetchError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            }
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// A payload was fetched but does not have the expected structure.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("HTML selector error: {0}")]
    Selector(String),
    #[error("__NEXT_DATA__ not found")]
    MissingNextData,
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected data shape: {0}")]
    UnexpectedShape(String),
}
