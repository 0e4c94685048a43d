use thiserror::Error;

/// Failures surfaced by the fetch, cache and lookup layers.
///
/// Malformed CSV content never shows up here: bad rows are skipped and bad
/// numbers become zero while parsing.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("request to '{url}' failed: {reason}")]
    Network {
        url: String,
        status: Option<u16>,
        reason: String,
    },
    #[error("{0} not found")]
    NotFound(String),
    #[error("unexpected response body from '{url}': {reason}")]
    Decode { url: String, reason: String },
}

impl DataError {
    /// HTTP status carried by a `Network` error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            DataError::Network { status, .. } => *status,
            _ => None,
        }
    }
}
