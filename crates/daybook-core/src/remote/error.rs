//! Remote store errors

use thiserror::Error;

/// Errors from talking to the sync API
///
/// Messages distinguish bad credentials from an unreachable server from a
/// server that answered with something unusable.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The server rejected the API key
    #[error("Unauthorized: the server rejected the API key")]
    Unauthorized,

    /// The server could not be reached (DNS, refused connection, timeout)
    #[error("Server unreachable: {0}")]
    Unreachable(String),

    /// The server answered, but the payload could not be understood
    #[error("Malformed response from server: {0}")]
    MalformedResponse(String),

    /// Any other non-success status
    #[error("Server returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    /// The configured endpoint is not a usable http(s) URL
    #[error("Invalid API endpoint '{0}'")]
    InvalidEndpoint(String),

    /// The API key cannot be sent as a header value
    #[error("Invalid API key: {0}")]
    InvalidKey(String),
}

impl RemoteError {
    /// Classify a transport-level failure
    pub(crate) fn from_transport(error: reqwest::Error) -> Self {
        if error.is_decode() {
            RemoteError::MalformedResponse(error.to_string())
        } else {
            RemoteError::Unreachable(error.to_string())
        }
    }

    /// Whether retrying later might help
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Unreachable(_) => true,
            RemoteError::Status { code, .. } => matches!(code, 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }
}
