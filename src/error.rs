use serde_json::Value;
use thiserror::Error;

/// Main error type for Cloud Controller operations
#[derive(Debug, Error)]
pub enum CfError {
    /// Required session state or configuration is missing or invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// The API info document could not be fetched
    #[error("API discovery failed: {message}")]
    Discovery {
        message: String,
        status: Option<u16>,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// Connection failure or unreadable response
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A successful response whose body is not JSON
    #[error("malformed response (HTTP {status}): {source}")]
    MalformedResponse {
        status: u16,
        body: String,
        #[source]
        source: serde_json::Error,
    },

    /// The token endpoint rejected the grant
    #[error("authentication failed: HTTP {status}: {body}")]
    Auth { status: u16, body: String },

    /// Malformed token or ambiguous authentication state
    #[error("{message}")]
    Request { message: String, url: Option<String> },

    /// Error envelope returned by a resource endpoint
    #[error("{message}")]
    Response {
        message: String,
        status: u16,
        body: Value,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Base64 decoding error
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}

impl CfError {
    /// Create a new request error without an associated URL
    pub fn request(message: impl Into<String>) -> Self {
        CfError::Request {
            message: message.into(),
            url: None,
        }
    }

    /// Get the HTTP status code carried by this error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            CfError::Discovery { status, .. } => *status,
            CfError::MalformedResponse { status, .. }
            | CfError::Auth { status, .. }
            | CfError::Response { status, .. } => Some(*status),
            CfError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if this error is a not found error (404)
    pub fn is_not_found(&self) -> bool {
        matches!(self, CfError::Response { status: 404, .. })
    }

    /// Check if the server refused our credentials (401)
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            CfError::Auth { status: 401, .. } | CfError::Response { status: 401, .. }
        )
    }
}

/// Result type for Cloud Controller operations
pub type Result<T> = std::result::Result<T, CfError>;
