//! Client error types.

/// Errors from the HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server answered but explicitly flagged the request as failed.
    #[error("remote error: {0}")]
    Remote(String),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("invalid header value: {0}")]
    InvalidHeader(String),
}
