//! Transfer error taxonomy.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Coarse classification of a [`TransferError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad local input. Nothing was sent.
    Validation,
    /// Transport failure or non-success HTTP status.
    Network,
    /// Malformed or unexpected response.
    Protocol,
    /// The server explicitly reported a failure.
    Remote,
    /// A stored block's digest did not match the local one.
    Checksum,
    /// The share is deleted, missing or still uploading.
    State,
    /// Local I/O, cancellation or task failure.
    Local,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Network => "network",
            Self::Protocol => "protocol",
            Self::Remote => "remote",
            Self::Checksum => "checksum",
            Self::State => "state",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by the transfer engine.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("remote error: {message}")]
    Remote { message: String },

    /// Finalization answered with `complete = false`.
    #[error("session not completed by server (temporary code {temp_code:?})")]
    SessionIncomplete { temp_code: String },

    #[error("block {block} has invalid checksum: expected {expected}, server reported {actual}")]
    Checksum {
        block: u64,
        expected: String,
        actual: String,
    },

    #[error("unsupported download URL: {0}")]
    DownloadUrlInvalid(String),

    #[error("download not found")]
    NotFound,

    #[error("download is already deleted")]
    Deleted,

    #[error("upload in progress")]
    UploadInProgress,

    #[error("block {block} failed after {attempts} attempt(s): {source}")]
    BlockFailed {
        block: u64,
        attempts: u32,
        #[source]
        source: Box<TransferError>,
    },

    #[error("cannot upload {}: {source}", path.display())]
    FileUpload {
        path: PathBuf,
        block: u64,
        #[source]
        source: Box<TransferError>,
    },

    #[error("missing block {block}: {}", path.display())]
    MissingBlock { path: PathBuf, block: u64 },

    #[error("cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("read error: {0}")]
    Read(#[from] cowput_transfer::ReadError),

    #[error("task join error: {0}")]
    Join(String),
}

impl TransferError {
    /// Classifies this error. Wrapping variants report their cause's kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::DownloadUrlInvalid(_) => ErrorKind::Validation,
            Self::Network(_) => ErrorKind::Network,
            Self::Protocol(_) | Self::MissingBlock { .. } => ErrorKind::Protocol,
            Self::Remote { .. } | Self::SessionIncomplete { .. } => ErrorKind::Remote,
            Self::Checksum { .. } => ErrorKind::Checksum,
            Self::NotFound | Self::Deleted | Self::UploadInProgress => ErrorKind::State,
            Self::BlockFailed { source, .. } | Self::FileUpload { source, .. } => source.kind(),
            Self::Cancelled | Self::Io(_) | Self::Read(_) | Self::Join(_) => ErrorKind::Local,
        }
    }

    /// Returns `true` for errors worth retrying at block granularity.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Protocol(_) | Self::Checksum { .. }
        )
    }
}

impl From<cowput_client::Error> for TransferError {
    fn from(e: cowput_client::Error) -> Self {
        use cowput_client::Error as E;
        match e {
            E::Http(e) => Self::Network(e.to_string()),
            E::Status { status, body } => Self::Network(format!("HTTP {status}: {body}")),
            E::Json(e) => Self::Protocol(format!("malformed response: {e}")),
            E::UnexpectedResponse(msg) => Self::Protocol(msg),
            E::Remote(message) => Self::Remote { message },
            E::InvalidHeader(msg) => Self::Validation(format!("invalid header value: {msg}")),
        }
    }
}

impl From<tokio::task::JoinError> for TransferError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Join(e.to_string())
    }
}
