//! Chunked transfer engine.
//!
//! This crate implements the upload and download-resolution logic. It has
//! no HTTP dependency of its own: the management and storage tiers are
//! reached through the [`ManagementApi`] and [`StorageApi`] traits, which
//! `cowput-client` types implement and tests replace with mocks.
//!
//! # Upload
//!
//! 1. **Scan**: enumerate regular files under the input paths
//! 2. **Open**: create the transfer session, bind the passcode if any
//! 3. **Per file**: register, init the block job, push blocks (serially or
//!    through a worker pool), merge the ordered manifest, mark finished
//! 4. **Finish**: finalize the session and obtain the share code
//!
//! # Download resolution
//!
//! Share URL → transfer id → details → paginated listing → per-item link.

pub mod api;
pub mod config;
pub mod error;
pub mod mime;
pub mod pipeline;
pub mod pool;
pub mod resolver;
pub mod scanner;
pub mod session;
pub mod uploader;

mod tracker;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export primary types for convenience.
pub use api::{BoxFuture, ManagementApi, StorageApi};
pub use config::EngineConfig;
pub use error::{ErrorKind, TransferError};
pub use pipeline::{FileReceipt, FileUploadPipeline};
pub use pool::{BlockOutcome, BlockResultIndex, BlockWorkerPool};
pub use resolver::{DownloadResolver, FileInfo, ItemError, extract_transfer_id};
pub use scanner::collect_upload_files;
pub use session::SessionManager;
pub use uploader::{UploadOutcome, Uploader};
