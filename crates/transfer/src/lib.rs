//! Fixed-size block splitting and transfer progress reporting.

mod block;
mod progress;

pub use block::{Block, BlockReader, block_count, md5_hex};
pub use progress::{
    BlockProgress, FileProgress, NoopHook, ProgressHook, RetryProgress, TransferState,
};

/// Errors produced while splitting a file into blocks.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid block size: {0}")]
    InvalidBlockSize(usize),

    #[error("file shrank while reading: expected {expected} bytes, got {actual}")]
    Truncated { expected: u64, actual: u64 },
}
