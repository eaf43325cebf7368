use std::fmt;
use std::path::PathBuf;

use cowput_protocol::TransferSession;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a single file upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferState {
    Init,
    RequestJob,
    Uploading,
    Retrying,
    ConfirmMerge,
    Finalize,
    Done,
    Failed,
}

impl TransferState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::RequestJob => "request_job",
            Self::Uploading => "uploading",
            Self::Retrying => "retrying",
            Self::ConfirmMerge => "confirm_merge",
            Self::Finalize => "finalize",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The block an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockProgress {
    /// 1-based block number.
    pub index: u64,
    pub len: usize,
}

/// Retry details attached to a retry event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryProgress {
    /// 1-based retry number (the first retry is attempt 1).
    pub attempt: u32,
    pub retries_left: u32,
    /// Error that caused this retry.
    pub error: String,
}

/// Snapshot of one file's upload progress.
///
/// Carries aggregate counters so consumers never need to keep their own
/// tally across events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileProgress {
    pub path: PathBuf,
    pub state: TransferState,
    pub file_size: u64,
    pub total_blocks: u64,
    pub done_blocks: u64,
    pub done_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockProgress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryProgress>,
}

impl FileProgress {
    /// Creates an `Init` snapshot with zeroed counters.
    pub fn new(path: impl Into<PathBuf>, file_size: u64, total_blocks: u64) -> Self {
        Self {
            path: path.into(),
            state: TransferState::Init,
            file_size,
            total_blocks,
            done_blocks: 0,
            done_bytes: 0,
            block: None,
            retry: None,
        }
    }

    /// Fraction of bytes stored, in `0.0..=1.0`. Empty files count as done
    /// once their single block is stored.
    pub fn fraction(&self) -> f64 {
        if self.file_size == 0 {
            if self.total_blocks > 0 && self.done_blocks >= self.total_blocks {
                return 1.0;
            }
            return 0.0;
        }
        (self.done_bytes as f64 / self.file_size as f64).min(1.0)
    }
}

/// Observer for upload lifecycle events.
///
/// Every method defaults to a no-op so implementors only override what
/// they render. Methods are called from worker tasks and must not block.
pub trait ProgressHook: Send + Sync {
    /// A transfer session was opened (and its passcode bound, if any).
    fn session_opened(&self, _session: &TransferSession) {}

    /// A transfer session was finalized; `temp_code` is set.
    fn session_finished(&self, _session: &TransferSession) {}

    /// A file upload is about to request its storage job.
    fn transfer_init(&self, _progress: &FileProgress) {}

    /// A block's first attempt is starting.
    fn block_started(&self, _progress: &FileProgress) {}

    /// A block was stored.
    fn block_done(&self, _progress: &FileProgress) {}

    /// A block attempt failed and is being retried.
    fn block_retry(&self, _progress: &FileProgress) {}

    /// All blocks are stored; the merge call is about to be made.
    fn confirm_merge(&self, _progress: &FileProgress) {}

    /// A file was merged and acknowledged.
    fn file_finished(&self, _progress: &FileProgress) {}

    /// A file upload was aborted; the batch stops after this event.
    fn file_failed(&self, _progress: &FileProgress) {}
}

/// A hook that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

impl ProgressHook for NoopHook {}
