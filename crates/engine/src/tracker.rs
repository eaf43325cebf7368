use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use cowput_transfer::{
    Block, BlockProgress, FileProgress, ProgressHook, RetryProgress, TransferState,
};
use tracing::debug;

/// Per-file progress counters shared by the producer and every worker.
///
/// Each event carries a full [`FileProgress`] snapshot so hooks never have
/// to keep their own tally.
pub(crate) struct FileTracker {
    hook: Arc<dyn ProgressHook>,
    path: PathBuf,
    file_size: u64,
    total_blocks: u64,
    done_blocks: AtomicU64,
    done_bytes: AtomicU64,
}

impl FileTracker {
    pub(crate) fn new(
        hook: Arc<dyn ProgressHook>,
        path: &Path,
        file_size: u64,
        total_blocks: u64,
    ) -> Self {
        Self {
            hook,
            path: path.to_path_buf(),
            file_size,
            total_blocks,
            done_blocks: AtomicU64::new(0),
            done_bytes: AtomicU64::new(0),
        }
    }

    fn snapshot(
        &self,
        state: TransferState,
        block: Option<&Block>,
        retry: Option<RetryProgress>,
    ) -> FileProgress {
        FileProgress {
            path: self.path.clone(),
            state,
            file_size: self.file_size,
            total_blocks: self.total_blocks,
            done_blocks: self.done_blocks.load(Ordering::Acquire),
            done_bytes: self.done_bytes.load(Ordering::Acquire),
            block: block.map(|b| BlockProgress {
                index: b.index,
                len: b.len(),
            }),
            retry,
        }
    }

    /// Logs a state change that has no hook event of its own.
    pub(crate) fn enter(&self, state: TransferState) {
        debug!(path = %self.path.display(), state = %state, "file state");
    }

    pub(crate) fn transfer_init(&self) {
        self.enter(TransferState::Init);
        self.hook
            .transfer_init(&self.snapshot(TransferState::Init, None, None));
    }

    pub(crate) fn block_started(&self, block: &Block) {
        self.hook
            .block_started(&self.snapshot(TransferState::Uploading, Some(block), None));
    }

    pub(crate) fn block_retry(&self, block: &Block, retry: RetryProgress) {
        self.hook.block_retry(&self.snapshot(
            TransferState::Retrying,
            Some(block),
            Some(retry),
        ));
    }

    pub(crate) fn block_done(&self, block: &Block) {
        self.done_bytes
            .fetch_add(block.len() as u64, Ordering::AcqRel);
        self.done_blocks.fetch_add(1, Ordering::AcqRel);
        self.hook
            .block_done(&self.snapshot(TransferState::Uploading, Some(block), None));
    }

    pub(crate) fn confirm_merge(&self) {
        self.enter(TransferState::ConfirmMerge);
        self.hook
            .confirm_merge(&self.snapshot(TransferState::ConfirmMerge, None, None));
    }

    pub(crate) fn file_finished(&self) {
        self.enter(TransferState::Done);
        self.hook
            .file_finished(&self.snapshot(TransferState::Done, None, None));
    }

    pub(crate) fn file_failed(&self) {
        self.enter(TransferState::Failed);
        self.hook
            .file_failed(&self.snapshot(TransferState::Failed, None, None));
    }

    pub(crate) fn done_blocks(&self) -> u64 {
        self.done_blocks.load(Ordering::Acquire)
    }
}
