//! Block upload workers and the per-file result index.
//!
//! A [`BlockWorkerPool`] owns `N` tasks sharing one single-slot intake
//! channel and one [`BlockResultIndex`]. At most `N` blocks are in flight,
//! plus one queued and the one the producer is reading. The first terminal block
//! failure halts the pool: workers finish their current block and stop
//! taking new ones, and the producer stops submitting.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use cowput_protocol::ManifestPart;
use cowput_transfer::{Block, RetryProgress, md5_hex};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::api::StorageApi;
use crate::error::TransferError;
use crate::tracker::FileTracker;

// ---------------------------------------------------------------------------
// Result index
// ---------------------------------------------------------------------------

/// Final outcome of one block.
#[derive(Debug)]
pub enum BlockOutcome {
    /// Stored; `etag` is the storage tier's receipt.
    Stored { etag: String, len: usize },
    /// Failed after exhausting retries.
    Failed(TransferError),
}

/// One slot per block, indexed by `block - 1`.
#[derive(Debug)]
pub struct BlockResultIndex {
    slots: Mutex<Vec<Option<BlockOutcome>>>,
}

impl BlockResultIndex {
    pub fn new(total_blocks: u64) -> Self {
        let slots = (0..total_blocks).map(|_| None).collect();
        Self {
            slots: Mutex::new(slots),
        }
    }

    pub fn total_blocks(&self) -> u64 {
        self.lock().len() as u64
    }

    /// Records the outcome of 1-based block `index`.
    ///
    /// Returns `false` (and drops `outcome`) if `index` is out of range or
    /// already has an outcome.
    pub fn record(&self, index: u64, outcome: BlockOutcome) -> bool {
        let mut slots = self.lock();
        let Some(slot) = index
            .checked_sub(1)
            .and_then(|i| slots.get_mut(i as usize))
        else {
            return false;
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(outcome);
        true
    }

    /// Number of blocks with an outcome.
    pub fn recorded(&self) -> u64 {
        self.lock().iter().filter(|s| s.is_some()).count() as u64
    }

    /// Builds the ascending, gap-free merge manifest.
    ///
    /// The lowest failed block wins over missing ones, since blocks are
    /// only left unrecorded after a failure halted the pool.
    pub fn into_manifest(self, path: &Path) -> Result<Vec<ManifestPart>, TransferError> {
        let slots = self.slots.into_inner().unwrap_or_else(PoisonError::into_inner);

        let mut missing = None;
        let mut parts = Vec::with_capacity(slots.len());
        for (i, slot) in slots.into_iter().enumerate() {
            let part_number = i as u64 + 1;
            match slot {
                Some(BlockOutcome::Stored { etag, .. }) => parts.push(ManifestPart { etag, part_number }),
                Some(BlockOutcome::Failed(e)) => {
                    return Err(TransferError::FileUpload {
                        path: path.to_path_buf(),
                        block: part_number,
                        source: Box::new(e),
                    });
                }
                None => {
                    missing.get_or_insert(part_number);
                }
            }
        }

        if let Some(block) = missing {
            return Err(TransferError::MissingBlock {
                path: path.to_path_buf(),
                block,
            });
        }
        Ok(parts)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Option<BlockOutcome>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Single block upload with retries
// ---------------------------------------------------------------------------

/// Storage job a file's blocks are pushed to.
#[derive(Debug, Clone)]
pub(crate) struct StorageJob {
    pub token: String,
    pub object_key: String,
    pub upload_id: String,
}

/// Pushes one block, retrying transient failures.
pub(crate) struct BlockUploader {
    storage: Arc<dyn StorageApi>,
    job: StorageJob,
    max_retry: u32,
    verify_hash: bool,
}

impl BlockUploader {
    pub(crate) fn new(
        storage: Arc<dyn StorageApi>,
        job: StorageJob,
        max_retry: u32,
        verify_hash: bool,
    ) -> Self {
        Self {
            storage,
            job,
            max_retry,
            verify_hash,
        }
    }

    /// Uploads `block`, making at most `max_retry + 1` attempts. Returns the
    /// block's etag.
    pub(crate) async fn upload(
        &self,
        block: &Block,
        tracker: &FileTracker,
    ) -> Result<String, TransferError> {
        tracker.block_started(block);
        let local_md5 = self.verify_hash.then(|| md5_hex(&block.data));

        let mut attempt = 0u32;
        loop {
            match self.put_once(block, local_md5.as_deref()).await {
                Ok(etag) => {
                    debug!(block = block.index, attempt, "block stored");
                    tracker.block_done(block);
                    return Ok(etag);
                }
                Err(e) if e.is_retryable() && attempt < self.max_retry => {
                    attempt += 1;
                    warn!(block = block.index, attempt, error = %e, "retrying block");
                    tracker.block_retry(
                        block,
                        RetryProgress {
                            attempt,
                            retries_left: self.max_retry - attempt,
                            error: e.to_string(),
                        },
                    );
                }
                Err(e) => {
                    error!(block = block.index, attempts = attempt + 1, error = %e, "block failed");
                    return Err(TransferError::BlockFailed {
                        block: block.index,
                        attempts: attempt + 1,
                        source: Box::new(e),
                    });
                }
            }
        }
    }

    async fn put_once(&self, block: &Block, local_md5: Option<&str>) -> Result<String, TransferError> {
        let resp = self
            .storage
            .put_block(
                &self.job.token,
                &self.job.object_key,
                &self.job.upload_id,
                block.index,
                block.data.clone(),
            )
            .await?;

        if let Some(expected) = local_md5
            && !resp.md5.eq_ignore_ascii_case(expected)
        {
            return Err(TransferError::Checksum {
                block: block.index,
                expected: expected.to_string(),
                actual: resp.md5,
            });
        }
        Ok(resp.etag)
    }
}

// ---------------------------------------------------------------------------
// Worker pool
// ---------------------------------------------------------------------------

/// Blocks queued ahead of the workers.
const INTAKE_CAPACITY: usize = 1;

/// Fixed-size pool uploading one file's blocks concurrently.
pub struct BlockWorkerPool {
    tx: mpsc::Sender<Block>,
    workers: JoinSet<()>,
    halt: CancellationToken,
}

impl BlockWorkerPool {
    /// Spawns `workers` (at least one) tasks that record into `index`.
    ///
    /// `halt` stops dispatch when cancelled; the pool also cancels it
    /// itself on the first terminal block failure.
    pub(crate) fn spawn(
        workers: usize,
        uploader: Arc<BlockUploader>,
        tracker: Arc<FileTracker>,
        index: Arc<BlockResultIndex>,
        halt: CancellationToken,
    ) -> Self {
        let workers_n = workers.max(1);
        let (tx, rx) = mpsc::channel::<Block>(INTAKE_CAPACITY);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let mut workers = JoinSet::new();
        for worker in 0..workers_n {
            let rx = Arc::clone(&rx);
            let uploader = Arc::clone(&uploader);
            let tracker = Arc::clone(&tracker);
            let index = Arc::clone(&index);
            let halt = halt.clone();
            workers.spawn(async move {
                run_worker(worker, rx, uploader, tracker, index, halt).await;
            });
        }

        Self { tx, workers, halt }
    }

    /// Queues a block, waiting while the intake is full.
    ///
    /// Returns `false` if the pool halted before the block was accepted.
    pub async fn submit(&self, block: Block) -> bool {
        if self.halt.is_cancelled() {
            return false;
        }
        tokio::select! {
            biased;
            _ = self.halt.cancelled() => false,
            sent = self.tx.send(block) => sent.is_ok(),
        }
    }

    /// Whether dispatch has stopped.
    pub fn is_halted(&self) -> bool {
        self.halt.is_cancelled()
    }

    /// Closes the intake and waits for every worker to return.
    pub async fn finish(self) -> Result<(), TransferError> {
        let Self {
            tx, mut workers, ..
        } = self;
        drop(tx);

        let mut first_err = None;
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "block worker panicked");
                first_err.get_or_insert(TransferError::from(e));
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

async fn run_worker(
    worker: usize,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Block>>>,
    uploader: Arc<BlockUploader>,
    tracker: Arc<FileTracker>,
    index: Arc<BlockResultIndex>,
    halt: CancellationToken,
) {
    loop {
        let next = {
            let mut rx = rx.lock().await;
            tokio::select! {
                biased;
                _ = halt.cancelled() => None,
                block = rx.recv() => block,
            }
        };
        let Some(block) = next else {
            break;
        };
        if halt.is_cancelled() {
            break;
        }

        let number = block.index;
        let outcome = match uploader.upload(&block, &tracker).await {
            Ok(etag) => BlockOutcome::Stored {
                etag,
                len: block.len(),
            },
            Err(e) => {
                halt.cancel();
                BlockOutcome::Failed(e)
            }
        };
        if !index.record(number, outcome) {
            warn!(worker, block = number, "duplicate or out-of-range block outcome ignored");
        }
    }
    debug!(worker, "block worker stopped");
}
