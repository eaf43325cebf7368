//! Per-file upload pipeline.
//!
//! `Init → RequestJob → Uploading (Retrying)* → ConfirmMerge → Finalize →
//! Done`, with `Failed` reachable from every step. Blocks are pushed
//! serially when parallelism is 1, otherwise through a
//! [`BlockWorkerPool`](crate::pool::BlockWorkerPool).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cowput_protocol::messages::MergeBlocksRequest;
use cowput_protocol::{TransferSession, storage_object_key};
use cowput_transfer::{Block, BlockReader, ProgressHook, TransferState};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::api::{ManagementApi, StorageApi};
use crate::config::EngineConfig;
use crate::error::TransferError;
use crate::mime::content_type_for;
use crate::pool::{BlockOutcome, BlockResultIndex, BlockUploader, BlockWorkerPool, StorageJob};
use crate::tracker::FileTracker;

/// What a successful file upload produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReceipt {
    pub path: PathBuf,
    pub file_name: String,
    /// Management tier file identifier.
    pub file_id: String,
    pub object_key: String,
    /// Content hash reported by the merge call.
    pub content_hash: String,
    pub file_size: u64,
    pub total_blocks: u64,
}

/// Uploads single files into an open session.
pub struct FileUploadPipeline {
    management: Arc<dyn ManagementApi>,
    storage: Arc<dyn StorageApi>,
    hook: Arc<dyn ProgressHook>,
    config: EngineConfig,
}

impl FileUploadPipeline {
    pub fn new(
        management: Arc<dyn ManagementApi>,
        storage: Arc<dyn StorageApi>,
        hook: Arc<dyn ProgressHook>,
        config: EngineConfig,
    ) -> Self {
        Self {
            management,
            storage,
            hook,
            config,
        }
    }

    /// Uploads `path` into `session`.
    ///
    /// No merge is attempted unless every block was stored. `session.file_id`
    /// is set to the registered file's identifier.
    pub async fn upload(
        &self,
        session: &mut TransferSession,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<FileReceipt, TransferError> {
        check_cancelled(cancel)?;
        let (reader, file_name) = open_file(path, self.config.block_size).await?;

        let tracker = Arc::new(FileTracker::new(
            Arc::clone(&self.hook),
            path,
            reader.file_size(),
            reader.total_blocks(),
        ));
        tracker.transfer_init();

        let result = self
            .run(session, reader, &file_name, &tracker, cancel)
            .await;
        if let Err(e) = &result {
            error!(path = %path.display(), error = %e, "file upload failed");
            tracker.file_failed();
        }
        result
    }

    async fn run(
        &self,
        session: &mut TransferSession,
        reader: BlockReader,
        file_name: &str,
        tracker: &Arc<FileTracker>,
        cancel: &CancellationToken,
    ) -> Result<FileReceipt, TransferError> {
        let path = reader.path().to_path_buf();
        let file_size = reader.file_size();
        let total_blocks = reader.total_blocks();

        // RequestJob
        tracker.enter(TransferState::RequestJob);
        let file_id = self
            .management
            .register_file(&session.transfer_id, &session.prefix, file_name, file_size)
            .await?;
        session.file_id = Some(file_id.clone());

        check_cancelled(cancel)?;
        let object_key = storage_object_key(&session.prefix, &session.transfer_id, file_name);
        let init = self
            .storage
            .init_multipart(
                &session.upload_token,
                &object_key,
                &session.transfer_id,
                &session.prefix,
            )
            .await?;
        let job = StorageJob {
            token: session.upload_token.clone(),
            object_key,
            upload_id: init.upload_id,
        };
        debug!(
            path = %path.display(),
            file_id = %file_id,
            upload_id = %job.upload_id,
            blocks = total_blocks,
            "storage job ready"
        );

        // Uploading
        tracker.enter(TransferState::Uploading);
        let uploader = Arc::new(BlockUploader::new(
            Arc::clone(&self.storage),
            job.clone(),
            self.config.max_retry,
            self.config.verify_hash,
        ));
        let index = Arc::new(BlockResultIndex::new(total_blocks));
        if self.config.parallelism <= 1 {
            push_serial(reader, &uploader, tracker, &index, cancel).await?;
        } else {
            push_parallel(
                reader,
                self.config.parallelism,
                uploader,
                tracker,
                &index,
                cancel,
            )
            .await?;
        }
        check_cancelled(cancel)?;

        let index = Arc::into_inner(index)
            .ok_or_else(|| TransferError::Join("block index still in use".into()))?;
        let parts = index.into_manifest(&path)?;

        // ConfirmMerge
        tracker.confirm_merge();
        let manifest = MergeBlocksRequest {
            parts,
            fname: file_name.to_string(),
            mime_type: content_type_for(file_name).to_string(),
            metadata: HashMap::new(),
            custom_vars: HashMap::new(),
        };
        let merged = self
            .storage
            .merge_blocks(&job.token, &job.object_key, &job.upload_id, &manifest)
            .await?;
        if merged.hash.is_empty() {
            return Err(TransferError::Protocol(format!(
                "merge of {file_name} returned no content hash"
            )));
        }

        // Finalize
        tracker.enter(TransferState::Finalize);
        let acknowledged = self
            .management
            .finish_file(&session.transfer_id, &file_id, &merged.hash)
            .await?;
        if !acknowledged {
            return Err(TransferError::Protocol(format!(
                "finish of {file_name} not acknowledged"
            )));
        }

        tracker.file_finished();
        info!(
            path = %path.display(),
            bytes = file_size,
            blocks = tracker.done_blocks(),
            "file uploaded"
        );

        Ok(FileReceipt {
            path,
            file_name: file_name.to_string(),
            file_id,
            object_key: job.object_key,
            content_hash: merged.hash,
            file_size,
            total_blocks,
        })
    }
}

/// Stats and opens `path`, returning the reader and the file's base name.
async fn open_file(path: &Path, block_size: usize) -> Result<(BlockReader, String), TransferError> {
    let metadata = tokio::fs::metadata(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            TransferError::Validation(format!("path not found: {}", path.display()))
        }
        _ => TransferError::Io(e),
    })?;
    if !metadata.is_file() {
        return Err(TransferError::Validation(format!(
            "not a regular file: {}",
            path.display()
        )));
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| TransferError::Validation(format!("no file name: {}", path.display())))?;

    let owned = path.to_path_buf();
    let reader = tokio::task::spawn_blocking(move || BlockReader::open(&owned, block_size)).await??;
    Ok((reader, file_name))
}

/// Reads the next block off the async runtime.
async fn read_next(mut reader: BlockReader) -> Result<(BlockReader, Option<Block>), TransferError> {
    let (reader, block) = tokio::task::spawn_blocking(move || {
        let block = reader.next_block();
        (reader, block)
    })
    .await?;
    Ok((reader, block?))
}

/// Uploads blocks one at a time, stopping at the first terminal failure.
async fn push_serial(
    mut reader: BlockReader,
    uploader: &BlockUploader,
    tracker: &FileTracker,
    index: &BlockResultIndex,
    cancel: &CancellationToken,
) -> Result<(), TransferError> {
    loop {
        check_cancelled(cancel)?;
        let (next_reader, next) = read_next(reader).await?;
        reader = next_reader;
        let Some(block) = next else {
            return Ok(());
        };

        let number = block.index;
        match uploader.upload(&block, tracker).await {
            Ok(etag) => {
                index.record(
                    number,
                    BlockOutcome::Stored {
                        etag,
                        len: block.len(),
                    },
                );
            }
            Err(e) => {
                index.record(number, BlockOutcome::Failed(e));
                return Ok(());
            }
        }
    }
}

/// Feeds blocks to a worker pool, then waits for every worker.
async fn push_parallel(
    mut reader: BlockReader,
    workers: usize,
    uploader: Arc<BlockUploader>,
    tracker: &Arc<FileTracker>,
    index: &Arc<BlockResultIndex>,
    cancel: &CancellationToken,
) -> Result<(), TransferError> {
    let halt = cancel.child_token();
    let pool = BlockWorkerPool::spawn(
        workers,
        uploader,
        Arc::clone(tracker),
        Arc::clone(index),
        halt.clone(),
    );

    let produced = loop {
        if pool.is_halted() {
            break Ok(());
        }
        match read_next(reader).await {
            Ok((next_reader, Some(block))) => {
                reader = next_reader;
                if !pool.submit(block).await {
                    debug!(
                        recorded = index.recorded(),
                        total = index.total_blocks(),
                        "block pool halted, no more blocks submitted"
                    );
                    break Ok(());
                }
            }
            Ok((_, None)) => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    if produced.is_err() {
        halt.cancel();
    }
    let joined = pool.finish().await;
    produced?;
    joined
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), TransferError> {
    if cancel.is_cancelled() {
        return Err(TransferError::Cancelled);
    }
    Ok(())
}
