//! Multi-file upload driver.

use std::path::PathBuf;
use std::sync::Arc;

use cowput_protocol::TransferSession;
use cowput_transfer::ProgressHook;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::api::{ManagementApi, StorageApi};
use crate::config::EngineConfig;
use crate::error::TransferError;
use crate::pipeline::{FileReceipt, FileUploadPipeline};
use crate::scanner::collect_upload_files;
use crate::session::SessionManager;

/// Result of a completed batch.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// The finished session; `temp_code` is set.
    pub session: TransferSession,
    pub files: Vec<FileReceipt>,
}

impl UploadOutcome {
    /// Public share link of the batch.
    pub fn link(&self) -> &str {
        &self.session.unique_url
    }
}

/// Uploads a batch of paths into one share.
///
/// Files go one after another; any file failure aborts the batch without
/// finalizing the session, so no link is returned for a partial upload.
pub struct Uploader {
    sessions: SessionManager,
    pipeline: FileUploadPipeline,
    cancel: CancellationToken,
}

impl Uploader {
    pub fn new(
        management: Arc<dyn ManagementApi>,
        storage: Arc<dyn StorageApi>,
        hook: Arc<dyn ProgressHook>,
        config: EngineConfig,
    ) -> Result<Self, TransferError> {
        config.validate()?;
        let sessions = SessionManager::new(
            Arc::clone(&management),
            Arc::clone(&hook),
            config.passcode().map(String::from),
        );
        let pipeline = FileUploadPipeline::new(management, storage, hook, config);
        Ok(Self {
            sessions,
            pipeline,
            cancel: CancellationToken::new(),
        })
    }

    /// Token that aborts the running batch when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn upload(&self, paths: &[PathBuf]) -> Result<UploadOutcome, TransferError> {
        if paths.is_empty() {
            return Err(TransferError::Validation("no input paths".into()));
        }
        let owned = paths.to_vec();
        let (files, total_size) =
            tokio::task::spawn_blocking(move || collect_upload_files(&owned)).await??;
        if files.is_empty() {
            return Err(TransferError::Validation("no regular files to upload".into()));
        }
        self.check_cancelled()?;

        info!(files = files.len(), total_bytes = total_size, "starting upload");
        let mut session = self.sessions.open(total_size).await?;

        let mut receipts = Vec::with_capacity(files.len());
        for path in &files {
            self.check_cancelled()?;
            let receipt = self.pipeline.upload(&mut session, path, &self.cancel).await?;
            receipts.push(receipt);
        }

        self.check_cancelled()?;
        self.sessions.finish(&mut session).await?;

        Ok(UploadOutcome {
            session,
            files: receipts,
        })
    }

    fn check_cancelled(&self) -> Result<(), TransferError> {
        if self.cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }
        Ok(())
    }
}
