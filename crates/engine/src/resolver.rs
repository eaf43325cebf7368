//! Share link resolution.
//!
//! A share URL is turned into direct per-file download links in three
//! steps: transfer details, the paginated file listing, then one link call
//! per listed item. Item failures stay on the item; everything before that
//! is terminal.

use std::fmt;
use std::sync::{Arc, LazyLock};

use cowput_protocol::constants::{LISTING_SIZE_UNIT, TRANSFER_ID_LEN};
use cowput_protocol::messages::TransferFileEntry;
use futures_util::{StreamExt, stream};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::ManagementApi;
use crate::error::{ErrorKind, TransferError};

static TRANSFER_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("[0-9a-f]{{{TRANSFER_ID_LEN}}}")).expect("transfer id pattern is valid")
});

/// Returns the first 14-character lowercase hex run in `url`.
pub fn extract_transfer_id(url: &str) -> Option<&str> {
    TRANSFER_ID.find(url).map(|m| m.as_str())
}

/// Converts a listing size (decimal kilobytes) to bytes, truncating.
pub fn listing_size_to_bytes(size: &str) -> Result<u64, TransferError> {
    let kb: f64 = size
        .trim()
        .parse()
        .map_err(|_| TransferError::Protocol(format!("invalid listed size: {size:?}")))?;
    if !kb.is_finite() || kb < 0.0 {
        return Err(TransferError::Protocol(format!("invalid listed size: {size:?}")));
    }
    Ok((kb * LISTING_SIZE_UNIT).trunc() as u64)
}

/// Why a single listed item could not be fully resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&TransferError> for ItemError {
    fn from(e: &TransferError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// A resolved listing item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub name: String,
    /// Direct download URL; empty if the link call failed.
    pub url: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ItemError>,
}

/// Resolves share URLs into downloadable files.
pub struct DownloadResolver {
    management: Arc<dyn ManagementApi>,
    passcode: Option<String>,
    concurrency: usize,
}

impl DownloadResolver {
    /// `concurrency` bounds in-flight link calls; values below 1 mean 1.
    pub fn new(
        management: Arc<dyn ManagementApi>,
        passcode: Option<String>,
        concurrency: usize,
    ) -> Self {
        Self {
            management,
            passcode: passcode.filter(|p| !p.is_empty()),
            concurrency: concurrency.max(1),
        }
    }

    /// Resolves every file behind `share_url`, in listing order.
    ///
    /// An URL without a transfer id fails before any call is made. A missing,
    /// deleted or still-uploading transfer and any listing page failure
    /// abort the resolution; per-item failures are reported on the item.
    pub async fn resolve(&self, share_url: &str) -> Result<Vec<FileInfo>, TransferError> {
        let transfer_id = extract_transfer_id(share_url)
            .ok_or_else(|| TransferError::DownloadUrlInvalid(share_url.to_string()))?;

        let details = self
            .management
            .transfer_details(transfer_id, self.passcode.as_deref())
            .await?;
        if details.guid.is_empty() {
            return Err(TransferError::NotFound);
        }
        if details.deleted {
            return Err(TransferError::Deleted);
        }
        if !details.uploaded {
            return Err(TransferError::UploadInProgress);
        }

        let entries = self.list_entries(&details.guid, transfer_id).await?;
        debug!(transfer = transfer_id, items = entries.len(), "listing fetched");

        let files: Vec<FileInfo> = stream::iter(entries)
            .map(|entry| self.resolve_entry(entry))
            .buffered(self.concurrency)
            .collect()
            .await;

        let failed = files.iter().filter(|f| f.error.is_some()).count();
        info!(transfer = transfer_id, files = files.len(), failed, "share resolved");
        Ok(files)
    }

    /// Fetches page 0 and, if more are declared, pages `1..total_pages`.
    async fn list_entries(
        &self,
        guid: &str,
        transfer_id: &str,
    ) -> Result<Vec<TransferFileEntry>, TransferError> {
        let first = self.management.transfer_files(guid, 0, transfer_id).await?;
        let total_pages = first.total_pages;
        let mut entries = first.items;

        for page in 1..total_pages {
            let next = self.management.transfer_files(guid, page, transfer_id).await?;
            entries.extend(next.items);
        }
        Ok(entries)
    }

    async fn resolve_entry(&self, entry: TransferFileEntry) -> FileInfo {
        let mut info = FileInfo {
            name: entry.file_name,
            url: String::new(),
            size: 0,
            error: None,
        };

        match self.management.download_link(&entry.guid).await {
            Ok(url) => info.url = url,
            Err(e) => {
                warn!(item = %entry.guid, error = %e, "cannot resolve download link");
                info.error = Some(ItemError::from(&e));
                return info;
            }
        }

        match listing_size_to_bytes(&entry.size) {
            Ok(size) => info.size = size,
            Err(e) => {
                warn!(item = %entry.guid, error = %e, "cannot convert listed size");
                info.error = Some(ItemError::from(&e));
            }
        }
        info
    }
}
