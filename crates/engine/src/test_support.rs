//! In-memory management/storage tiers and a recording hook.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;
use cowput_protocol::TransferSession;
use cowput_protocol::messages::{
    CompleteResponse, InitMultipartResponse, MergeBlocksRequest, MergeBlocksResponse,
    PrepareSendResponse, PutBlockResponse, TransferDetailResponse, TransferFileEntry,
    TransferFilesResponse,
};
use cowput_transfer::{FileProgress, ProgressHook, md5_hex};

use crate::api::{BoxFuture, ManagementApi, StorageApi};
use crate::error::TransferError;

pub const SHARE_URL: &str = "https://example.test/s/1a2b3c4d5e6f7a";

// ---------------------------------------------------------------------------
// Hook
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingHook {
    events: Mutex<Vec<(&'static str, FileProgress)>>,
    sessions: Mutex<Vec<(&'static str, TransferSession)>>,
}

impl RecordingHook {
    pub fn events(&self) -> Vec<(&'static str, FileProgress)> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|(n, _)| *n).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(n, _)| *n == name)
            .count()
    }

    pub fn sessions(&self) -> Vec<(&'static str, TransferSession)> {
        self.sessions.lock().unwrap().clone()
    }

    fn push(&self, name: &'static str, progress: &FileProgress) {
        self.events.lock().unwrap().push((name, progress.clone()));
    }
}

impl ProgressHook for RecordingHook {
    fn session_opened(&self, session: &TransferSession) {
        self.sessions.lock().unwrap().push(("opened", session.clone()));
    }

    fn session_finished(&self, session: &TransferSession) {
        self.sessions.lock().unwrap().push(("finished", session.clone()));
    }

    fn transfer_init(&self, progress: &FileProgress) {
        self.push("transfer_init", progress);
    }

    fn block_started(&self, progress: &FileProgress) {
        self.push("block_started", progress);
    }

    fn block_done(&self, progress: &FileProgress) {
        self.push("block_done", progress);
    }

    fn block_retry(&self, progress: &FileProgress) {
        self.push("block_retry", progress);
    }

    fn confirm_merge(&self, progress: &FileProgress) {
        self.push("confirm_merge", progress);
    }

    fn file_finished(&self, progress: &FileProgress) {
        self.push("file_finished", progress);
    }

    fn file_failed(&self, progress: &FileProgress) {
        self.push("file_failed", progress);
    }
}

// ---------------------------------------------------------------------------
// Storage tier
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockStorage {
    attempts: Mutex<HashMap<u64, u32>>,
    puts: Mutex<Vec<(u64, usize)>>,
    inits: Mutex<Vec<String>>,
    merges: Mutex<Vec<MergeBlocksRequest>>,
    bad_md5: bool,
    fail_first: HashMap<u64, u32>,
    fail_always: HashSet<u64>,
    fail_init: bool,
    jitter: Option<Duration>,
}

impl MockStorage {
    /// Every put reports a digest that never matches.
    pub fn with_bad_md5(mut self) -> Self {
        self.bad_md5 = true;
        self
    }

    /// The first `times` attempts on `part` fail with a network error.
    pub fn failing_first(mut self, part: u64, times: u32) -> Self {
        self.fail_first.insert(part, times);
        self
    }

    pub fn failing_always(mut self, part: u64) -> Self {
        self.fail_always.insert(part);
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// Odd parts are delayed so completions arrive out of order.
    pub fn with_jitter(mut self, delay: Duration) -> Self {
        self.jitter = Some(delay);
        self
    }

    pub fn put_attempts(&self, part: u64) -> u32 {
        self.attempts.lock().unwrap().get(&part).copied().unwrap_or(0)
    }

    /// `(part, len)` of every put, in call order.
    pub fn put_calls(&self) -> Vec<(u64, usize)> {
        self.puts.lock().unwrap().clone()
    }

    pub fn inits(&self) -> Vec<String> {
        self.inits.lock().unwrap().clone()
    }

    pub fn merges(&self) -> Vec<MergeBlocksRequest> {
        self.merges.lock().unwrap().clone()
    }
}

impl StorageApi for MockStorage {
    fn init_multipart<'a>(
        &'a self,
        _token: &'a str,
        object_key: &'a str,
        _transfer_id: &'a str,
        _prefix: &'a str,
    ) -> BoxFuture<'a, InitMultipartResponse> {
        Box::pin(async move {
            self.inits.lock().unwrap().push(object_key.to_string());
            if self.fail_init {
                return Err(TransferError::Protocol("no upload id".into()));
            }
            Ok(InitMultipartResponse {
                upload_id: "upload-1".into(),
                expire_at: 0,
            })
        })
    }

    fn put_block<'a>(
        &'a self,
        _token: &'a str,
        _object_key: &'a str,
        _upload_id: &'a str,
        part_number: u64,
        data: Bytes,
    ) -> BoxFuture<'a, PutBlockResponse> {
        Box::pin(async move {
            let attempt = {
                let mut attempts = self.attempts.lock().unwrap();
                let n = attempts.entry(part_number).or_insert(0);
                *n += 1;
                *n
            };
            self.puts.lock().unwrap().push((part_number, data.len()));

            if let Some(delay) = self.jitter
                && part_number % 2 == 1
            {
                tokio::time::sleep(delay).await;
            }

            let failing = self.fail_always.contains(&part_number)
                || self
                    .fail_first
                    .get(&part_number)
                    .is_some_and(|&times| attempt <= times);
            if failing {
                return Err(TransferError::Network(format!(
                    "injected failure on part {part_number}"
                )));
            }

            let md5 = if self.bad_md5 {
                "00000000000000000000000000000000".to_string()
            } else {
                md5_hex(&data)
            };
            Ok(PutBlockResponse {
                etag: format!("etag-{part_number}"),
                md5,
            })
        })
    }

    fn merge_blocks<'a>(
        &'a self,
        _token: &'a str,
        object_key: &'a str,
        _upload_id: &'a str,
        manifest: &'a MergeBlocksRequest,
    ) -> BoxFuture<'a, MergeBlocksResponse> {
        Box::pin(async move {
            self.merges.lock().unwrap().push(manifest.clone());
            Ok(MergeBlocksResponse {
                hash: format!("hash-{}", manifest.fname),
                key: object_key.to_string(),
            })
        })
    }
}

// ---------------------------------------------------------------------------
// Management tier
// ---------------------------------------------------------------------------

pub struct MockManagement {
    pub(crate) calls: Mutex<Vec<String>>,
    pub session_error: Option<String>,
    pub bind_ack: bool,
    pub finish_ack: bool,
    pub complete: bool,
    pub details: TransferDetailResponse,
    pub pages: Vec<TransferFilesResponse>,
    pub failing_links: HashSet<String>,
    pub failing_page: Option<u32>,
}

impl Default for MockManagement {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            session_error: None,
            bind_ack: true,
            finish_ack: true,
            complete: true,
            details: TransferDetailResponse {
                guid: "guid-1".into(),
                download_name: "share".into(),
                deleted: false,
                uploaded: true,
            },
            pages: vec![TransferFilesResponse {
                items: Vec::new(),
                total_pages: 1,
            }],
            failing_links: HashSet::new(),
            failing_page: None,
        }
    }
}

impl MockManagement {
    /// Replaces the listing with `pages` of `(guid, name, size)` items.
    pub fn with_pages(mut self, pages: &[&[(&str, &str, &str)]]) -> Self {
        let total_pages = pages.len() as u32;
        self.pages = pages
            .iter()
            .map(|items| TransferFilesResponse {
                items: items
                    .iter()
                    .map(|(guid, name, size)| TransferFileEntry {
                        guid: guid.to_string(),
                        file_name: name.to_string(),
                        size: size.to_string(),
                    })
                    .collect(),
                total_pages,
            })
            .collect();
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, op: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.split(':').next() == Some(op))
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ManagementApi for MockManagement {
    fn create_session(&self, total_size: u64) -> BoxFuture<'_, PrepareSendResponse> {
        Box::pin(async move {
            self.record(format!("create_session:{total_size}"));
            if let Some(message) = &self.session_error {
                return Err(TransferError::Remote {
                    message: message.clone(),
                });
            }
            Ok(PrepareSendResponse {
                upload_token: "tok".into(),
                transfer_guid: "tg".into(),
                unique_url: SHARE_URL.into(),
                prefix: "2024".into(),
                qr_code: "qr".into(),
                ..Default::default()
            })
        })
    }

    fn bind_passcode<'a>(&'a self, transfer_id: &'a str, passcode: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            self.record(format!("bind_passcode:{transfer_id}:{passcode}"));
            Ok(self.bind_ack)
        })
    }

    fn register_file<'a>(
        &'a self,
        transfer_id: &'a str,
        _prefix: &'a str,
        file_name: &'a str,
        file_size: u64,
    ) -> BoxFuture<'a, String> {
        Box::pin(async move {
            self.record(format!("register_file:{transfer_id}:{file_name}:{file_size}"));
            Ok(format!("fg-{file_name}"))
        })
    }

    fn finish_file<'a>(
        &'a self,
        transfer_id: &'a str,
        file_id: &'a str,
        content_hash: &'a str,
    ) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            self.record(format!("finish_file:{transfer_id}:{file_id}:{content_hash}"));
            Ok(self.finish_ack)
        })
    }

    fn finish_session<'a>(&'a self, transfer_id: &'a str) -> BoxFuture<'a, CompleteResponse> {
        Box::pin(async move {
            self.record(format!("finish_session:{transfer_id}"));
            Ok(CompleteResponse {
                temp_download_code: "654321".into(),
                complete: self.complete,
            })
        })
    }

    fn transfer_details<'a>(
        &'a self,
        transfer_id: &'a str,
        passcode: Option<&'a str>,
    ) -> BoxFuture<'a, TransferDetailResponse> {
        Box::pin(async move {
            self.record(format!(
                "transfer_details:{transfer_id}:{}",
                passcode.unwrap_or("")
            ));
            Ok(self.details.clone())
        })
    }

    fn transfer_files<'a>(
        &'a self,
        guid: &'a str,
        page: u32,
        _transfer_id: &'a str,
    ) -> BoxFuture<'a, TransferFilesResponse> {
        Box::pin(async move {
            self.record(format!("transfer_files:{guid}:{page}"));
            if self.failing_page == Some(page) {
                return Err(TransferError::Network(format!("page {page} unavailable")));
            }
            self.pages
                .get(page as usize)
                .cloned()
                .ok_or_else(|| TransferError::Protocol(format!("no page {page}")))
        })
    }

    fn download_link<'a>(&'a self, item_guid: &'a str) -> BoxFuture<'a, String> {
        Box::pin(async move {
            self.record(format!("download_link:{item_guid}"));
            if self.failing_links.contains(item_guid) {
                return Err(TransferError::Network(format!("no link for {item_guid}")));
            }
            Ok(format!("https://dl.example.test/{item_guid}"))
        })
    }
}
