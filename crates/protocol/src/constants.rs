use std::time::Duration;

/// Default management tier base URL.
pub const DEFAULT_API_URL: &str = "https://cowtransfer.com";

/// Default storage tier base URL.
pub const DEFAULT_STORAGE_URL: &str = "https://upload-fog-cn-east-1.qiniup.com";

/// Browser user agent expected by the management tier.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/85.0.4183.102 Safari/537.36 Edg/85.0.564.51";

/// Default block size: 4 MiB.
pub const DEFAULT_BLOCK_SIZE: usize = 4 * 1024 * 1024;

/// Largest block size the storage tier accepts.
pub const MAX_BLOCK_SIZE: usize = 4 * 1024 * 1024;

/// Per-call timeout for every request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Additional attempts per block after the first failure.
pub const DEFAULT_MAX_RETRY: u32 = 3;

/// Cookie name appended (with a nanosecond timestamp) to management calls.
pub const COOKIE_MARKER: &str = "cf-cs-k-20181214";

/// Bucket holding uploaded objects.
pub const STORAGE_BUCKET: &str = "cowtransfer-yz";

/// Length of the hexadecimal transfer identifier embedded in share URLs.
pub const TRANSFER_ID_LEN: usize = 14;

/// Multiplier converting listing sizes (kilobytes) to bytes.
pub const LISTING_SIZE_UNIT: f64 = 1024.0;

// ---------------------------------------------------------------------------
// Management tier endpoints
// ---------------------------------------------------------------------------

/// create-session(totalSize).
pub const PREPARE_SEND_PATH: &str = "/transfer/preparesend";
/// bind-passcode(transferId, passcode).
pub const BIND_PASSCODE_PATH: &str = "/transfer/v2/bindpasscode";
/// register-file(transferId, prefix, fileName, fileSize).
pub const BEFORE_UPLOAD_PATH: &str = "/transfer/beforeupload";
/// finish-file(transferId, fileId, contentHash).
pub const UPLOADED_PATH: &str = "/transfer/uploaded";
/// finish-session(transferId).
pub const COMPLETE_PATH: &str = "/transfer/complete";
/// transfer-details(transferId, passcode).
pub const TRANSFER_DETAIL_PATH: &str = "/transfer/transferdetail";
/// transfer-files(guid, page).
pub const TRANSFER_FILES_PATH: &str = "/transfer/files";
/// resolve-item(itemGuid).
pub const DOWNLOAD_PATH: &str = "/transfer/download";

// ---------------------------------------------------------------------------
// Storage tier endpoints
// ---------------------------------------------------------------------------

/// init-multipart(objectKey).
pub fn multipart_init_path(object_key: &str) -> String {
    format!("/buckets/{STORAGE_BUCKET}/objects/{object_key}/uploads")
}

/// put-block(objectKey, uploadId, partNumber).
pub fn multipart_part_path(object_key: &str, upload_id: &str, part_number: u64) -> String {
    format!("/buckets/{STORAGE_BUCKET}/objects/{object_key}/uploads/{upload_id}/{part_number}")
}

/// merge-blocks(objectKey, uploadId).
pub fn multipart_merge_path(object_key: &str, upload_id: &str) -> String {
    format!("/buckets/{STORAGE_BUCKET}/objects/{object_key}/uploads/{upload_id}")
}

/// Referer the management tier expects on share-link calls.
pub fn share_referer(api_url: &str, transfer_id: &str) -> String {
    format!("{api_url}/s/{transfer_id}")
}
