use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::ManifestPart;

// ---------------------------------------------------------------------------
// Management tier: form payloads
//
// These are sent as multipart form fields. Every field is a string on the
// wire, so numeric values are pre-formatted.
// ---------------------------------------------------------------------------

/// Declares the total payload size of a new transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareSendForm {
    pub total_size: String,
}

/// Binds a passcode to a transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BindPasscodeForm {
    pub transferguid: String,
    pub passcode: String,
}

/// Registers one file with a transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeforeUploadForm {
    pub file_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub file_name: String,
    pub original_name: String,
    pub file_size: String,
    pub transfer_guid: String,
    pub storage_prefix: String,
}

/// Marks one file as stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedForm {
    pub transfer_guid: String,
    pub file_guid: String,
    pub hash: String,
}

/// Finalizes a transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteForm {
    pub transfer_guid: String,
    pub file_id: String,
}

// ---------------------------------------------------------------------------
// Management tier: responses
// ---------------------------------------------------------------------------

/// Response to [`PrepareSendForm`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrepareSendResponse {
    #[serde(rename = "uptoken", default)]
    pub upload_token: String,
    #[serde(rename = "transferguid", default)]
    pub transfer_guid: String,
    #[serde(rename = "fileguid", default)]
    pub file_guid: String,
    #[serde(rename = "uniqueurl", default)]
    pub unique_url: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(rename = "qrcode", default)]
    pub qr_code: String,
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub error_message: String,
}

/// Response to [`BeforeUploadForm`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeforeUploadResponse {
    #[serde(default)]
    pub file_guid: String,
}

/// Response to [`CompleteForm`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteResponse {
    #[serde(default)]
    pub temp_download_code: String,
    #[serde(default)]
    pub complete: bool,
}

/// Transfer details behind a share link.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferDetailResponse {
    #[serde(default)]
    pub guid: String,
    #[serde(default)]
    pub download_name: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub uploaded: bool,
}

/// One page of a transfer's file listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferFilesResponse {
    #[serde(rename = "transferFileDtos", default)]
    pub items: Vec<TransferFileEntry>,
    #[serde(rename = "totalPages", default)]
    pub total_pages: u32,
}

/// A listed item. `size` is a decimal kilobyte count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferFileEntry {
    pub guid: String,
    pub file_name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub size: String,
}

/// Direct link for a listed item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadLinkResponse {
    #[serde(default)]
    pub link: String,
}

// ---------------------------------------------------------------------------
// Storage tier
// ---------------------------------------------------------------------------

/// Body of the init-multipart call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitMultipartRequest {
    pub transfer_guid: String,
    pub storage_prefix: String,
}

/// Response to [`InitMultipartRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitMultipartResponse {
    pub upload_id: String,
    #[serde(default)]
    pub expire_at: i64,
}

/// Response to a put-block call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PutBlockResponse {
    #[serde(default)]
    pub etag: String,
    /// Hex MD5 of the bytes the server received.
    #[serde(default)]
    pub md5: String,
}

/// Body of the merge-blocks call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeBlocksRequest {
    pub parts: Vec<ManifestPart>,
    pub fname: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
    #[serde(rename = "customVars", default, skip_serializing_if = "HashMap::is_empty")]
    pub custom_vars: HashMap<String, String>,
}

/// Response to [`MergeBlocksRequest`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeBlocksResponse {
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub key: String,
}

/// Accepts `"12.5"` as well as `12.5` and normalizes to a string.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected size as string or number, got {other}"
        ))),
    }
}
