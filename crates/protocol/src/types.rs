use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use serde::{Deserialize, Serialize};

use crate::messages::PrepareSendResponse;

/// A transfer session brokered by the management tier.
///
/// Groups one or more uploaded files under a single share link. The
/// temporary share code is only known after the session is finalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferSession {
    pub upload_token: String,
    pub transfer_id: String,
    pub prefix: String,
    pub unique_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passcode: Option<String>,
    /// Identifier of the file currently being uploaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_code: Option<String>,
}

impl TransferSession {
    /// Builds a session from a successful create-session response.
    pub fn from_response(resp: PrepareSendResponse) -> Self {
        Self {
            upload_token: resp.upload_token,
            transfer_id: resp.transfer_guid,
            prefix: resp.prefix,
            unique_url: resp.unique_url,
            qr_code: non_empty(resp.qr_code),
            passcode: None,
            file_id: non_empty(resp.file_guid),
            temp_code: None,
        }
    }

    /// Returns `true` once the session has been finalized.
    pub fn is_finished(&self) -> bool {
        self.temp_code.is_some()
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

/// One entry of a merge manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestPart {
    pub etag: String,
    pub part_number: u64,
}

/// Computes the storage object key for a file in a transfer.
///
/// The key is URL-safe base64 (padded) of `{prefix}/{transfer_id}/{file_name}`.
pub fn storage_object_key(prefix: &str, transfer_id: &str, file_name: &str) -> String {
    URL_SAFE.encode(format!("{prefix}/{transfer_id}/{file_name}"))
}
