//! Object-storage tier client.
//!
//! All calls authenticate with the session's upload token
//! (`Authorization: UpToken <token>`) and exchange JSON.

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, REFERER};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use tracing::trace;

use cowput_protocol::constants::{multipart_init_path, multipart_merge_path, multipart_part_path};
use cowput_protocol::messages::{
    InitMultipartRequest, InitMultipartResponse, MergeBlocksRequest, MergeBlocksResponse,
    PutBlockResponse,
};

use crate::config::ClientConfig;
use crate::error::Error;

/// Client for the storage tier.
pub struct StorageClient {
    http: reqwest::Client,
    base_url: String,
}

impl StorageClient {
    /// Creates a client from the given settings.
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        let referer = config.api_base();
        let mut headers = HeaderMap::new();
        headers.insert(
            REFERER,
            HeaderValue::from_str(referer).map_err(|_| Error::InvalidHeader(referer.into()))?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.storage_base().to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, token: &str) -> Result<T, Error> {
        let auth = HeaderValue::from_str(&format!("UpToken {token}"))
            .map_err(|_| Error::InvalidHeader("upload token".into()))?;
        let resp = request.header(AUTHORIZATION, auth).send().await?;

        let status = resp.status();
        let body = resp.bytes().await?;
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        trace!(status = status.as_u16(), len = body.len(), "storage response");
        Ok(serde_json::from_slice(&body)?)
    }

    /// init-multipart: opens a block-upload job for `object_key`.
    pub async fn init_multipart(
        &self,
        token: &str,
        object_key: &str,
        transfer_id: &str,
        prefix: &str,
    ) -> Result<InitMultipartResponse, Error> {
        let body = InitMultipartRequest {
            transfer_guid: transfer_id.to_string(),
            storage_prefix: prefix.to_string(),
        };
        let request = self
            .http
            .post(self.url(&multipart_init_path(object_key)))
            .json(&body);
        let resp: InitMultipartResponse = self.send(request, token).await?;
        if resp.upload_id.is_empty() {
            return Err(Error::UnexpectedResponse("no upload id".into()));
        }
        Ok(resp)
    }

    /// put-block: stores one part. `part_number` is 1-based.
    pub async fn put_block(
        &self,
        token: &str,
        object_key: &str,
        upload_id: &str,
        part_number: u64,
        data: Bytes,
    ) -> Result<PutBlockResponse, Error> {
        let request = self
            .http
            .put(self.url(&multipart_part_path(object_key, upload_id, part_number)))
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(data);
        let resp: PutBlockResponse = self.send(request, token).await?;
        if resp.etag.is_empty() {
            return Err(Error::UnexpectedResponse(format!(
                "no etag for part {part_number}"
            )));
        }
        Ok(resp)
    }

    /// merge-blocks: assembles the stored parts into the final object.
    pub async fn merge_blocks(
        &self,
        token: &str,
        object_key: &str,
        upload_id: &str,
        manifest: &MergeBlocksRequest,
    ) -> Result<MergeBlocksResponse, Error> {
        let request = self
            .http
            .post(self.url(&multipart_merge_path(object_key, upload_id)))
            .json(manifest);
        self.send(request, token).await
    }
}
