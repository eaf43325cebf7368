//! Management tier client.
//!
//! Session and file bookkeeping calls are multipart form POSTs; share-link
//! listing calls are GETs with a share-page `Referer`. Every call carries
//! the session cookie, which is captured from the first response that sets
//! one.

use reqwest::header::{COOKIE, HeaderMap, HeaderValue, ORIGIN, REFERER};
use reqwest::multipart::Form;
use reqwest::RequestBuilder;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use cowput_protocol::constants::{
    BEFORE_UPLOAD_PATH, BIND_PASSCODE_PATH, COMPLETE_PATH, DOWNLOAD_PATH, PREPARE_SEND_PATH,
    TRANSFER_DETAIL_PATH, TRANSFER_FILES_PATH, UPLOADED_PATH, share_referer,
};
use cowput_protocol::messages::{
    BeforeUploadForm, BeforeUploadResponse, BindPasscodeForm, CompleteForm, CompleteResponse,
    DownloadLinkResponse, PrepareSendForm, PrepareSendResponse, TransferDetailResponse,
    TransferFilesResponse, UploadedForm,
};

use crate::config::ClientConfig;
use crate::cookie::SessionCookie;
use crate::error::Error;

/// Client for the management tier.
pub struct ManagementClient {
    http: reqwest::Client,
    base_url: String,
    cookie: SessionCookie,
}

impl ManagementClient {
    /// Creates a client from the given settings.
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        let base_url = config.api_base().to_string();

        let origin = HeaderValue::from_str(&base_url)
            .map_err(|_| Error::InvalidHeader(base_url.clone()))?;
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, origin.clone());
        headers.insert(ORIGIN, origin);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            base_url,
            cookie: SessionCookie::new(config.cookie.as_deref()),
        })
    }

    /// The session cookie shared by every call of this client.
    pub fn cookie(&self) -> &SessionCookie {
        &self.cookie
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends a request with the session cookie and returns the body text.
    async fn send(&self, request: RequestBuilder) -> Result<String, Error> {
        let resp = request
            .header(COOKIE, self.cookie.header_value())
            .send()
            .await?;
        self.cookie.capture(resp.headers());

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }
        trace!(status = status.as_u16(), len = body.len(), "management response");
        Ok(body)
    }

    /// POSTs `form` as multipart form fields.
    async fn post_form<T: Serialize>(&self, path: &str, form: &T) -> Result<String, Error> {
        let request = self.http.post(self.url(path)).multipart(multipart_form(form)?);
        self.send(request).await
    }

    /// GETs a share-link endpoint with the share page as `Referer`.
    async fn get_shared(
        &self,
        path: &str,
        query: &[(&str, &str)],
        transfer_id: &str,
    ) -> Result<String, Error> {
        let request = self
            .http
            .get(self.url(path))
            .query(query)
            .header(REFERER, share_referer(&self.base_url, transfer_id));
        self.send(request).await
    }

    /// create-session: declares the batch's total size.
    pub async fn create_session(&self, total_size: u64) -> Result<PrepareSendResponse, Error> {
        let form = PrepareSendForm {
            total_size: total_size.to_string(),
        };
        let body = self.post_form(PREPARE_SEND_PATH, &form).await?;
        let resp: PrepareSendResponse = parse(&body)?;
        if resp.error {
            return Err(Error::Remote(resp.error_message));
        }
        debug!(transfer = %resp.transfer_guid, "session created");
        Ok(resp)
    }

    /// bind-passcode: returns the server's acknowledgement.
    pub async fn bind_passcode(&self, transfer_id: &str, passcode: &str) -> Result<bool, Error> {
        let form = BindPasscodeForm {
            transferguid: transfer_id.to_string(),
            passcode: passcode.to_string(),
        };
        let body = self.post_form(BIND_PASSCODE_PATH, &form).await?;
        Ok(is_affirmative(&body))
    }

    /// register-file: returns the remote file identifier.
    pub async fn register_file(
        &self,
        transfer_id: &str,
        prefix: &str,
        file_name: &str,
        file_size: u64,
    ) -> Result<String, Error> {
        let form = BeforeUploadForm {
            file_id: String::new(),
            kind: String::new(),
            file_name: file_name.to_string(),
            original_name: file_name.to_string(),
            file_size: file_size.to_string(),
            transfer_guid: transfer_id.to_string(),
            storage_prefix: prefix.to_string(),
        };
        let body = self.post_form(BEFORE_UPLOAD_PATH, &form).await?;
        let resp: BeforeUploadResponse = parse(&body)?;
        if resp.file_guid.is_empty() {
            return Err(Error::UnexpectedResponse(format!(
                "no file id for {file_name}"
            )));
        }
        Ok(resp.file_guid)
    }

    /// finish-file: returns the server's acknowledgement.
    pub async fn finish_file(
        &self,
        transfer_id: &str,
        file_id: &str,
        content_hash: &str,
    ) -> Result<bool, Error> {
        let form = UploadedForm {
            transfer_guid: transfer_id.to_string(),
            file_guid: file_id.to_string(),
            hash: content_hash.to_string(),
        };
        let body = self.post_form(UPLOADED_PATH, &form).await?;
        Ok(is_affirmative(&body))
    }

    /// finish-session: returns the temporary code and completion flag.
    pub async fn finish_session(&self, transfer_id: &str) -> Result<CompleteResponse, Error> {
        let form = CompleteForm {
            transfer_guid: transfer_id.to_string(),
            file_id: String::new(),
        };
        let body = self.post_form(COMPLETE_PATH, &form).await?;
        parse(&body)
    }

    /// transfer-details: looks up a share by its transfer identifier.
    pub async fn transfer_details(
        &self,
        transfer_id: &str,
        passcode: Option<&str>,
    ) -> Result<TransferDetailResponse, Error> {
        let query = [
            ("url", transfer_id),
            ("treceive", "undefined"),
            ("passcode", passcode.unwrap_or("")),
        ];
        let body = self
            .get_shared(TRANSFER_DETAIL_PATH, &query, transfer_id)
            .await?;
        parse(&body)
    }

    /// transfer-files: fetches one page (0-based) of a transfer's listing.
    pub async fn transfer_files(
        &self,
        guid: &str,
        page: u32,
        transfer_id: &str,
    ) -> Result<TransferFilesResponse, Error> {
        let page = page.to_string();
        let query = [("page", page.as_str()), ("guid", guid)];
        let body = self
            .get_shared(TRANSFER_FILES_PATH, &query, transfer_id)
            .await?;
        parse(&body)
    }

    /// resolve-item: returns the direct link of one listed item.
    pub async fn download_link(&self, item_guid: &str) -> Result<String, Error> {
        let request = self
            .http
            .post(self.url(DOWNLOAD_PATH))
            .query(&[("guid", item_guid)]);
        let body = self.send(request).await?;
        let resp: DownloadLinkResponse = parse(&body)?;
        if resp.link.is_empty() {
            return Err(Error::UnexpectedResponse(format!(
                "no link for item {item_guid}"
            )));
        }
        Ok(resp.link)
    }
}

/// Flattens a serializable form into multipart text fields.
fn multipart_form<T: Serialize>(form: &T) -> Result<Form, Error> {
    let serde_json::Value::Object(fields) = serde_json::to_value(form)? else {
        return Ok(Form::new());
    };
    Ok(fields.into_iter().fold(Form::new(), |out, (name, value)| {
        let text = match value {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        out.text(name, text)
    }))
}

fn parse<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    Ok(serde_json::from_str(body)?)
}

fn is_affirmative(body: &str) -> bool {
    body.trim() == "true"
}
