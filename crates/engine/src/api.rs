//! Seams between the engine and the two remote tiers.
//!
//! The CLI wires in `cowput-client` types; tests use in-memory mocks that
//! record every call.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use cowput_client::{ManagementClient, StorageClient};
use cowput_protocol::messages::{
    CompleteResponse, InitMultipartResponse, MergeBlocksRequest, MergeBlocksResponse,
    PrepareSendResponse, PutBlockResponse, TransferDetailResponse, TransferFilesResponse,
};

use crate::error::TransferError;

/// Boxed future returned by the API traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, TransferError>> + Send + 'a>>;

/// Management tier operations.
pub trait ManagementApi: Send + Sync {
    /// Declares a new transfer. Fails with `Remote` if the server flags an error.
    fn create_session(&self, total_size: u64) -> BoxFuture<'_, PrepareSendResponse>;

    fn bind_passcode<'a>(&'a self, transfer_id: &'a str, passcode: &'a str) -> BoxFuture<'a, bool>;

    /// Returns the remote file identifier.
    fn register_file<'a>(
        &'a self,
        transfer_id: &'a str,
        prefix: &'a str,
        file_name: &'a str,
        file_size: u64,
    ) -> BoxFuture<'a, String>;

    fn finish_file<'a>(
        &'a self,
        transfer_id: &'a str,
        file_id: &'a str,
        content_hash: &'a str,
    ) -> BoxFuture<'a, bool>;

    fn finish_session<'a>(&'a self, transfer_id: &'a str) -> BoxFuture<'a, CompleteResponse>;

    fn transfer_details<'a>(
        &'a self,
        transfer_id: &'a str,
        passcode: Option<&'a str>,
    ) -> BoxFuture<'a, TransferDetailResponse>;

    /// Fetches one 0-based listing page.
    fn transfer_files<'a>(
        &'a self,
        guid: &'a str,
        page: u32,
        transfer_id: &'a str,
    ) -> BoxFuture<'a, TransferFilesResponse>;

    /// Resolves a listed item to its direct link.
    fn download_link<'a>(&'a self, item_guid: &'a str) -> BoxFuture<'a, String>;
}

/// Storage tier operations.
pub trait StorageApi: Send + Sync {
    fn init_multipart<'a>(
        &'a self,
        token: &'a str,
        object_key: &'a str,
        transfer_id: &'a str,
        prefix: &'a str,
    ) -> BoxFuture<'a, InitMultipartResponse>;

    /// Stores one block. `part_number` is 1-based.
    fn put_block<'a>(
        &'a self,
        token: &'a str,
        object_key: &'a str,
        upload_id: &'a str,
        part_number: u64,
        data: Bytes,
    ) -> BoxFuture<'a, PutBlockResponse>;

    fn merge_blocks<'a>(
        &'a self,
        token: &'a str,
        object_key: &'a str,
        upload_id: &'a str,
        manifest: &'a MergeBlocksRequest,
    ) -> BoxFuture<'a, MergeBlocksResponse>;
}

impl ManagementApi for ManagementClient {
    fn create_session(&self, total_size: u64) -> BoxFuture<'_, PrepareSendResponse> {
        Box::pin(async move { Ok(ManagementClient::create_session(self, total_size).await?) })
    }

    fn bind_passcode<'a>(&'a self, transfer_id: &'a str, passcode: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move { Ok(ManagementClient::bind_passcode(self, transfer_id, passcode).await?) })
    }

    fn register_file<'a>(
        &'a self,
        transfer_id: &'a str,
        prefix: &'a str,
        file_name: &'a str,
        file_size: u64,
    ) -> BoxFuture<'a, String> {
        Box::pin(async move {
            Ok(ManagementClient::register_file(self, transfer_id, prefix, file_name, file_size).await?)
        })
    }

    fn finish_file<'a>(
        &'a self,
        transfer_id: &'a str,
        file_id: &'a str,
        content_hash: &'a str,
    ) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            Ok(ManagementClient::finish_file(self, transfer_id, file_id, content_hash).await?)
        })
    }

    fn finish_session<'a>(&'a self, transfer_id: &'a str) -> BoxFuture<'a, CompleteResponse> {
        Box::pin(async move { Ok(ManagementClient::finish_session(self, transfer_id).await?) })
    }

    fn transfer_details<'a>(
        &'a self,
        transfer_id: &'a str,
        passcode: Option<&'a str>,
    ) -> BoxFuture<'a, TransferDetailResponse> {
        Box::pin(async move {
            Ok(ManagementClient::transfer_details(self, transfer_id, passcode).await?)
        })
    }

    fn transfer_files<'a>(
        &'a self,
        guid: &'a str,
        page: u32,
        transfer_id: &'a str,
    ) -> BoxFuture<'a, TransferFilesResponse> {
        Box::pin(async move {
            Ok(ManagementClient::transfer_files(self, guid, page, transfer_id).await?)
        })
    }

    fn download_link<'a>(&'a self, item_guid: &'a str) -> BoxFuture<'a, String> {
        Box::pin(async move { Ok(ManagementClient::download_link(self, item_guid).await?) })
    }
}

impl StorageApi for StorageClient {
    fn init_multipart<'a>(
        &'a self,
        token: &'a str,
        object_key: &'a str,
        transfer_id: &'a str,
        prefix: &'a str,
    ) -> BoxFuture<'a, InitMultipartResponse> {
        Box::pin(async move {
            Ok(StorageClient::init_multipart(self, token, object_key, transfer_id, prefix).await?)
        })
    }

    fn put_block<'a>(
        &'a self,
        token: &'a str,
        object_key: &'a str,
        upload_id: &'a str,
        part_number: u64,
        data: Bytes,
    ) -> BoxFuture<'a, PutBlockResponse> {
        Box::pin(async move {
            Ok(StorageClient::put_block(self, token, object_key, upload_id, part_number, data).await?)
        })
    }

    fn merge_blocks<'a>(
        &'a self,
        token: &'a str,
        object_key: &'a str,
        upload_id: &'a str,
        manifest: &'a MergeBlocksRequest,
    ) -> BoxFuture<'a, MergeBlocksResponse> {
        Box::pin(async move {
            Ok(StorageClient::merge_blocks(self, token, object_key, upload_id, manifest).await?)
        })
    }
}
