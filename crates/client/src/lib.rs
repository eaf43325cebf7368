//! Async HTTP clients for the transfer service.
//!
//! [`ManagementClient`] talks to the management tier (sessions, file
//! registration, share-link listing) and carries the session cookie.
//! [`StorageClient`] talks to the object-storage tier (multipart init,
//! block put, merge) using the session's upload token.

pub mod config;
pub mod cookie;
pub mod error;
pub mod management;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::ClientConfig;
pub use cookie::SessionCookie;
pub use error::Error;
pub use management::ManagementClient;
pub use storage::StorageClient;
