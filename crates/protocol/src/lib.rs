//! Wire protocol types for the two-tier transfer service.
//!
//! The management tier brokers transfer sessions (multipart form requests,
//! JSON or bare `true` responses). The storage tier accepts file content as
//! numbered parts and merges them into a finished object (JSON bodies,
//! `UpToken` authorization).

pub mod constants;
pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use types::{ManifestPart, TransferSession, storage_object_key};
