//! Engine tuning knobs.

use cowput_protocol::constants::{DEFAULT_BLOCK_SIZE, DEFAULT_MAX_RETRY, MAX_BLOCK_SIZE};
use tracing::warn;

use crate::error::TransferError;

/// Upload and resolution settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Bytes per block. At most [`MAX_BLOCK_SIZE`].
    pub block_size: usize,
    /// Concurrent block uploads per file. `1` uploads serially.
    pub parallelism: usize,
    /// Additional attempts per block after the first failure.
    pub max_retry: u32,
    /// Compare each block's MD5 against the digest the server reports.
    pub verify_hash: bool,
    /// Passcode bound to new sessions and sent when resolving shares.
    pub passcode: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            parallelism: 1,
            max_retry: DEFAULT_MAX_RETRY,
            verify_hash: true,
            passcode: None,
        }
    }
}

impl EngineConfig {
    /// Rejects settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.block_size == 0 {
            return Err(TransferError::Validation("block size must be positive".into()));
        }
        if self.block_size > MAX_BLOCK_SIZE {
            return Err(TransferError::Validation(format!(
                "block size {} exceeds maximum {MAX_BLOCK_SIZE}",
                self.block_size
            )));
        }
        if self.parallelism == 0 {
            return Err(TransferError::Validation("parallelism must be at least 1".into()));
        }
        Ok(())
    }

    /// Clamps an oversize block size to [`MAX_BLOCK_SIZE`]. Returns `true`
    /// if the value was changed.
    pub fn clamp_block_size(&mut self) -> bool {
        if self.block_size <= MAX_BLOCK_SIZE {
            return false;
        }
        warn!(
            requested = self.block_size,
            max = MAX_BLOCK_SIZE,
            "block size too large, clamping"
        );
        self.block_size = MAX_BLOCK_SIZE;
        true
    }

    /// The non-empty passcode, if one is configured.
    pub fn passcode(&self) -> Option<&str> {
        self.passcode.as_deref().filter(|p| !p.is_empty())
    }
}
