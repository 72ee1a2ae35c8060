use bridge_traits::error::{BridgeError, ErrorKind};
use core_library::LibraryError;
use core_metadata::MetadataError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Provider error: {0}")]
    Provider(#[from] BridgeError),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Download of {file} timed out after {seconds} seconds")]
    Timeout { file: String, seconds: u64 },

    /// A pass finished but some files failed; counts are for the whole pass
    #[error("Sync finished with {errored} failed files ({processed} processed, {skipped} skipped)")]
    Incomplete {
        processed: usize,
        skipped: usize,
        errored: usize,
    },

    #[error("Sync cancelled")]
    Cancelled,

    #[error("Sync not configured: {0}")]
    NotConfigured(String),
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Provider(e) => e.kind(),
            SyncError::Library(e) => e.kind(),
            SyncError::Metadata(e) => e.kind(),
            _ => ErrorKind::Other,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.kind() == ErrorKind::RateLimited
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SyncError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
