//! Workspace umbrella crate.
//!
//! Re-exports the service façade so hosts can depend on
//! `media-sync-workspace` and pick adapters through its feature flags
//! (`desktop-shims`, `heif`) without wiring each crate individually.

#[cfg(any(feature = "desktop-shims", feature = "heif"))]
pub use core_service::{MediaService, ServiceError, SyncHandle};
