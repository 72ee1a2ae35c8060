//! # Google Drive Provider
//!
//! Implements `RemoteFileProvider` for Google Drive API v3.
//!
//! ## Overview
//!
//! This module provides:
//! - Paginated folder listing and exact-name lookup
//! - Whole-file downloads
//! - Request pacing with a minimum spacing between calls
//! - Exponential backoff on 403/429 responses, surfaced as rate-limit errors
//!   once the retry budget is spent

pub mod connector;
pub mod error;
pub mod pacing;
pub mod types;

pub use connector::{escape_query, GoogleDriveConnector, DRIVE_API_BASE};
pub use error::{GoogleDriveError, Result};
pub use pacing::RequestPacer;
