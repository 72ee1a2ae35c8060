//! # Host Bridge Traits
//!
//! Abstraction traits between the sync core and its outside collaborators.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP transport
//! - [`RemoteFileProvider`](storage::RemoteFileProvider) - Folder-scoped list/find/download
//! - [`ObjectStore`](storage::ObjectStore) - Byte storage with signed read URLs
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Its
//! [`kind`](error::BridgeError::kind) method is the single place callers ask
//! whether a failure was a rate limit, a missing object or something else;
//! adapters convert provider-native errors before they cross this boundary.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! behind `Arc` across the background sync task and request handlers.

pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::{BridgeError, ErrorKind};

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use storage::{ObjectStore, ProviderMediaMetadata, RemoteFile, RemoteFileProvider};
pub use time::{Clock, FixedClock, SystemClock};
