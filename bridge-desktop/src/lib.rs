//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for server and desktop hosts:
//! - `HttpClient` using `reqwest`
//! - `ObjectStore` using a local directory and `tokio::fs`, with HMAC-signed
//!   read URLs
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{LocalObjectStore, ReqwestHttpClient};
//!
//! let http_client = ReqwestHttpClient::new("media-sync/0.1")?;
//! let store = LocalObjectStore::new("./storage", "http://localhost:8080/files", secret);
//! ```

mod http;
mod object_store;

pub use http::ReqwestHttpClient;
pub use object_store::{LocalObjectStore, DEFAULT_MAX_OBJECT_SIZE, DEFAULT_SIGNED_URL_TTL};
