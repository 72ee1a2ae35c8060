//! Remote Provider and Object Store Abstractions
//!
//! Contracts for the two byte-moving collaborators of the sync engine: the
//! folder-based remote provider files are pulled from, and the object store
//! normalized bytes are pushed to.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Geolocation and capture details the provider extracted on its side.
///
/// Present only when the provider indexed the file's embedded metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderMediaMetadata {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Capture time as reported by the provider, format left untouched
    pub time: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ProviderMediaMetadata {
    /// Latitude/longitude pair, if the provider reported both.
    pub fn location(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }
}

/// File descriptor as returned by a remote provider listing.
///
/// Ephemeral: rebuilt on every listing and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub size: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
    /// Image media metadata, falling back to video media metadata
    pub media: Option<ProviderMediaMetadata>,
}

impl RemoteFile {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn is_video(&self) -> bool {
        self.mime_type.starts_with("video/")
    }

    /// File extension without the leading dot, lowercased.
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }
}

/// Folder-scoped remote file provider.
///
/// Implementations surface quota exhaustion as
/// [`BridgeError::RateLimited`](crate::error::BridgeError::RateLimited) and
/// missing files as [`BridgeError::NotFound`](crate::error::BridgeError::NotFound).
#[async_trait]
pub trait RemoteFileProvider: Send + Sync {
    /// List every non-trashed file directly inside `folder_id`.
    async fn list_folder(&self, folder_id: &str) -> Result<Vec<RemoteFile>>;

    /// Look up a single file by exact name inside `folder_id`.
    async fn find_by_name(&self, folder_id: &str, name: &str) -> Result<RemoteFile>;

    /// Download the full content of a file.
    async fn download(&self, file_id: &str) -> Result<Bytes>;
}

/// Object store holding the normalized media bytes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read an object. Objects above the store's size ceiling are rejected
    /// with [`BridgeError::TooLarge`](crate::error::BridgeError::TooLarge)
    /// before any content is read.
    async fn fetch_file(&self, path: &str) -> Result<Bytes>;

    /// Write an object, replacing any previous content at `path`.
    async fn upload_file(&self, path: &str, data: Bytes, content_type: &str) -> Result<()>;

    /// Issue a short-lived, credential-free read URL for `path`.
    async fn signed_url(&self, path: &str) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(name: &str, mime: &str) -> RemoteFile {
        RemoteFile {
            id: "id".to_string(),
            name: name.to_string(),
            mime_type: mime.to_string(),
            size: None,
            created_at: None,
            modified_at: None,
            media: None,
        }
    }

    #[test]
    fn test_remote_file_kind() {
        assert!(remote("a.jpg", "image/jpeg").is_image());
        assert!(remote("a.mp4", "video/mp4").is_video());
        assert!(!remote("a.pdf", "application/pdf").is_image());
    }

    #[test]
    fn test_remote_file_extension() {
        assert_eq!(remote("IMG_01.HEIC", "image/heic").extension(), Some("heic".to_string()));
        assert_eq!(remote("noext", "image/jpeg").extension(), None);
    }

    #[test]
    fn test_provider_location_requires_both() {
        let partial = ProviderMediaMetadata {
            latitude: Some(1.0),
            ..Default::default()
        };
        assert_eq!(partial.location(), None);

        let full = ProviderMediaMetadata {
            latitude: Some(1.0),
            longitude: Some(2.0),
            ..Default::default()
        };
        assert_eq!(full.location(), Some((1.0, 2.0)));
    }
}
