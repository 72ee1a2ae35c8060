//! Filesystem-backed object store with HMAC-signed read URLs

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::ObjectStore,
};
use bytes::Bytes;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Default ceiling for objects read back through [`ObjectStore::fetch_file`].
pub const DEFAULT_MAX_OBJECT_SIZE: u64 = 50 * 1024 * 1024;

/// Default lifetime of a signed URL.
pub const DEFAULT_SIGNED_URL_TTL: Duration = Duration::from_secs(15 * 60);

/// Object store rooted at a local directory.
///
/// Object paths are relative, `/`-separated keys. Signed URLs point at
/// `public_base_url` and carry an expiry plus an HMAC-SHA256 signature over
/// `path` and expiry; [`LocalObjectStore::verify_signature`] checks them on
/// the serving side.
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
    secret: Vec<u8>,
    max_object_size: u64,
    signed_url_ttl: Duration,
}

impl LocalObjectStore {
    pub fn new(
        root: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
        secret: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            secret: secret.into(),
            max_object_size: DEFAULT_MAX_OBJECT_SIZE,
            signed_url_ttl: DEFAULT_SIGNED_URL_TTL,
        }
    }

    pub fn with_max_object_size(mut self, bytes: u64) -> Self {
        self.max_object_size = bytes;
        self
    }

    pub fn with_signed_url_ttl(mut self, ttl: Duration) -> Self {
        self.signed_url_ttl = ttl;
        self
    }

    /// Map an object key onto the root, refusing anything that escapes it.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        if path.trim().is_empty() {
            return Err(BridgeError::InvalidInput("object path is empty".to_string()));
        }

        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(BridgeError::InvalidInput(format!(
                "object path must be relative and stay inside the store: {}",
                path
            )));
        }

        Ok(self.root.join(relative))
    }

    fn sign(&self, path: &str, expires: u64) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| BridgeError::OperationFailed(format!("invalid signing key: {}", e)))?;
        mac.update(path.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Check a signature produced by [`ObjectStore::signed_url`].
    ///
    /// Returns `false` for expired URLs and for signatures that do not match.
    pub fn verify_signature(&self, path: &str, expires: u64, signature: &str) -> bool {
        if unix_now() > expires {
            return false;
        }

        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.secret) else {
            return false;
        };
        mac.update(path.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn fetch_file(&self, path: &str) -> Result<Bytes> {
        let full_path = self.resolve(path)?;

        let metadata = fs::metadata(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BridgeError::NotFound(format!("object {}", path))
            } else {
                BridgeError::Io(e)
            }
        })?;

        if metadata.len() > self.max_object_size {
            return Err(BridgeError::TooLarge {
                path: path.to_string(),
                size: metadata.len(),
                limit: self.max_object_size,
            });
        }

        let data = fs::read(&full_path).await?;
        debug!(path = %path, bytes = data.len(), "Fetched object");
        Ok(Bytes::from(data))
    }

    async fn upload_file(&self, path: &str, data: Bytes, content_type: &str) -> Result<()> {
        if data.is_empty() {
            return Err(BridgeError::InvalidInput(format!(
                "refusing to upload empty object {}",
                path
            )));
        }
        let full_path = self.resolve(path)?;

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write then rename so readers never observe a partial object.
        let staging = full_path.with_extension("partial");
        let mut file = fs::File::create(&staging).await?;
        file.write_all(&data).await?;
        file.flush().await?;
        drop(file);
        fs::rename(&staging, &full_path).await?;

        debug!(path = %path, bytes = data.len(), content_type = %content_type, "Uploaded object");
        Ok(())
    }

    async fn signed_url(&self, path: &str) -> Result<String> {
        self.resolve(path)?;

        let expires = unix_now() + self.signed_url_ttl.as_secs();
        let signature = self.sign(path, expires)?;

        Ok(format!(
            "{}/{}?expires={}&signature={}",
            self.public_base_url,
            urlencoding::encode(path),
            expires,
            signature
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn store() -> (LocalObjectStore, PathBuf) {
        let root = env::temp_dir().join(format!("media-sync-store-{}", uuid::Uuid::new_v4()));
        (
            LocalObjectStore::new(root.clone(), "http://localhost:8080/files/", "secret"),
            root,
        )
    }

    #[tokio::test]
    async fn test_upload_then_fetch() {
        let (store, root) = store();

        store
            .upload_file("2025/IMG_0001.jpg", Bytes::from_static(b"jpeg"), "image/jpeg")
            .await
            .unwrap();
        let data = store.fetch_file("2025/IMG_0001.jpg").await.unwrap();
        assert_eq!(&data[..], b"jpeg");

        let _ = fs::remove_dir_all(root).await;
    }

    #[tokio::test]
    async fn test_fetch_rejects_large_objects_before_reading() {
        let (store, root) = store();
        let store = store.with_max_object_size(4);

        store
            .upload_file("big.jpg", Bytes::from_static(b"0123456789"), "image/jpeg")
            .await
            .unwrap();

        match store.fetch_file("big.jpg").await {
            Err(BridgeError::TooLarge { size, limit, .. }) => {
                assert_eq!(size, 10);
                assert_eq!(limit, 4);
            }
            other => panic!("expected TooLarge, got {:?}", other),
        }

        let _ = fs::remove_dir_all(root).await;
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let (store, _root) = store();
        let err = store.fetch_file("nope.jpg").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_upload_rejects_empty_input() {
        let (store, _root) = store();
        assert!(store
            .upload_file("", Bytes::from_static(b"x"), "image/jpeg")
            .await
            .is_err());
        assert!(store
            .upload_file("a.jpg", Bytes::new(), "image/jpeg")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_paths_cannot_escape_root() {
        let (store, _root) = store();
        let err = store.fetch_file("../etc/passwd").await.unwrap_err();
        assert!(matches!(err, BridgeError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_signed_url_round_trip() {
        let (store, _root) = store();
        let url = store.signed_url("IMG_0001.jpg").await.unwrap();

        assert!(url.starts_with("http://localhost:8080/files/IMG_0001.jpg?expires="));

        let query = url.split('?').nth(1).unwrap();
        let mut expires = 0u64;
        let mut signature = String::new();
        for pair in query.split('&') {
            let (k, v) = pair.split_once('=').unwrap();
            match k {
                "expires" => expires = v.parse().unwrap(),
                "signature" => signature = v.to_string(),
                _ => {}
            }
        }

        assert!(expires >= unix_now() + 14 * 60);
        assert!(store.verify_signature("IMG_0001.jpg", expires, &signature));
        assert!(!store.verify_signature("other.jpg", expires, &signature));
        assert!(!store.verify_signature("IMG_0001.jpg", 1, &signature));
    }
}
