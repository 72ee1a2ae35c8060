//! Short-lived cache of resolved media lookups
//!
//! Entries expire `ttl` after they were written. Reads treat expired entries
//! as misses; a background sweep removes them every `cleanup_interval` until
//! the cache is stopped or dropped.

use bytes::Bytes;
use core_async::sync::{CancellationToken, RwLock};
use core_async::time::{interval_at, Duration, Instant, MissedTickBehavior};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// How a cached media item is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaPayload {
    /// Time-limited URL into the object store
    SignedUrl(String),
    /// The (possibly converted) bytes themselves
    Bytes(Bytes),
}

impl MediaPayload {
    pub fn is_empty(&self) -> bool {
        match self {
            MediaPayload::SignedUrl(url) => url.is_empty(),
            MediaPayload::Bytes(data) => data.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedMedia {
    pub payload: MediaPayload,
    pub content_type: String,
    /// Place name, empty when unknown
    pub place: String,
    pub file_name: String,
    pub expires_at: Instant,
}

type Entries = Arc<RwLock<HashMap<String, CachedMedia>>>;

pub struct ResultCache {
    entries: Entries,
    ttl: Duration,
    sweep: CancellationToken,
}

impl ResultCache {
    /// Create the cache and start its sweep task.
    ///
    /// Must be called inside a runtime.
    pub fn new(ttl: Duration, cleanup_interval: Duration) -> Self {
        let entries: Entries = Arc::new(RwLock::new(HashMap::new()));
        let sweep = CancellationToken::new();

        core_async::spawn(sweep_expired(
            Arc::clone(&entries),
            cleanup_interval,
            sweep.clone(),
        ));

        Self {
            entries,
            ttl,
            sweep,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Live entry for `key`.
    pub async fn get(&self, key: &str) -> Option<CachedMedia> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .cloned()
    }

    /// Store an entry and return it.
    ///
    /// Empty keys and empty payloads are ignored and return `None`.
    pub async fn set(
        &self,
        key: &str,
        payload: MediaPayload,
        content_type: impl Into<String>,
        place: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Option<CachedMedia> {
        if key.is_empty() || payload.is_empty() {
            return None;
        }

        let entry = CachedMedia {
            payload,
            content_type: content_type.into(),
            place: place.into(),
            file_name: file_name.into(),
            expires_at: Instant::now() + self.ttl,
        };
        self.entries
            .write()
            .await
            .insert(key.to_string(), entry.clone());
        Some(entry)
    }

    /// Entries held, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Stop the sweep task. Idempotent.
    pub fn stop(&self) {
        self.sweep.cancel();
    }
}

impl Drop for ResultCache {
    fn drop(&mut self) {
        self.sweep.cancel();
    }
}

async fn sweep_expired(entries: Entries, every: Duration, stop: CancellationToken) {
    let mut ticker = interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        core_async::select! {
            biased;
            _ = stop.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let now = Instant::now();
        let mut map = entries.write().await;
        let before = map.len();
        map.retain(|_, entry| entry.expires_at > now);
        let removed = before - map.len();
        if removed > 0 {
            debug!(removed, remaining = map.len(), "Swept expired cache entries");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_async::time::sleep;

    const TTL: Duration = Duration::from_secs(15 * 60);
    const CLEANUP: Duration = Duration::from_secs(10 * 60);

    fn url(value: &str) -> MediaPayload {
        MediaPayload::SignedUrl(value.to_string())
    }

    #[core_async::test(start_paused)]
    async fn test_entry_expires_and_is_swept() {
        let cache = ResultCache::new(TTL, CLEANUP);
        cache
            .set("IMG_0001.jpg", url("https://cdn/a"), "image/jpeg", "London", "IMG_0001.jpg")
            .await;

        let hit = cache.get("IMG_0001.jpg").await.unwrap();
        assert_eq!(hit.payload, url("https://cdn/a"));
        assert_eq!(hit.place, "London");

        sleep(TTL + Duration::from_secs(1)).await;
        assert!(cache.get("IMG_0001.jpg").await.is_none());

        sleep(CLEANUP).await;
        assert!(cache.is_empty().await);
    }

    #[core_async::test(start_paused)]
    async fn test_empty_key_or_payload_is_ignored() {
        let cache = ResultCache::new(TTL, CLEANUP);
        assert!(cache
            .set("", url("https://cdn/a"), "image/jpeg", "", "a.jpg")
            .await
            .is_none());
        cache
            .set("a.jpg", MediaPayload::Bytes(Bytes::new()), "image/jpeg", "", "a.jpg")
            .await;
        cache.set("b.jpg", url(""), "image/jpeg", "", "b.jpg").await;

        assert!(cache.is_empty().await);
    }

    #[core_async::test(start_paused)]
    async fn test_set_overwrites_and_renews() {
        let cache = ResultCache::new(TTL, CLEANUP);
        cache.set("a.jpg", url("one"), "image/jpeg", "", "a.jpg").await;
        sleep(TTL / 2).await;
        cache.set("a.jpg", url("two"), "image/jpeg", "", "a.jpg").await;
        sleep(TTL / 2 + Duration::from_secs(1)).await;

        let hit = cache.get("a.jpg").await.unwrap();
        assert_eq!(hit.payload, url("two"));
    }

    #[core_async::test(start_paused)]
    async fn test_stopped_cache_keeps_expired_entries() {
        let cache = ResultCache::new(TTL, CLEANUP);
        cache.set("a.jpg", url("one"), "image/jpeg", "", "a.jpg").await;
        cache.stop();

        sleep(TTL + CLEANUP * 2).await;
        assert!(cache.get("a.jpg").await.is_none());
        assert_eq!(cache.len().await, 1);
    }
}
