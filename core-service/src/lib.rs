//! Media service façade and bootstrap helpers.
//!
//! [`MediaService::from_config`] wires the default adapters (SQLite library,
//! local object store, reqwest transport, Google Drive connector, Nominatim
//! geocoder) into the sync engine. The service then answers cached media
//! lookups and owns the optional background sync loop.

pub mod cache;
pub mod error;

pub use cache::{CachedMedia, MediaPayload, ResultCache};
pub use error::{Result, ServiceError};

use std::sync::Arc;

use bridge_traits::storage::ObjectStore;
use chrono::Utc;
use core_async::sync::CancellationToken;
use core_async::task::JoinHandle;
use core_async::time::{Duration, Instant};
use core_library::models::MediaRecord;
use core_library::repositories::{MediaRepository, Page, PageRequest};
use core_metadata::normalizer::normalize;
use core_sync::{RefreshReport, SyncError, SyncOptions, SyncOrchestrator, SyncReport};
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "desktop-shims")]
use {
    bridge_desktop::{LocalObjectStore, ReqwestHttpClient},
    core_library::db::{create_pool, DatabaseConfig},
    core_library::repositories::SqliteMediaRepository,
    core_metadata::{GeocodeResolver, MetadataExtractor},
    core_runtime::config::AppConfig,
    core_sync::MetadataResolver,
    provider_google_drive::GoogleDriveConnector,
};

/// Primary façade exposed to the binary and to embedding hosts.
pub struct MediaService {
    repository: Arc<dyn MediaRepository>,
    store: Arc<dyn ObjectStore>,
    cache: ResultCache,
    sync: Option<Arc<SyncOrchestrator>>,
    sync_enabled: bool,
}

impl MediaService {
    /// Assemble a service from explicit collaborators, without sync.
    pub fn new(
        repository: Arc<dyn MediaRepository>,
        store: Arc<dyn ObjectStore>,
        cache: ResultCache,
    ) -> Self {
        Self {
            repository,
            store,
            cache,
            sync: None,
            sync_enabled: false,
        }
    }

    /// Attach a sync orchestrator.
    ///
    /// `folder_configured` states whether it mirrors a folder; without one
    /// only the refresh pass is available.
    pub fn with_sync(mut self, orchestrator: Arc<SyncOrchestrator>, folder_configured: bool) -> Self {
        self.sync = Some(orchestrator);
        self.sync_enabled = folder_configured;
        self
    }

    /// Build the default adapter stack from `config`.
    ///
    /// Must be called inside a runtime: the result cache starts its sweep
    /// task here.
    #[cfg(feature = "desktop-shims")]
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        config.validate()?;

        let pool = create_pool(DatabaseConfig::from_url(config.database_url.clone())).await?;
        let repository: Arc<dyn MediaRepository> = Arc::new(SqliteMediaRepository::new(pool));

        let store: Arc<dyn ObjectStore> = Arc::new(
            LocalObjectStore::new(
                config.storage.root.clone(),
                config.storage.public_base_url.clone(),
                config.storage.signing_secret.clone().into_bytes(),
            )
            .with_max_object_size(config.tuning.max_object_size)
            .with_signed_url_ttl(config.tuning.signed_url_ttl),
        );

        let http = Arc::new(ReqwestHttpClient::new(&config.geocoder.user_agent)?);
        let drive = Arc::new(GoogleDriveConnector::new(
            http.clone(),
            config.drive.api_key.clone(),
            &config.tuning,
        ));
        let geocoder = Arc::new(GeocodeResolver::new(
            http,
            config.geocoder.base_url.clone(),
            config.geocoder.user_agent.clone(),
            config.geocoder.referer.clone(),
        ));

        let mut resolver = MetadataResolver::new(store.clone(), geocoder, MetadataExtractor::new());
        if let Some(folder) = &config.drive.folder_id {
            resolver = resolver.with_remote(drive.clone(), folder.clone());
        }

        let mut orchestrator = SyncOrchestrator::new(
            drive,
            store.clone(),
            repository.clone(),
            Arc::new(resolver),
            config.tuning.clone(),
        );
        if let Some(folder) = &config.drive.folder_id {
            orchestrator = orchestrator.with_folder(folder.clone());
        }

        let cache = ResultCache::new(config.cache.ttl, config.cache.cleanup_interval);

        info!(
            sync_enabled = config.sync_enabled(),
            storage_root = %config.storage.root.display(),
            "Media service ready"
        );

        Ok(Self::new(repository, store, cache)
            .with_sync(Arc::new(orchestrator), config.sync_enabled()))
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Signed URL and display metadata for `file_name`.
    ///
    /// HEIC names also match records stored under the converted `.jpg` name.
    ///
    /// # Errors
    /// `ServiceError::Library` with a not-found kind when no record matches.
    #[instrument(skip(self))]
    pub async fn get_media(&self, file_name: &str) -> Result<CachedMedia> {
        if let Some(hit) = self.cache.get(file_name).await {
            debug!("Cache hit");
            return Ok(hit);
        }

        let record = self.record_for(file_name).await?;
        let url = self.store.signed_url(&record.storage_path).await?;

        Ok(self
            .remember(
                file_name,
                MediaPayload::SignedUrl(url),
                record.content_type.clone(),
                record,
            )
            .await)
    }

    /// Stored bytes for `file_name`, converted to JPEG when they are HEIC.
    ///
    /// Conversion failures serve the original bytes.
    #[instrument(skip(self))]
    pub async fn fetch_media(&self, file_name: &str) -> Result<CachedMedia> {
        let key = format!("bytes:{}", file_name);
        if let Some(hit) = self.cache.get(&key).await {
            debug!("Cache hit");
            return Ok(hit);
        }

        let record = self.record_for(file_name).await?;
        let raw = self.store.fetch_file(&record.storage_path).await?;
        debug!(bytes = raw.len(), "Fetched from storage");

        let media = normalize(&record.file_name, &record.content_type, raw).await;
        Ok(self
            .remember(&key, MediaPayload::Bytes(media.data), media.content_type, record)
            .await)
    }

    /// Cache a lookup result; uncacheable results are still returned.
    async fn remember(
        &self,
        key: &str,
        payload: MediaPayload,
        content_type: String,
        record: MediaRecord,
    ) -> CachedMedia {
        let stored = self
            .cache
            .set(
                key,
                payload.clone(),
                content_type.clone(),
                record.geo_location.clone(),
                record.file_name.clone(),
            )
            .await;

        stored.unwrap_or(CachedMedia {
            payload,
            content_type,
            place: record.geo_location,
            file_name: record.file_name,
            expires_at: Instant::now(),
        })
    }

    async fn record_for(&self, file_name: &str) -> Result<MediaRecord> {
        Ok(self
            .repository
            .get_by_file_name(file_name, Some(file_name))
            .await?)
    }

    /// One page of the library, newest capture first.
    pub async fn list_media(&self, page: PageRequest) -> Result<Page<MediaRecord>> {
        Ok(self.repository.list_page(page).await?)
    }

    fn orchestrator(&self) -> Result<&Arc<SyncOrchestrator>> {
        self.sync
            .as_ref()
            .ok_or_else(|| ServiceError::SyncNotConfigured("no sync orchestrator attached".to_string()))
    }

    fn folder_orchestrator(&self) -> Result<&Arc<SyncOrchestrator>> {
        let orchestrator = self.orchestrator()?;
        if !self.sync_enabled {
            return Err(ServiceError::SyncNotConfigured(
                "GOOGLE_DRIVE_FOLDER_ID is not set".to_string(),
            ));
        }
        Ok(orchestrator)
    }

    /// One-shot backfill of the configured folder.
    pub async fn backfill(
        &self,
        options: &SyncOptions,
        cancel: &CancellationToken,
    ) -> Result<SyncReport> {
        Ok(self.folder_orchestrator()?.backfill(options, cancel).await?)
    }

    /// One-shot metadata refresh over the whole library.
    pub async fn refresh_metadata(
        &self,
        options: &SyncOptions,
        cancel: &CancellationToken,
    ) -> Result<RefreshReport> {
        Ok(self.orchestrator()?.refresh_metadata(options, cancel).await?)
    }

    /// Start the watch loop, optionally preceded by a backfill.
    ///
    /// Files created while the backfill runs are picked up by the first
    /// watch tick.
    pub fn start_background_sync(&self, interval: Duration, backfill_first: bool) -> Result<SyncHandle> {
        let orchestrator = Arc::clone(self.folder_orchestrator()?);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = core_async::spawn(async move {
            let since = Utc::now();

            if backfill_first {
                match orchestrator.backfill(&SyncOptions::default(), &token).await {
                    Ok(report) => info!(processed = report.processed, "Startup backfill finished"),
                    Err(SyncError::Cancelled) => return,
                    Err(e) => warn!(error = %e, "Startup backfill finished with errors"),
                }
            }

            match orchestrator.watch(interval, since, &token).await {
                Ok(()) | Err(SyncError::Cancelled) => {}
                Err(e) => warn!(error = %e, "Watch loop exited"),
            }
        });

        info!(interval_secs = interval.as_secs(), backfill_first, "Background sync started");
        Ok(SyncHandle { cancel, task })
    }

    /// Stop background work owned by the service.
    pub fn shutdown(&self) {
        self.cache.stop();
    }
}

/// Control handle for the background sync task.
pub struct SyncHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SyncHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the loop and wait for it to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "Background sync task panicked");
        }
        info!("Background sync stopped");
    }
}
