//! # Sync Orchestrator
//!
//! Keeps the media library convergent with one remote folder.
//!
//! ## Workflow
//!
//! Every remote file goes through the same steps, once per pass:
//! 1. Skip anything that is not an image
//! 2. Look the file up in the library (also under its converted `.jpg` name)
//! 3. Skip complete records, or any record in skip-existing mode
//! 4. New files only: download under a timeout, normalize HEIC to JPEG,
//!    upload and create a minimal record
//! 5. Resolve metadata and update the record
//!
//! An incomplete record is re-resolved from the stored copy without another
//! download, unless `force_refetch` asks for a fresh copy from the remote.
//!
//! ### Backfill
//! Lists the folder once and processes every file in listing order.
//!
//! ### Watch
//! Polls the folder on a fixed interval and processes only files created
//! after the previous tick.
//!
//! ### Refresh
//! Re-resolves records already in the library without touching the remote
//! folder listing.
//!
//! Every pass shares a [`CircuitBreaker`] across its files and stops cleanly
//! on cancellation.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{SyncOptions, SyncOrchestrator};
//!
//! let report = orchestrator.backfill(&SyncOptions::default(), &cancel).await?;
//! println!("{} files synced", report.processed);
//! ```

use bridge_traits::error::ErrorKind;
use bridge_traits::storage::{ObjectStore, RemoteFile, RemoteFileProvider};
use bridge_traits::time::{Clock, SystemClock};
use chrono::{DateTime, Utc};
use core_async::sync::CancellationToken;
use core_async::time::{interval_at, timeout, Duration, Instant, MissedTickBehavior};
use core_library::models::MediaRecord;
use core_library::repositories::{MediaRepository, PageRequest};
use core_metadata::normalizer::{normalize, NormalizedMedia};
use core_runtime::config::SyncTuning;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::circuit_breaker::{sleep_or_cancel, CircuitBreaker};
use crate::error::{Result, SyncError};
use crate::resolver::{provider_metadata, remote_candidates, MetadataResolver};

/// Page size used when walking the library during a refresh
pub const REFRESH_PAGE_SIZE: u32 = 100;

/// Per-pass switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Resolve and log, but upload, create and update nothing
    pub dry_run: bool,
    /// Backfill only: skip any file that already has a record
    pub skip_existing: bool,
    /// Download a fresh copy from the remote even when a stored copy exists,
    /// replace the stored object, and re-resolve every field
    pub force_refetch: bool,
    /// Refresh only: leave complete records alone
    pub only_incomplete: bool,
}

/// What happened to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Processed,
    Skipped,
}

/// Counters for a backfill pass or a watch tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Files returned by the listing (after the watch-time filter)
    pub listed: usize,
    pub processed: usize,
    pub skipped: usize,
    pub errored: usize,
}

impl SyncReport {
    fn into_result(self) -> Result<Self> {
        if self.errored > 0 {
            Err(SyncError::Incomplete {
                processed: self.processed,
                skipped: self.skipped,
                errored: self.errored,
            })
        } else {
            Ok(self)
        }
    }
}

/// Counters for a refresh pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub updated: usize,
    pub skipped: usize,
    /// Records no source could locate
    pub no_location: usize,
    pub errored: usize,
}

/// Result of one watch tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchTick {
    pub report: SyncReport,
    /// Watermark for the next tick
    pub next_since: DateTime<Utc>,
}

pub struct SyncOrchestrator {
    remote: Arc<dyn RemoteFileProvider>,
    store: Arc<dyn ObjectStore>,
    repository: Arc<dyn MediaRepository>,
    resolver: Arc<MetadataResolver>,
    folder_id: Option<String>,
    tuning: SyncTuning,
    clock: Arc<dyn Clock>,
}

impl SyncOrchestrator {
    pub fn new(
        remote: Arc<dyn RemoteFileProvider>,
        store: Arc<dyn ObjectStore>,
        repository: Arc<dyn MediaRepository>,
        resolver: Arc<MetadataResolver>,
        tuning: SyncTuning,
    ) -> Self {
        Self {
            remote,
            store,
            repository,
            resolver,
            folder_id: None,
            tuning,
            clock: Arc::new(SystemClock),
        }
    }

    /// Folder mirrored by backfill and watch.
    pub fn with_folder(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn folder(&self) -> Result<&str> {
        self.folder_id
            .as_deref()
            .ok_or_else(|| SyncError::NotConfigured("no remote folder configured".to_string()))
    }

    fn breaker(&self) -> CircuitBreaker {
        CircuitBreaker::new(self.tuning.breaker_threshold, self.tuning.breaker_cooldown)
    }

    /// Run one file through lookup, download, normalize, upload and resolve.
    #[instrument(skip(self, file, options), fields(file = %file.name, id = %file.id))]
    pub async fn sync_file(&self, file: &RemoteFile, options: &SyncOptions) -> Result<FileOutcome> {
        if !file.is_image() {
            debug!(mime_type = %file.mime_type, "Skipping non-image");
            return Ok(FileOutcome::Skipped);
        }

        let existing = self.lookup(file).await?;
        match &existing {
            Some(record) if record.is_complete() => {
                debug!("Already complete, skipping");
                return Ok(FileOutcome::Skipped);
            }
            Some(_) if options.skip_existing => {
                debug!("Record exists, skipping");
                return Ok(FileOutcome::Skipped);
            }
            Some(_) => debug!("Record exists but is incomplete"),
            None => debug!("No record yet"),
        }

        let record = match existing {
            Some(mut record) => {
                if record.source_name.trim().is_empty() {
                    record.source_name = file.name.clone();
                }
                if options.force_refetch {
                    let media = self.download(file).await?;
                    self.replace_stored(&record, media, options).await?;
                }
                record
            }
            None => {
                let media = self.download(file).await?;
                let mut record = MediaRecord::new_for_file(
                    media.file_name.clone(),
                    media.content_type.clone(),
                    media.file_name.clone(),
                );
                record.source_name = file.name.clone();
                record.created_at = self.clock.unix_timestamp();
                record.updated_at = record.created_at;
                record.merge(&provider_metadata(file));

                if options.dry_run {
                    info!(name = %media.file_name, "[dry run] Would upload and create record");
                } else {
                    self.store
                        .upload_file(&media.file_name, media.data, &media.content_type)
                        .await?;
                    record.id = self.repository.create(&record).await?;
                    debug!(record_id = %record.id, "Created record");
                }
                record
            }
        };

        let resolved = self.resolver.resolve(&record, options.force_refetch).await?;

        if options.dry_run {
            info!(
                place = %resolved.record.geo_location,
                date = %resolved.record.formatted_date,
                "[dry run] Would update record"
            );
            return Ok(FileOutcome::Processed);
        }

        self.repository
            .update(&resolved.record.id, &resolved.record)
            .await?;

        if resolved.record.geo_location.is_empty() {
            info!(name = %resolved.record.file_name, "Synced (no location)");
        } else {
            info!(
                name = %resolved.record.file_name,
                place = %resolved.record.geo_location,
                "Synced"
            );
        }
        Ok(FileOutcome::Processed)
    }

    /// Download `file` under the per-file timeout and normalize it.
    async fn download(&self, file: &RemoteFile) -> Result<NormalizedMedia> {
        let raw = timeout(self.tuning.download_timeout, self.remote.download(&file.id))
            .await
            .map_err(|_| SyncError::Timeout {
                file: file.name.clone(),
                seconds: self.tuning.download_timeout.as_secs(),
            })??;
        debug!(bytes = raw.len(), "Downloaded");

        Ok(normalize(&file.name, &file.mime_type, raw).await)
    }

    /// Overwrite the stored object behind `record` with `media`.
    async fn replace_stored(
        &self,
        record: &MediaRecord,
        media: NormalizedMedia,
        options: &SyncOptions,
    ) -> Result<()> {
        if options.dry_run {
            info!(path = %record.storage_path, "[dry run] Would replace stored object");
            return Ok(());
        }
        self.store
            .upload_file(&record.storage_path, media.data, &media.content_type)
            .await?;
        debug!(path = %record.storage_path, "Replaced stored object");
        Ok(())
    }

    /// Fetch a fresh copy of `record` from the remote folder into the store.
    ///
    /// Returns `false` when no folder is configured or the file is no longer
    /// in it; the stored copy is then left as is.
    async fn refetch(&self, record: &MediaRecord, options: &SyncOptions) -> Result<bool> {
        let Some(folder) = self.folder_id.as_deref() else {
            debug!(file = %record.file_name, "No remote folder, keeping stored copy");
            return Ok(false);
        };

        for name in remote_candidates(record) {
            let file = match self.remote.find_by_name(folder, &name).await {
                Ok(file) => file,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e.into()),
            };
            let media = self.download(&file).await?;
            self.replace_stored(record, media, options).await?;
            return Ok(true);
        }

        debug!(file = %record.file_name, "Not in remote folder, keeping stored copy");
        Ok(false)
    }

    async fn lookup(&self, file: &RemoteFile) -> Result<Option<MediaRecord>> {
        match self
            .repository
            .get_by_file_name(&file.name, Some(&file.mime_type))
            .await
        {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Process every file in the folder once.
    ///
    /// # Errors
    /// - `SyncError::Incomplete` when any file failed; the rest were still
    ///   processed
    /// - `SyncError::Cancelled` when `cancel` fired
    /// - the listing error when the folder could not be listed
    #[instrument(skip(self, options, cancel))]
    pub async fn backfill(
        &self,
        options: &SyncOptions,
        cancel: &CancellationToken,
    ) -> Result<SyncReport> {
        let folder = self.folder()?;
        info!(folder_id = %folder, "Starting backfill");

        let files = cancellable(cancel, async {
            self.remote.list_folder(folder).await.map_err(SyncError::from)
        })
        .await?;

        let mut breaker = self.breaker();
        let report = self.run_files(&files, options, &mut breaker, cancel).await?;

        info!(
            listed = report.listed,
            processed = report.processed,
            skipped = report.skipped,
            errored = report.errored,
            "Backfill complete"
        );
        report.into_result()
    }

    async fn run_files(
        &self,
        files: &[RemoteFile],
        options: &SyncOptions,
        breaker: &mut CircuitBreaker,
        cancel: &CancellationToken,
    ) -> Result<SyncReport> {
        let mut report = SyncReport {
            listed: files.len(),
            ..Default::default()
        };

        for file in files {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            match cancellable(cancel, self.sync_file(file, options)).await {
                Ok(FileOutcome::Skipped) => {
                    report.skipped += 1;
                    breaker.record_success();
                    continue;
                }
                Ok(FileOutcome::Processed) => {
                    report.processed += 1;
                    breaker.record_success();
                }
                Err(SyncError::Cancelled) => return Err(SyncError::Cancelled),
                Err(e) => {
                    warn!(file = %file.name, error = %e, "Sync failed");
                    report.errored += 1;
                    breaker.record_failure(e.kind(), cancel).await?;
                }
            }

            sleep_or_cancel(self.tuning.inter_file_delay, cancel).await?;
        }

        Ok(report)
    }

    /// One watch iteration: list, keep files created after `since`, sync them.
    ///
    /// On a failed listing the error is returned and the caller keeps its
    /// watermark, so the files are picked up by the next tick.
    #[instrument(skip(self, cancel))]
    pub async fn watch_tick(
        &self,
        since: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<WatchTick> {
        let mut breaker = self.breaker();
        self.watch_tick_with(since, &mut breaker, cancel).await
    }

    async fn watch_tick_with(
        &self,
        since: DateTime<Utc>,
        breaker: &mut CircuitBreaker,
        cancel: &CancellationToken,
    ) -> Result<WatchTick> {
        let folder = self.folder()?;
        let checked_at = self.clock.now();
        debug!(since = %since, "Checking for new files");

        let files = cancellable(cancel, async {
            self.remote.list_folder(folder).await.map_err(SyncError::from)
        })
        .await?;

        let new_files: Vec<RemoteFile> = files
            .into_iter()
            .filter(|file| match file.created_at {
                Some(created) => created > since,
                None => {
                    warn!(file = %file.name, "Missing creation time, ignoring");
                    false
                }
            })
            .collect();

        let options = SyncOptions::default();
        let report = self.run_files(&new_files, &options, breaker, cancel).await?;
        if report.processed > 0 {
            info!(processed = report.processed, "Synced new files");
        }

        Ok(WatchTick {
            report,
            next_since: checked_at,
        })
    }

    /// Poll the folder every `interval` until cancelled.
    ///
    /// The first tick fires one interval after the call. Always ends with
    /// `SyncError::Cancelled` unless the orchestrator has no folder.
    #[instrument(skip(self, cancel))]
    pub async fn watch(
        &self,
        interval: Duration,
        since: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.folder()?;
        info!(interval_secs = interval.as_secs(), "Starting watch");

        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut breaker = self.breaker();
        let mut since = since;

        loop {
            core_async::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Watch stopped");
                    return Err(SyncError::Cancelled);
                }
                _ = ticker.tick() => {}
            }

            match self.watch_tick_with(since, &mut breaker, cancel).await {
                Ok(tick) => {
                    if tick.report.errored > 0 {
                        warn!(errored = tick.report.errored, "Some new files failed to sync");
                    }
                    since = tick.next_since;
                }
                Err(SyncError::Cancelled) => {
                    info!("Watch stopped");
                    return Err(SyncError::Cancelled);
                }
                Err(e) => {
                    warn!(error = %e, "Watch tick failed");
                    if e.kind() == ErrorKind::RateLimited {
                        breaker.record_failure(e.kind(), cancel).await?;
                    }
                }
            }
        }
    }

    /// Re-resolve records already in the library.
    ///
    /// Records are collected up front so updates cannot reshuffle the pages
    /// still to be read.
    #[instrument(skip(self, options, cancel))]
    pub async fn refresh_metadata(
        &self,
        options: &SyncOptions,
        cancel: &CancellationToken,
    ) -> Result<RefreshReport> {
        let records = self.all_records(cancel).await?;
        info!(records = records.len(), "Starting metadata refresh");

        let mut breaker = self.breaker();
        let mut report = RefreshReport::default();

        for record in &records {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            if options.only_incomplete && record.is_complete() {
                debug!(file = %record.file_name, "Already complete, skipping");
                report.skipped += 1;
                continue;
            }

            if options.force_refetch {
                match cancellable(cancel, self.refetch(record, options)).await {
                    Ok(_) => {}
                    Err(SyncError::Cancelled) => return Err(SyncError::Cancelled),
                    Err(e) => {
                        warn!(file = %record.file_name, error = %e, "Refetch failed");
                        report.errored += 1;
                        breaker.record_failure(e.kind(), cancel).await?;
                        continue;
                    }
                }
            }

            let resolved =
                match cancellable(cancel, self.resolver.resolve(record, options.force_refetch))
                    .await
                {
                    Ok(resolved) => resolved,
                    Err(SyncError::Cancelled) => return Err(SyncError::Cancelled),
                    Err(e) => {
                        warn!(file = %record.file_name, error = %e, "Resolve failed");
                        report.errored += 1;
                        breaker.record_failure(e.kind(), cancel).await?;
                        continue;
                    }
                };
            breaker.record_success();

            if !resolved.has_location() {
                debug!(file = %record.file_name, "No location data in any source");
                report.no_location += 1;
                continue;
            }

            if options.dry_run {
                info!(
                    file = %record.file_name,
                    place = %resolved.record.geo_location,
                    "[dry run] Would update record"
                );
                report.updated += 1;
                continue;
            }

            if let Err(e) = self
                .repository
                .update(&resolved.record.id, &resolved.record)
                .await
            {
                warn!(file = %record.file_name, error = %e, "Saving record failed");
                report.errored += 1;
                continue;
            }

            info!(
                file = %record.file_name,
                place = %resolved.record.geo_location,
                "Updated record"
            );
            report.updated += 1;
            sleep_or_cancel(self.tuning.inter_file_delay, cancel).await?;
        }

        info!(
            updated = report.updated,
            skipped = report.skipped,
            no_location = report.no_location,
            errored = report.errored,
            "Metadata refresh complete"
        );
        Ok(report)
    }

    async fn all_records(&self, cancel: &CancellationToken) -> Result<Vec<MediaRecord>> {
        let mut records = Vec::new();
        let mut page = 0;

        loop {
            let batch = cancellable(cancel, async {
                self.repository
                    .list_page(PageRequest::new(page, REFRESH_PAGE_SIZE))
                    .await
                    .map_err(SyncError::from)
            })
            .await?;

            let has_next = batch.has_next();
            records.extend(batch.items);
            if !has_next {
                return Ok(records);
            }
            page += 1;
        }
    }
}

/// Run `fut` unless `cancel` fires first.
async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    core_async::select! {
        biased;
        _ = cancel.cancelled() => Err(SyncError::Cancelled),
        result = fut => result,
    }
}
