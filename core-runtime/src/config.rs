//! # Configuration Module
//!
//! Provides configuration management for the media sync service.
//!
//! ## Overview
//!
//! An [`AppConfig`] is assembled through [`AppConfigBuilder`] and validated
//! fail-fast before any service is constructed. [`AppConfig::from_env`] maps
//! the process environment onto the builder, so the binary and tests share
//! the same validation path.
//!
//! Every retry, pacing and cooldown constant used by the sync engine lives in
//! [`SyncTuning`]. The defaults match the behavior the upstream quotas were
//! calibrated against; override them only with care.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::AppConfig;
//!
//! let config = AppConfig::builder()
//!     .api_key("AIza...")
//!     .folder_id("1AbCdEf")
//!     .signing_secret("change-me")
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::logging::{redact_if_sensitive, LogFormat, LogLevel};
use std::path::PathBuf;
use std::time::Duration;

/// Retry, pacing and circuit-breaker constants for the sync engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTuning {
    /// Minimum spacing between two Drive API calls
    pub pacing_delay: Duration,
    /// First backoff delay after a rate-limited response; doubles per attempt
    pub backoff_base: Duration,
    /// Attempts per page when listing a folder
    pub list_max_retries: u32,
    /// Attempts when looking a file up by name
    pub find_max_retries: u32,
    /// Attempts when downloading file content
    pub download_max_retries: u32,
    /// Upper bound for one file download including its retries
    pub download_timeout: Duration,
    /// Pause between two files of a pass
    pub inter_file_delay: Duration,
    /// Consecutive failures before a rate-limited failure trips the breaker
    pub breaker_threshold: u32,
    /// Pause once the breaker trips
    pub breaker_cooldown: Duration,
    /// Largest object the resolution pipeline will read back from storage
    pub max_object_size: u64,
    /// Lifetime of signed object URLs
    pub signed_url_ttl: Duration,
}

impl Default for SyncTuning {
    fn default() -> Self {
        Self {
            pacing_delay: Duration::from_secs(5),
            backoff_base: Duration::from_secs(5),
            list_max_retries: 3,
            find_max_retries: 3,
            download_max_retries: 5,
            download_timeout: Duration::from_secs(5 * 60),
            inter_file_delay: Duration::from_millis(100),
            breaker_threshold: 3,
            breaker_cooldown: Duration::from_secs(5 * 60),
            max_object_size: 50 * 1024 * 1024,
            signed_url_ttl: Duration::from_secs(15 * 60),
        }
    }
}

impl SyncTuning {
    pub fn validate(&self) -> Result<()> {
        if self.list_max_retries == 0
            || self.find_max_retries == 0
            || self.download_max_retries == 0
        {
            return Err(Error::Config(
                "Retry bounds must allow at least one attempt".to_string(),
            ));
        }

        if self.breaker_threshold == 0 {
            return Err(Error::Config(
                "Circuit breaker threshold must be greater than 0".to_string(),
            ));
        }

        if self.download_timeout.is_zero() {
            return Err(Error::Config(
                "Download timeout must be greater than 0".to_string(),
            ));
        }

        if self.max_object_size == 0 {
            return Err(Error::Config(
                "Maximum object size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Google Drive source settings.
#[derive(Clone, PartialEq, Eq)]
pub struct DriveConfig {
    pub api_key: String,
    /// Folder to mirror; background sync is disabled when absent
    pub folder_id: Option<String>,
    pub sync_interval: Duration,
    pub backfill_on_startup: bool,
}

/// Result cache settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(15 * 60),
            cleanup_interval: Duration::from_secs(10 * 60),
        }
    }
}

/// Object store settings.
#[derive(Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub root: PathBuf,
    pub public_base_url: String,
    pub signing_secret: String,
}

/// Reverse geocoding settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub user_agent: String,
    pub referer: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: format!("media-sync/{}", env!("CARGO_PKG_VERSION")),
            referer: String::new(),
        }
    }
}

/// Top-level service configuration.
#[derive(Clone)]
pub struct AppConfig {
    pub drive: DriveConfig,
    pub cache: CacheConfig,
    pub database_url: String,
    pub storage: StorageConfig,
    pub geocoder: GeocoderConfig,
    pub log_format: LogFormat,
    pub log_level: LogLevel,
    pub tuning: SyncTuning,
}

impl std::fmt::Debug for DriveConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveConfig")
            .field("api_key", &redact_if_sensitive("api_key", &self.api_key))
            .field("folder_id", &self.folder_id)
            .field("sync_interval", &self.sync_interval)
            .field("backfill_on_startup", &self.backfill_on_startup)
            .finish()
    }
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("root", &self.root)
            .field("public_base_url", &self.public_base_url)
            .field(
                "signing_secret",
                &redact_if_sensitive("signing_secret", &self.signing_secret),
            )
            .finish()
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("drive", &self.drive)
            .field("cache", &self.cache)
            .field("database_url", &self.database_url)
            .field("storage", &self.storage)
            .field("geocoder", &self.geocoder)
            .field("log_format", &self.log_format)
            .field("log_level", &self.log_level)
            .field("tuning", &self.tuning)
            .finish()
    }
}

impl AppConfig {
    /// Creates a new builder for constructing an `AppConfig`.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut builder = Self::builder();

        if let Some(v) = get("GOOGLE_API_KEY") {
            builder = builder.api_key(v);
        }
        if let Some(v) = get("GOOGLE_DRIVE_FOLDER_ID") {
            builder = builder.folder_id(v);
        }
        if let Some(v) = get("DRIVE_SYNC_INTERVAL") {
            builder = builder.sync_interval(parse_duration(&v)?);
        }
        if let Some(v) = get("DRIVE_BACKFILL_ON_STARTUP") {
            builder = builder.backfill_on_startup(parse_bool(&v)?);
        }
        if let Some(v) = get("CACHE_TTL") {
            builder = builder.cache_ttl(parse_duration(&v)?);
        }
        if let Some(v) = get("CACHE_CLEANUP_INTERVAL") {
            builder = builder.cache_cleanup_interval(parse_duration(&v)?);
        }
        if let Some(v) = get("DATABASE_URL") {
            builder = builder.database_url(v);
        }
        if let Some(v) = get("STORAGE_ROOT") {
            builder = builder.storage_root(v);
        }
        if let Some(v) = get("STORAGE_PUBLIC_URL") {
            builder = builder.public_base_url(v);
        }
        if let Some(v) = get("STORAGE_SIGNING_SECRET") {
            builder = builder.signing_secret(v);
        }
        if let Some(v) = get("GEOCODER_BASE_URL") {
            builder = builder.geocoder_base_url(v);
        }
        if let Some(v) = get("GEOCODER_USER_AGENT") {
            builder = builder.geocoder_user_agent(v);
        }
        if let Some(v) = get("GEOCODER_REFERER") {
            builder = builder.geocoder_referer(v);
        }
        if let Some(v) = get("LOG_FORMAT") {
            builder = builder.log_format(v.parse()?);
        }
        if let Some(v) = get("LOG_LEVEL") {
            builder = builder.log_level(v.parse()?);
        }

        builder.build()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.drive.api_key.trim().is_empty() {
            return Err(Error::Config(
                "GOOGLE_API_KEY is required for Drive access".to_string(),
            ));
        }

        if self.drive.sync_interval.is_zero() {
            return Err(Error::Config(
                "Drive sync interval must be greater than 0".to_string(),
            ));
        }

        if self.cache.ttl.is_zero() || self.cache.cleanup_interval.is_zero() {
            return Err(Error::Config(
                "Cache TTL and cleanup interval must be greater than 0".to_string(),
            ));
        }

        if self.storage.signing_secret.is_empty() {
            return Err(Error::Config(
                "STORAGE_SIGNING_SECRET is required to issue signed URLs".to_string(),
            ));
        }

        if !self.geocoder.base_url.starts_with("http://")
            && !self.geocoder.base_url.starts_with("https://")
        {
            return Err(Error::Config(format!(
                "Geocoder base URL must be http(s): {}",
                self.geocoder.base_url
            )));
        }

        if self.geocoder.user_agent.trim().is_empty() {
            return Err(Error::Config(
                "Geocoder user agent cannot be empty".to_string(),
            ));
        }

        self.tuning.validate()
    }

    /// Whether a Drive folder is configured for background sync.
    pub fn sync_enabled(&self) -> bool {
        self.drive.folder_id.is_some()
    }
}

/// Builder for [`AppConfig`].
#[derive(Default)]
pub struct AppConfigBuilder {
    api_key: Option<String>,
    folder_id: Option<String>,
    sync_interval: Option<Duration>,
    backfill_on_startup: bool,
    cache: CacheConfig,
    database_url: Option<String>,
    storage_root: Option<PathBuf>,
    public_base_url: Option<String>,
    signing_secret: Option<String>,
    geocoder: GeocoderConfig,
    log_format: Option<LogFormat>,
    log_level: Option<LogLevel>,
    tuning: SyncTuning,
}

impl AppConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn folder_id(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }

    pub fn sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = Some(interval);
        self
    }

    pub fn backfill_on_startup(mut self, enabled: bool) -> Self {
        self.backfill_on_startup = enabled;
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache.ttl = ttl;
        self
    }

    pub fn cache_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cache.cleanup_interval = interval;
        self
    }

    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage_root = Some(root.into());
        self
    }

    pub fn public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = Some(url.into());
        self
    }

    pub fn signing_secret(mut self, secret: impl Into<String>) -> Self {
        self.signing_secret = Some(secret.into());
        self
    }

    pub fn geocoder_base_url(mut self, url: impl Into<String>) -> Self {
        self.geocoder.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn geocoder_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.geocoder.user_agent = user_agent.into();
        self
    }

    pub fn geocoder_referer(mut self, referer: impl Into<String>) -> Self {
        self.geocoder.referer = referer.into();
        self
    }

    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.log_format = Some(format);
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    pub fn tuning(mut self, tuning: SyncTuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Builds the final `AppConfig`, failing fast on missing credentials or
    /// inconsistent values.
    pub fn build(self) -> Result<AppConfig> {
        let api_key = self.api_key.ok_or_else(|| {
            Error::Config("GOOGLE_API_KEY is required. Use .api_key() to set it.".to_string())
        })?;

        let signing_secret = self.signing_secret.ok_or_else(|| {
            Error::Config(
                "STORAGE_SIGNING_SECRET is required. Use .signing_secret() to set it.".to_string(),
            )
        })?;

        let config = AppConfig {
            drive: DriveConfig {
                api_key,
                folder_id: self.folder_id,
                sync_interval: self
                    .sync_interval
                    .unwrap_or_else(|| Duration::from_secs(5 * 60)),
                backfill_on_startup: self.backfill_on_startup,
            },
            cache: self.cache,
            database_url: self
                .database_url
                .unwrap_or_else(|| "sqlite://media.db".to_string()),
            storage: StorageConfig {
                root: self.storage_root.unwrap_or_else(|| PathBuf::from("./storage")),
                public_base_url: self
                    .public_base_url
                    .unwrap_or_else(|| "http://localhost:8080/files".to_string()),
                signing_secret,
            },
            geocoder: self.geocoder,
            log_format: self.log_format.unwrap_or_default(),
            log_level: self.log_level.unwrap_or(LogLevel::Info),
            tuning: self.tuning,
        };

        config.validate()?;

        Ok(config)
    }
}

/// Parse a duration such as `90s`, `5m`, `1h30m` or `250ms`.
///
/// A bare integer is read as minutes.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::Config("Duration cannot be empty".to_string()));
    }

    if let Ok(minutes) = input.parse::<u64>() {
        return Ok(Duration::from_secs(minutes * 60));
    }

    let invalid = || Error::Config(format!("Invalid duration: {}", input));
    let mut total = Duration::ZERO;
    let mut rest = input;

    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        if digits_end == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..digits_end].parse().map_err(|_| invalid())?;
        rest = &rest[digits_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let seconds_per_unit = match &rest[..unit_end] {
            "h" => 3600.0,
            "m" => 60.0,
            "s" => 1.0,
            "ms" => 0.001,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_end..];

        total += Duration::from_secs_f64(value * seconds_per_unit);
    }

    Ok(total)
}

fn parse_bool(input: &str) -> Result<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!("Invalid boolean: {}", other))),
    }
}
