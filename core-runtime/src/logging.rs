//! # Logging
//!
//! `tracing` subscriber setup for the service and the CLI.
//!
//! Workspace crates log at the configured [`LogLevel`]; HTTP and database
//! dependencies are held at `warn`. `RUST_LOG` overrides everything.
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//!
//! init_logging(LoggingConfig::default().with_format(LogFormat::Json))?;
//! tracing::info!(folder_id = %folder, "watch started");
//! ```

use crate::error::{Error, Result};

use std::io;
use std::str::FromStr;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{filter::EnvFilter, fmt, Layer, Registry};

const WORKSPACE_TARGETS: &[&str] = &[
    "media_sync",
    "core_runtime",
    "core_sync",
    "core_library",
    "core_metadata",
    "core_service",
    "provider_google_drive",
    "bridge_desktop",
];

const QUIET_TARGETS: &[&str] = &["h2", "hyper", "hyper_util", "reqwest", "sqlx"];

/// Field names whose values never reach the logs.
const SENSITIVE_FIELDS: &[&str] = &["key", "token", "secret", "password", "authorization"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            other => return Err(Error::Config(format!("LOG_LEVEL: unknown level `{other}`"))),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, coloured, for terminals
    Pretty,
    /// One JSON object per event
    Json,
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            "compact" => LogFormat::Compact,
            other => return Err(Error::Config(format!("LOG_FORMAT: unknown format `{other}`"))),
        })
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Full `EnvFilter` directive string, replacing the per-crate defaults
    pub filter: Option<String>,
    /// Emit an event when a span (sync pass, file) closes
    pub span_events: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            span_events: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    fn directives(&self) -> String {
        if let Some(filter) = &self.filter {
            return filter.clone();
        }

        let level = self.level.directive();
        WORKSPACE_TARGETS
            .iter()
            .map(|target| format!("{target}={level}"))
            .chain(QUIET_TARGETS.iter().map(|target| format!("{target}=warn")))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Install the global subscriber.
///
/// # Errors
/// Fails on an invalid filter or when a subscriber is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(from_env) => from_env,
        Err(_) => EnvFilter::try_new(config.directives())
            .map_err(|e| Error::Logging(format!("invalid filter: {e}")))?,
    };

    let spans = if config.span_events {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_span_events(spans)
            .with_writer(io::stdout)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_span_events(spans)
            .with_writer(io::stdout)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_span_events(spans)
            .with_writer(io::stdout)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}

/// `[REDACTED]` for non-empty values of secret-looking fields.
///
/// ```
/// use core_runtime::logging::redact_if_sensitive;
///
/// assert_eq!(redact_if_sensitive("api_key", "AIza123"), "[REDACTED]");
/// assert_eq!(redact_if_sensitive("folder_id", "1AbC"), "1AbC");
/// ```
pub fn redact_if_sensitive(field_name: &str, value: &str) -> String {
    let field = field_name.to_ascii_lowercase();
    if !value.is_empty() && SENSITIVE_FIELDS.iter().any(|s| field.contains(s)) {
        "[REDACTED]".to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        let directives = LoggingConfig::default()
            .with_level(LogLevel::Debug)
            .directives();

        assert!(directives.contains("core_sync=debug"));
        assert!(directives.contains("provider_google_drive=debug"));
        assert!(directives.contains("sqlx=warn"));
        assert!(EnvFilter::try_new(&directives).is_ok());
    }

    #[test]
    fn test_custom_filter_replaces_defaults() {
        let config = LoggingConfig::default().with_filter("core_metadata=trace");
        assert_eq!(config.directives(), "core_metadata=trace");
    }

    #[test]
    fn test_redaction() {
        assert_eq!(redact_if_sensitive("signing_secret", "abc"), "[REDACTED]");
        assert_eq!(redact_if_sensitive("GOOGLE_API_KEY", "abc"), "[REDACTED]");
        assert_eq!(redact_if_sensitive("api_key", ""), "");
        assert_eq!(redact_if_sensitive("folder_id", "1AbC"), "1AbC");
    }

    #[test]
    fn test_parse_level_and_format() {
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!(" warning ".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!(matches!("loud".parse::<LogLevel>(), Err(Error::Config(_))));

        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
