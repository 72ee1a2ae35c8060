//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the media sync service:
//! - Logging and tracing infrastructure
//! - Configuration loading, validation and sync tuning constants
//!
//! Every other workspace crate takes its knobs from [`config::SyncTuning`]
//! and expects [`logging::init_logging`] to have been called by the binary.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{AppConfig, SyncTuning};
pub use error::{Error, Result};
