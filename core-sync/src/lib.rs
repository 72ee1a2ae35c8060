//! # Sync Module
//!
//! Keeps the media library convergent with a remote folder.
//!
//! ## Overview
//!
//! This module manages:
//! - One-shot backfill and interval-driven watch passes over a remote folder
//! - Per-file lookup, download, HEIC normalization, upload and persistence
//! - Multi-source metadata resolution (record, stored bytes, provider)
//! - Backing off when the provider keeps rate limiting
//!
//! ## Components
//!
//! - **Sync Orchestrator** (`orchestrator`): backfill, watch and refresh passes
//! - **Metadata Resolver** (`resolver`): priority-ordered fallback chain
//! - **Circuit Breaker** (`circuit_breaker`): cooldown after repeated rate limits

pub mod circuit_breaker;
pub mod error;
pub mod orchestrator;
pub mod resolver;

pub use circuit_breaker::CircuitBreaker;
pub use error::{Result, SyncError};
pub use orchestrator::{
    FileOutcome, RefreshReport, SyncOptions, SyncOrchestrator, SyncReport, WatchTick,
};
pub use resolver::{MetadataResolver, MetadataSource, ResolvedMetadata};
