//! # Media Library
//!
//! Durable metadata store for synced media: the [`models::MediaRecord`] model,
//! the SQLite connection pool with embedded migrations, and the
//! [`repositories::MediaRepository`] contract the sync engine writes through.

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use error::{LibraryError, Result};
