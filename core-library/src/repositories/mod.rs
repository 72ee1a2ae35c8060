//! # Repository Pattern Implementation
//!
//! Repository traits and their SQLite implementations.
//!
//! - Traits define the interface consumed by the sync and service crates
//! - SQLite implementations use sqlx for async database access
//! - Pagination is supported via the `Page<T>` wrapper
//!
//! ## Available Repositories
//!
//! - `MediaRepository` - Synced media files with location and capture metadata

pub mod media;
pub mod pagination;

pub use media::{MediaRepository, SqliteMediaRepository, MAX_PAGE_SIZE};
pub use pagination::{Page, PageRequest};
