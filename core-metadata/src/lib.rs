//! # Media Metadata Module
//!
//! Turns raw media bytes into the location, capture-time and resolution
//! fields of a [`MediaRecord`](core_library::models::MediaRecord).
//!
//! ## Overview
//!
//! This module handles:
//! - HEIC/HEIF to JPEG conversion with EXIF orientation (`normalizer`)
//! - GPS, capture time and dimensions from images and videos (`extractor`)
//! - Reverse geocoding with a cache and request limiter (`geocode`)
//! - Capture-time parsing and display formatting (`timefmt`)

pub mod error;
pub mod extractor;
pub mod geocode;
pub mod normalizer;
pub mod timefmt;

pub use error::{MetadataError, Result};
pub use extractor::MetadataExtractor;
pub use geocode::{GeocodeResolver, Geocoder};
pub use normalizer::{normalize, NormalizedMedia};
