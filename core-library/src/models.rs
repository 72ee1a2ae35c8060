//! Domain models for the media library
//!
//! [`MediaRecord`] is the durable row for one synced file. The extraction side
//! of the pipeline produces [`ExtractedMetadata`], which is folded into a record
//! with [`MediaRecord::merge`].

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Latitude/longitude pair kept as decimal strings, exactly as stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: String,
    pub lng: String,
}

impl Coordinates {
    pub fn new(lat: impl Into<String>, lng: impl Into<String>) -> Self {
        Self {
            lat: lat.into(),
            lng: lng.into(),
        }
    }

    /// Build from degrees, formatted with six decimals.
    pub fn from_degrees(lat: f64, lng: f64) -> Self {
        Self {
            lat: format!("{:.6}", lat),
            lng: format!("{:.6}", lng),
        }
    }

    /// A fix is present when both parts are non-empty and not both zero.
    ///
    /// Zero/zero is what several cameras and the Drive API report for "no fix".
    pub fn is_present(&self) -> bool {
        let lat = self.lat.trim();
        let lng = self.lng.trim();
        if lat.is_empty() || lng.is_empty() {
            return false;
        }

        match (lat.parse::<f64>(), lng.parse::<f64>()) {
            (Ok(a), Ok(b)) => !(a == 0.0 && b == 0.0),
            _ => !(lat == "0" && lng == "0"),
        }
    }

    /// Parse both parts as degrees.
    pub fn to_degrees(&self) -> Option<(f64, f64)> {
        let lat = self.lat.trim().parse::<f64>().ok()?;
        let lng = self.lng.trim().parse::<f64>().ok()?;
        Some((lat, lng))
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

/// Pixel dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Metadata gathered from one source (file bytes, exiftool, provider listing).
///
/// Every field is optional; [`MediaRecord::merge`] only applies what is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    pub coordinates: Option<Coordinates>,
    /// Resolved place name
    pub geo_location: Option<String>,
    /// Raw capture timestamp (RFC 3339 once normalized)
    pub taken_at: Option<String>,
    /// Display form of `taken_at`
    pub formatted_date: Option<String>,
    pub resolution: Option<Resolution>,
}

impl ExtractedMetadata {
    pub fn has_location(&self) -> bool {
        self.coordinates
            .as_ref()
            .map(Coordinates::is_present)
            .unwrap_or(false)
    }

    pub fn has_time(&self) -> bool {
        self.taken_at
            .as_deref()
            .map(|t| !t.trim().is_empty())
            .unwrap_or(false)
    }
}

/// One media file's durable state
///
/// Coordinates are stored as two string columns; empty strings mean "unknown".
/// Timestamps are Unix seconds, like every other table in this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MediaRecord {
    /// Store-assigned identifier (UUID string)
    pub id: String,
    pub file_name: String,
    pub content_type: String,
    /// Key of the object in the object store
    pub storage_path: String,
    /// Name in the remote folder; differs from `file_name` after HEIC
    /// conversion. Empty for records synced before it was tracked.
    pub source_name: String,
    pub latitude: String,
    pub longitude: String,
    /// Resolved place name, e.g. "London, United Kingdom"
    pub geo_location: String,
    /// Human-readable capture date
    pub formatted_date: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    /// Capture timestamp as RFC 3339
    pub taken_at: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl MediaRecord {
    /// Minimal record for a file seen for the first time.
    ///
    /// The id is left empty; the repository assigns one on `create`.
    pub fn new_for_file(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        storage_path: impl Into<String>,
    ) -> Self {
        let now = Utc::now().timestamp();
        Self {
            id: String::new(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            storage_path: storage_path.into(),
            source_name: String::new(),
            latitude: String::new(),
            longitude: String::new(),
            geo_location: String::new(),
            formatted_date: String::new(),
            width: None,
            height: None,
            taken_at: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Name to look the file up by in the remote folder.
    pub fn remote_name(&self) -> &str {
        match self.source_name.trim() {
            "" => &self.file_name,
            name => name,
        }
    }

    /// Coordinates, if a real fix is stored.
    pub fn coordinates(&self) -> Option<Coordinates> {
        let coords = Coordinates::new(self.latitude.clone(), self.longitude.clone());
        coords.is_present().then_some(coords)
    }

    pub fn set_coordinates(&mut self, coordinates: &Coordinates) {
        self.latitude = coordinates.lat.clone();
        self.longitude = coordinates.lng.clone();
    }

    pub fn resolution(&self) -> Option<Resolution> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => {
                Some(Resolution::new(u32::try_from(w).ok()?, u32::try_from(h).ok()?))
            }
            _ => None,
        }
    }

    pub fn is_video(&self) -> bool {
        self.content_type.to_ascii_lowercase().starts_with("video/")
    }

    /// Fully processed: coordinates, place name and formatted date are all set.
    ///
    /// Files without any GPS source never become complete; callers count them
    /// instead of retrying.
    pub fn is_complete(&self) -> bool {
        self.coordinates().is_some()
            && !self.geo_location.trim().is_empty()
            && !self.formatted_date.trim().is_empty()
    }

    /// Apply every non-empty field of `extracted` and bump `updated_at`.
    pub fn merge(&mut self, extracted: &ExtractedMetadata) {
        if let Some(coords) = extracted.coordinates.as_ref().filter(|c| c.is_present()) {
            self.set_coordinates(coords);
        }
        if let Some(place) = non_empty(&extracted.geo_location) {
            self.geo_location = place.to_string();
        }
        if let Some(taken_at) = non_empty(&extracted.taken_at) {
            self.taken_at = taken_at.to_string();
        }
        if let Some(formatted) = non_empty(&extracted.formatted_date) {
            self.formatted_date = formatted.to_string();
        }
        if let Some(resolution) = extracted.resolution {
            if resolution.width > 0 && resolution.height > 0 {
                self.width = Some(resolution.width as i64);
                self.height = Some(resolution.height as i64);
            }
        }
        self.updated_at = Utc::now().timestamp();
    }

    /// Fresh UUID for a new record.
    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
