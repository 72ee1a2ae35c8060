//! # Metadata Resolution Pipeline
//!
//! Completes a [`MediaRecord`]'s location and capture-time fields from the
//! cheapest source that has them:
//!
//! 1. the record itself: fields it already carries are kept unless forced;
//! 2. the stored object's bytes, through the [`MetadataExtractor`];
//! 3. the remote provider's own media metadata, via `find_by_name`.
//!
//! Stages stop as soon as coordinates and a timestamp are both known. The
//! place name is looked up once for whichever coordinates won, and the
//! display date is rendered once for whichever timestamp won.

use bridge_traits::error::ErrorKind;
use bridge_traits::storage::{ObjectStore, RemoteFile, RemoteFileProvider};
use core_library::models::{Coordinates, ExtractedMetadata, MediaRecord, Resolution};
use core_metadata::geocode::Geocoder;
use core_metadata::timefmt;
use core_metadata::MetadataExtractor;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::error::{Result, SyncError};

/// Where the winning coordinates came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataSource {
    /// Already on the record
    Record,
    /// Parsed from the stored object
    Storage,
    /// Reported by the remote provider
    Remote,
}

/// Outcome of [`MetadataResolver::resolve`]
#[derive(Debug, Clone)]
pub struct ResolvedMetadata {
    /// Input record with every found field merged in
    pub record: MediaRecord,
    /// `None` when no stage produced coordinates
    pub location_source: Option<MetadataSource>,
}

impl ResolvedMetadata {
    pub fn has_location(&self) -> bool {
        self.location_source.is_some()
    }
}

/// Stage results collected so far.
#[derive(Default)]
struct Found {
    coordinates: Option<(Coordinates, MetadataSource)>,
    taken_at: Option<String>,
    /// The record already has a display date; no stage needs to find one
    date_on_record: bool,
    resolution: Option<Resolution>,
}

impl Found {
    /// Seed with whatever `record` already knows.
    fn from_record(record: &MediaRecord) -> Self {
        let mut found = Self {
            coordinates: record
                .coordinates()
                .map(|coords| (coords, MetadataSource::Record)),
            date_on_record: !record.formatted_date.trim().is_empty(),
            ..Default::default()
        };
        if !found.date_on_record && !record.taken_at.trim().is_empty() {
            found.taken_at = Some(record.taken_at.clone());
        }
        found
    }

    fn has_date(&self) -> bool {
        self.date_on_record || self.taken_at.is_some()
    }

    fn is_sufficient(&self) -> bool {
        self.coordinates.is_some() && self.has_date()
    }

    fn absorb(&mut self, extracted: ExtractedMetadata, source: MetadataSource) {
        if self.coordinates.is_none() {
            if let Some(coords) = extracted.coordinates.filter(Coordinates::is_present) {
                self.coordinates = Some((coords, source));
            }
        }
        if !self.has_date() {
            self.taken_at = extracted.taken_at.filter(|t| !t.trim().is_empty());
        }
        if self.resolution.is_none() {
            self.resolution = extracted.resolution;
        }
    }
}

pub struct MetadataResolver {
    store: Arc<dyn ObjectStore>,
    remote: Option<(Arc<dyn RemoteFileProvider>, String)>,
    geocoder: Arc<dyn Geocoder>,
    extractor: MetadataExtractor,
}

impl MetadataResolver {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        geocoder: Arc<dyn Geocoder>,
        extractor: MetadataExtractor,
    ) -> Self {
        Self {
            store,
            remote: None,
            geocoder,
            extractor,
        }
    }

    /// Enable the provider fallback stage for files in `folder_id`.
    pub fn with_remote(
        mut self,
        remote: Arc<dyn RemoteFileProvider>,
        folder_id: impl Into<String>,
    ) -> Self {
        self.remote = Some((remote, folder_id.into()));
        self
    }

    /// Run the fallback chain for `record`.
    ///
    /// Without `force`, coordinates, place and date already on the record are
    /// kept and the stages only look for what is missing. With `force` every
    /// field is resolved again. A record with no location anywhere resolves
    /// successfully with `location_source == None`.
    ///
    /// # Errors
    /// Only a rate-limited provider lookup fails the call; every other stage
    /// failure falls through to the next stage.
    #[instrument(skip(self, record), fields(file = %record.file_name, force))]
    pub async fn resolve(&self, record: &MediaRecord, force: bool) -> Result<ResolvedMetadata> {
        let mut found = if force {
            Found::default()
        } else {
            Found::from_record(record)
        };

        if found.is_sufficient() {
            debug!("Using coordinates and date already on the record");
        } else {
            self.from_storage(record, &mut found).await;
            if !found.is_sufficient() {
                self.from_remote(record, &mut found).await?;
            }
        }

        let mut extracted = ExtractedMetadata {
            resolution: found.resolution,
            ..Default::default()
        };

        let location_source = found.coordinates.as_ref().map(|(_, source)| *source);
        if let Some((coords, source)) = found.coordinates {
            let place_known =
                source == MetadataSource::Record && !record.geo_location.trim().is_empty();
            if !place_known {
                match self.geocoder.reverse_geocode(&coords).await {
                    Ok(place) => extracted.geo_location = Some(place),
                    Err(e) => warn!(coordinates = %coords, error = %e, "Reverse geocoding failed"),
                }
            }
            extracted.coordinates = Some(coords);
        }

        if let Some(taken_at) = found.taken_at {
            extracted.formatted_date = Some(timefmt::format_timestamp(&taken_at));
            extracted.taken_at = Some(taken_at);
        }

        let mut resolved = record.clone();
        resolved.merge(&extracted);

        Ok(ResolvedMetadata {
            record: resolved,
            location_source,
        })
    }

    async fn from_storage(&self, record: &MediaRecord, found: &mut Found) {
        if record.storage_path.is_empty() {
            return;
        }

        let data = match self.store.fetch_file(&record.storage_path).await {
            Ok(data) => data,
            Err(e) => {
                debug!(path = %record.storage_path, error = %e, "Stored object unavailable");
                return;
            }
        };

        match self.extractor.extract(&record.content_type, data).await {
            Ok(extracted) => found.absorb(extracted, MetadataSource::Storage),
            Err(e) if e.is_no_location() => debug!("Stored object has no GPS data"),
            Err(e) => debug!(error = %e, "Extraction from stored object failed"),
        }
    }

    async fn from_remote(&self, record: &MediaRecord, found: &mut Found) -> Result<()> {
        let Some((remote, folder_id)) = &self.remote else {
            return Ok(());
        };

        for name in remote_candidates(record) {
            match remote.find_by_name(folder_id, &name).await {
                Ok(file) => {
                    found.absorb(provider_metadata(&file), MetadataSource::Remote);
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::RateLimited => return Err(SyncError::Provider(e)),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(name = %name, "Not in remote folder");
                }
                Err(e) => {
                    debug!(name = %name, error = %e, "Remote metadata lookup failed");
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}

/// Names `record` may have in the remote folder, most likely first.
///
/// Records without a tracked source name may be converted HEIC files, so a
/// `.jpg` name is followed by its HEIC spellings.
pub fn remote_candidates(record: &MediaRecord) -> Vec<String> {
    let mut names = vec![record.remote_name().to_string()];
    if !record.source_name.trim().is_empty() {
        return names;
    }

    if let Some((stem, ext)) = record.file_name.rsplit_once('.') {
        if !stem.is_empty() && ext.eq_ignore_ascii_case("jpg") {
            names.extend(["HEIC", "heic"].iter().map(|ext| format!("{stem}.{ext}")));
        }
    }
    names
}

/// Metadata the remote provider reported for `file`, normalized.
///
/// The timestamp is RFC 3339 and the display date is pre-rendered, so the
/// result can seed a brand-new record directly.
pub fn provider_metadata(file: &RemoteFile) -> ExtractedMetadata {
    let Some(media) = &file.media else {
        return ExtractedMetadata::default();
    };

    let coordinates = media
        .location()
        .map(|(lat, lng)| Coordinates::from_degrees(lat, lng))
        .filter(Coordinates::is_present);
    let taken_at = media.time.as_deref().and_then(timefmt::to_rfc3339);
    let formatted_date = taken_at.as_deref().map(timefmt::format_timestamp);
    let resolution = match (media.width, media.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Some(Resolution::new(w, h)),
        _ => None,
    };

    ExtractedMetadata {
        coordinates,
        geo_location: None,
        taken_at,
        formatted_date,
        resolution,
    }
}
