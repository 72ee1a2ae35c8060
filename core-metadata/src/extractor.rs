//! Location, capture time and resolution extraction
//!
//! Images are parsed in-process: EXIF through `kamadak-exif`, pixel
//! dimensions from the container header through `image`. Videos are handed to
//! an external `exiftool` process over stdin, since no pure-Rust reader covers
//! the QuickTime/MP4 location atoms phones write.
//!
//! Both paths return [`ExtractedMetadata`] with coordinates formatted to six
//! decimals and `taken_at` normalized to RFC 3339. A source without a GPS fix
//! yields [`MetadataError::NoLocationData`] rather than a partial result, so the
//! resolution pipeline can fall through to the next source.
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::extractor::MetadataExtractor;
//!
//! let extractor = MetadataExtractor::new();
//! match extractor.extract("image/jpeg", bytes).await {
//!     Ok(found) => record.merge(&found),
//!     Err(e) if e.is_no_location() => {}
//!     Err(e) => return Err(e.into()),
//! }
//! ```

use bytes::Bytes;
use core_library::models::{Coordinates, ExtractedMetadata, Resolution};
use exif::{Exif, In, Rational, Tag, Value};
use std::io::Cursor;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::error::{MetadataError, Result};
use crate::timefmt;

/// Executable looked up on `PATH` when none is configured
pub const DEFAULT_EXIFTOOL: &str = "exiftool";

const EXIFTOOL_ARGS: &[&str] = &[
    "-n",
    "-GPSLatitude",
    "-GPSLongitude",
    "-CreateDate",
    "-ImageWidth",
    "-ImageHeight",
    "-",
];

#[derive(Debug, Clone)]
pub struct MetadataExtractor {
    exiftool_path: String,
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataExtractor {
    pub fn new() -> Self {
        Self {
            exiftool_path: DEFAULT_EXIFTOOL.to_string(),
        }
    }

    /// Use a specific exiftool binary for the video path.
    pub fn with_exiftool(path: impl Into<String>) -> Self {
        Self {
            exiftool_path: path.into(),
        }
    }

    /// Extract metadata, dispatching on the MIME type.
    ///
    /// `video/*` goes through exiftool; everything else is parsed as an image.
    #[instrument(skip(self, data), fields(size = data.len()))]
    pub async fn extract(&self, content_type: &str, data: Bytes) -> Result<ExtractedMetadata> {
        if content_type.to_ascii_lowercase().starts_with("video/") {
            return self.extract_video(data).await;
        }

        core_async::task::spawn_blocking(move || extract_image(&data))
            .await
            .map_err(|e| MetadataError::Extraction(format!("extraction task failed: {}", e)))?
    }

    async fn extract_video(&self, data: Bytes) -> Result<ExtractedMetadata> {
        let mut child = Command::new(&self.exiftool_path)
            .args(EXIFTOOL_ARGS)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                MetadataError::ToolFailed(format!("failed to run {}: {}", self.exiftool_path, e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            core_async::spawn(async move {
                // exiftool may stop reading once it has what it needs
                if let Err(e) = stdin.write_all(&data).await {
                    debug!(error = %e, "exiftool closed stdin early");
                }
            });
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MetadataError::ToolFailed(format!(
                "exiftool exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        parse_exiftool_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse image bytes. Blocking; call from the blocking pool.
pub fn extract_image(data: &[u8]) -> Result<ExtractedMetadata> {
    let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(data)) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return Err(MetadataError::NoLocationData),
        Err(e) => return Err(MetadataError::Extraction(e.to_string())),
    };

    let latitude = gps_coordinate(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, 'S');
    let longitude = gps_coordinate(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, 'W');

    let coordinates = match (latitude, longitude) {
        (Some(lat), Some(lng)) => Coordinates::from_degrees(lat, lng),
        _ => return Err(MetadataError::NoLocationData),
    };
    if !coordinates.is_present() {
        return Err(MetadataError::NoLocationData);
    }

    let taken_at = [Tag::DateTime, Tag::DateTimeOriginal]
        .into_iter()
        .filter_map(|tag| ascii_field(&exif, tag))
        .find_map(|raw| timefmt::to_rfc3339(&raw));

    Ok(ExtractedMetadata {
        coordinates: Some(coordinates),
        taken_at,
        resolution: header_dimensions(data).or_else(|| exif_dimensions(&exif)),
        ..Default::default()
    })
}

/// Degrees/minutes/seconds to signed decimal degrees.
pub fn dms_to_degrees(dms: &[Rational], hemisphere: Option<char>, negative: char) -> Option<f64> {
    if dms.len() < 3 || dms.iter().any(|r| r.denom == 0) {
        return None;
    }

    let degrees = dms[0].to_f64() + dms[1].to_f64() / 60.0 + dms[2].to_f64() / 3600.0;
    match hemisphere {
        Some(h) if h.eq_ignore_ascii_case(&negative) => Some(-degrees),
        _ => Some(degrees),
    }
}

fn gps_coordinate(exif: &Exif, value_tag: Tag, ref_tag: Tag, negative: char) -> Option<f64> {
    let field = exif.get_field(value_tag, In::PRIMARY)?;
    let hemisphere = ascii_field(exif, ref_tag).and_then(|s| s.chars().next());

    match &field.value {
        Value::Rational(values) => dms_to_degrees(values, hemisphere, negative),
        _ => None,
    }
}

fn ascii_field(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let text = match &field.value {
        Value::Ascii(parts) => parts.first().map(|raw| {
            String::from_utf8_lossy(raw)
                .trim_matches(char::from(0))
                .trim()
                .to_string()
        }),
        _ => None,
    };
    text.filter(|s| !s.is_empty())
}

fn header_dimensions(data: &[u8]) -> Option<Resolution> {
    let reader = image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?;
    match reader.into_dimensions() {
        Ok((width, height)) if width > 0 && height > 0 => Some(Resolution::new(width, height)),
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "Could not read image header dimensions");
            None
        }
    }
}

fn exif_dimensions(exif: &Exif) -> Option<Resolution> {
    let width = exif
        .get_field(Tag::PixelXDimension, In::PRIMARY)?
        .value
        .get_uint(0)?;
    let height = exif
        .get_field(Tag::PixelYDimension, In::PRIMARY)?
        .value
        .get_uint(0)?;
    (width > 0 && height > 0).then(|| Resolution::new(width, height))
}

/// Parse `exiftool -n` output (`Key : Value` per line).
pub fn parse_exiftool_output(output: &str) -> Result<ExtractedMetadata> {
    let mut latitude = None;
    let mut longitude = None;
    let mut create_date = None;
    let mut width = None;
    let mut height = None;

    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "GPS Latitude" => latitude = value.parse::<f64>().ok(),
            "GPS Longitude" => longitude = value.parse::<f64>().ok(),
            "Create Date" => create_date = Some(exif_date_to_iso(value)),
            "Image Width" => width = value.parse::<u32>().ok(),
            "Image Height" => height = value.parse::<u32>().ok(),
            other => debug!(key = other, "Ignoring exiftool field"),
        }
    }

    let coordinates = match (latitude, longitude) {
        (Some(lat), Some(lng)) => Coordinates::from_degrees(lat, lng),
        _ => return Err(MetadataError::NoLocationData),
    };
    if !coordinates.is_present() {
        return Err(MetadataError::NoLocationData);
    }

    let taken_at = create_date.and_then(|raw| {
        let normalized = timefmt::to_rfc3339(&raw);
        if normalized.is_none() {
            warn!(create_date = %raw, "Unparseable video creation date");
        }
        normalized
    });

    let resolution = match (width, height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Some(Resolution::new(w, h)),
        _ => None,
    };

    Ok(ExtractedMetadata {
        coordinates: Some(coordinates),
        taken_at,
        resolution,
        ..Default::default()
    })
}

/// `2025:01:15 14:30:00` to `2025-01-15 14:30:00`; other shapes pass through.
fn exif_date_to_iso(value: &str) -> String {
    let bytes = value.as_bytes();
    if bytes.len() >= 10 && bytes[4] == b':' && bytes[7] == b':' {
        format!("{}-{}-{}", &value[..4], &value[5..7], &value[8..])
    } else {
        value.to_string()
    }
}
