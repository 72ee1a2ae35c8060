//! HEIC/HEIF to JPEG normalization
//!
//! Phones upload HEIC by default, which browsers cannot display. Matching
//! files are decoded, rotated according to their EXIF orientation and
//! re-encoded as JPEG. Decoding needs the `heif` feature (libheif); without it
//! every conversion fails and callers keep the original bytes.
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::normalizer::normalize;
//!
//! let media = normalize("IMG_0001.HEIC", "image/heic", bytes).await;
//! store.upload_file(&media.file_name, media.data, &media.content_type).await?;
//! ```

use bytes::Bytes;
use core_library::repositories::media::converted_file_name;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use std::io::Cursor;
use tracing::{debug, info, warn};

use crate::error::{MetadataError, Result};

/// JPEG quality used for converted images
pub const JPEG_QUALITY: u8 = 90;

/// Output of [`normalize`]
#[derive(Debug, Clone)]
pub struct NormalizedMedia {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
    /// `true` when the bytes were transcoded
    pub converted: bool,
}

/// Whether a MIME type names a HEIC/HEIF image.
pub fn is_convertible(mime_type: &str) -> bool {
    let mime = mime_type.to_ascii_lowercase();
    mime.contains("heic") || mime.contains("heif")
}

/// Transcode HEIC/HEIF bytes to an orientation-corrected JPEG.
///
/// Runs on the blocking pool; decoding a 12MP frame takes long enough to
/// stall the async workers.
pub async fn convert(data: Bytes) -> Result<Bytes> {
    core_async::task::spawn_blocking(move || convert_blocking(&data))
        .await
        .map_err(|e| MetadataError::Conversion(format!("conversion task failed: {}", e)))?
}

fn convert_blocking(data: &[u8]) -> Result<Bytes> {
    let decoded = decode_heif(data)?;
    let orientation = read_orientation(data);
    let oriented = apply_orientation(decoded, orientation);
    encode_jpeg(&oriented, JPEG_QUALITY)
}

/// Convert when the MIME type calls for it; never fails.
///
/// On any conversion error the original name, MIME type and bytes come back
/// unchanged.
pub async fn normalize(file_name: &str, mime_type: &str, data: Bytes) -> NormalizedMedia {
    let original = NormalizedMedia {
        file_name: file_name.to_string(),
        content_type: mime_type.to_string(),
        data: data.clone(),
        converted: false,
    };

    if !is_convertible(mime_type) {
        return original;
    }

    match convert(data).await {
        Ok(jpeg) => {
            let renamed = converted_file_name(file_name);
            info!(from = %file_name, to = %renamed, bytes = jpeg.len(), "Converted HEIC to JPEG");
            NormalizedMedia {
                file_name: renamed,
                content_type: "image/jpeg".to_string(),
                data: jpeg,
                converted: true,
            }
        }
        Err(e) => {
            warn!(file = %file_name, error = %e, "HEIC conversion failed, keeping original");
            original
        }
    }
}

/// EXIF orientation tag (1..=8), or 1 when absent or unreadable.
pub fn read_orientation(data: &[u8]) -> u32 {
    let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(data)) {
        Ok(exif) => exif,
        Err(e) => {
            debug!(error = %e, "No EXIF orientation");
            return 1;
        }
    };

    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .filter(|value| (1..=8).contains(value))
        .unwrap_or(1)
}

/// Apply one of the eight EXIF orientations.
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        // transpose
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        // transverse
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// Encode as baseline JPEG at the given quality.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Bytes> {
    let rgb = img.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality).encode_image(&rgb)?;
    Ok(Bytes::from(out))
}

#[cfg(feature = "heif")]
fn decode_heif(data: &[u8]) -> Result<DynamicImage> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let conversion = |e: libheif_rs::HeifError| MetadataError::Conversion(e.to_string());

    let lib_heif = LibHeif::new();
    let context = HeifContext::read_from_bytes(data).map_err(conversion)?;
    let handle = context.primary_image_handle().map_err(conversion)?;
    let decoded = lib_heif
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .map_err(conversion)?;

    let planes = decoded.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| MetadataError::Conversion("decoded image has no RGB plane".to_string()))?;

    let (width, height) = (plane.width, plane.height);
    let row_len = width as usize * 3;
    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in plane.data.chunks(plane.stride).take(height as usize) {
        pixels.extend_from_slice(&row[..row_len]);
    }

    image::RgbImage::from_raw(width, height, pixels)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| MetadataError::Conversion("decoded buffer size mismatch".to_string()))
}

#[cfg(not(feature = "heif"))]
fn decode_heif(_data: &[u8]) -> Result<DynamicImage> {
    Err(MetadataError::Conversion(
        "HEIF decoding is not enabled in this build".to_string(),
    ))
}
