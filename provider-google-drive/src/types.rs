//! Google Drive API response types
//!
//! Data structures for deserializing Google Drive API v3 responses.

use serde::{Deserialize, Serialize};

/// Google Drive API file resource
///
/// See: https://developers.google.com/drive/api/v3/reference/files#resource
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// File ID
    pub id: String,

    /// File name
    pub name: String,

    /// MIME type
    pub mime_type: String,

    /// File size in bytes, as a decimal string (omitted for folders)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    /// Creation time (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,

    /// Modification time (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,

    /// Camera metadata Drive extracted from an image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_media_metadata: Option<ImageMediaMetadata>,

    /// Container metadata Drive extracted from a video
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_media_metadata: Option<VideoMediaMetadata>,
}

/// `imageMediaMetadata` block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMediaMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    /// Capture time in EXIF form (`YYYY:MM:DD HH:MM:SS`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<MediaLocation>,
}

/// `videoMediaMetadata` block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMediaMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    /// Duration as a decimal string of milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_millis: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<MediaLocation>,
}

/// Geographic fix embedded in media metadata
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MediaLocation {
    #[serde(default)]
    pub latitude: Option<f64>,

    #[serde(default)]
    pub longitude: Option<f64>,

    #[serde(default)]
    pub altitude: Option<f64>,
}

/// Google Drive API files.list response
///
/// See: https://developers.google.com/drive/api/v3/reference/files/list
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesListResponse {
    /// List of files
    #[serde(default)]
    pub files: Vec<DriveFile>,

    /// Token for next page
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Error envelope returned with non-2xx statuses
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: u16,

    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_drive_file_with_image_metadata() {
        let json = r#"{
            "id": "abc123",
            "name": "IMG_0001.HEIC",
            "mimeType": "image/heic",
            "size": "2048",
            "createdTime": "2025-01-15T14:30:00.000Z",
            "modifiedTime": "2025-01-15T14:31:00.000Z",
            "imageMediaMetadata": {
                "width": 4032,
                "height": 3024,
                "time": "2025:01:15 14:30:00",
                "location": { "latitude": 51.50735, "longitude": -0.12776, "altitude": 11.0 }
            }
        }"#;

        let file: DriveFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.id, "abc123");
        assert_eq!(file.size, Some("2048".to_string()));
        let image = file.image_media_metadata.unwrap();
        assert_eq!(image.width, Some(4032));
        assert_eq!(image.time.as_deref(), Some("2025:01:15 14:30:00"));
        assert_eq!(image.location.unwrap().latitude, Some(51.50735));
        assert!(file.video_media_metadata.is_none());
    }

    #[test]
    fn test_deserialize_files_list_response() {
        let json = r#"{
            "files": [
                {
                    "id": "file1",
                    "name": "clip.mp4",
                    "mimeType": "video/mp4",
                    "createdTime": "2024-01-01T00:00:00.000Z",
                    "videoMediaMetadata": { "width": 1920, "height": 1080, "durationMillis": "5000" }
                }
            ],
            "nextPageToken": "token123"
        }"#;

        let response: FilesListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.files.len(), 1);
        assert_eq!(response.next_page_token, Some("token123".to_string()));
        assert_eq!(
            response.files[0]
                .video_media_metadata
                .as_ref()
                .and_then(|v| v.duration_millis.as_deref()),
            Some("5000")
        );
    }

    #[test]
    fn test_deserialize_error_envelope() {
        let json = r#"{"error": {"code": 403, "message": "User rate limit exceeded."}}"#;
        let response: ApiErrorResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.error.code, 403);
        assert_eq!(response.error.message, "User rate limit exceeded.");
    }
}
