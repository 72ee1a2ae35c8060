//! Google Drive API connector implementation
//!
//! Implements [`RemoteFileProvider`] for Google Drive API v3 with API-key
//! access to a shared folder.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::storage::{ProviderMediaMetadata, RemoteFile, RemoteFileProvider};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use core_async::time::{sleep, Duration};
use core_runtime::config::SyncTuning;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::GoogleDriveError;
use crate::pacing::RequestPacer;
use crate::types::{ApiErrorResponse, DriveFile, FilesListResponse};

/// Google Drive API base URL
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Maximum results per page (Google Drive API limit)
const LIST_PAGE_SIZE: u32 = 1000;

/// Fields to request for file resources
const FILE_FIELDS: &str =
    "id,name,mimeType,size,createdTime,modifiedTime,imageMediaMetadata,videoMediaMetadata";

/// Per-request timeout for metadata calls. Downloads are bounded by the caller.
const METADATA_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Escape a value for use inside a single-quoted Drive query literal.
pub fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Google Drive API connector
///
/// Every request first waits on the shared [`RequestPacer`]. Responses with
/// status 403 or 429 are retried with exponential backoff
/// (`backoff_base * 2^attempt`); once the retry budget is spent they surface
/// as [`bridge_traits::error::BridgeError::RateLimited`]. Other failures are
/// not retried.
///
/// # Example
///
/// ```ignore
/// use provider_google_drive::GoogleDriveConnector;
/// use bridge_traits::storage::RemoteFileProvider;
///
/// let connector = GoogleDriveConnector::new(http_client, api_key, &SyncTuning::default());
/// let files = connector.list_folder("1AbCdEf").await?;
/// ```
pub struct GoogleDriveConnector {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
    base_url: String,
    pacer: RequestPacer,
    backoff_base: Duration,
    list_max_retries: u32,
    find_max_retries: u32,
    download_max_retries: u32,
}

impl GoogleDriveConnector {
    /// Create a new Google Drive connector
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `api_key` - API key with read access to the synced folder
    /// * `tuning` - pacing delay, backoff base and retry bounds
    pub fn new(http_client: Arc<dyn HttpClient>, api_key: impl Into<String>, tuning: &SyncTuning) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
            base_url: DRIVE_API_BASE.to_string(),
            pacer: RequestPacer::new(tuning.pacing_delay),
            backoff_base: tuning.backoff_base,
            list_max_retries: tuning.list_max_retries,
            find_max_retries: tuning.find_max_retries,
            download_max_retries: tuning.download_max_retries,
        }
    }

    fn with_key(&self, url: &str) -> String {
        format!("{}&key={}", url, urlencoding::encode(&self.api_key))
    }

    fn parse_timestamp(rfc3339: Option<&str>) -> Option<DateTime<Utc>> {
        rfc3339
            .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Convert DriveFile to RemoteFile
    ///
    /// Image metadata wins; video metadata fills whatever the image block
    /// does not carry.
    fn convert_file(drive_file: DriveFile) -> RemoteFile {
        let image = drive_file.image_media_metadata.unwrap_or_default();
        let video = drive_file.video_media_metadata.unwrap_or_default();
        let location = image.location.or(video.location).unwrap_or_default();

        let media = ProviderMediaMetadata {
            latitude: location.latitude,
            longitude: location.longitude,
            time: image.time.filter(|t| !t.trim().is_empty()),
            width: image.width.or(video.width),
            height: image.height.or(video.height),
        };
        let has_media = media != ProviderMediaMetadata::default();

        RemoteFile {
            id: drive_file.id,
            name: drive_file.name,
            mime_type: drive_file.mime_type,
            size: drive_file.size.and_then(|s| s.parse().ok()),
            created_at: Self::parse_timestamp(drive_file.created_time.as_deref()),
            modified_at: Self::parse_timestamp(drive_file.modified_time.as_deref()),
            media: has_media.then_some(media),
        }
    }

    fn error_message(response: &HttpResponse) -> String {
        serde_json::from_slice::<ApiErrorResponse>(&response.body)
            .map(|envelope| envelope.error.message)
            .unwrap_or_else(|_| String::from_utf8_lossy(&response.body).into_owned())
    }

    /// Execute a paced GET with rate-limit retry
    ///
    /// Makes at most `max_retries + 1` attempts. Only 403 and 429 are retried;
    /// transport errors and other statuses fail immediately.
    #[instrument(skip(self, timeout))]
    async fn execute_with_retry(
        &self,
        url: &str,
        max_retries: u32,
        timeout: Option<Duration>,
    ) -> std::result::Result<HttpResponse, GoogleDriveError> {
        let mut attempt = 0;

        loop {
            self.pacer.wait().await;

            let mut request = HttpRequest::new(HttpMethod::Get, self.with_key(url));
            if let Some(timeout) = timeout {
                request = request.timeout(timeout);
            }

            let response = self.http_client.execute(request).await?;
            let status = response.status;

            if response.is_success() {
                debug!(status, attempt, "Drive request succeeded");
                return Ok(response);
            }

            if !response.is_rate_limited() {
                warn!(status, "Drive request failed");
                return Err(GoogleDriveError::ApiError {
                    status_code: status,
                    message: Self::error_message(&response),
                });
            }

            if attempt >= max_retries {
                warn!(status, attempts = attempt + 1, "Drive rate limit persisted, giving up");
                return Err(GoogleDriveError::RateLimited {
                    status_code: status,
                    attempts: attempt + 1,
                    message: Self::error_message(&response),
                });
            }

            let delay = self.backoff_base * 2u32.pow(attempt);
            warn!(
                status,
                attempt = attempt + 1,
                max_retries,
                delay_secs = delay.as_secs_f64(),
                "Drive rate limited, backing off"
            );
            sleep(delay).await;
            attempt += 1;
        }
    }

    async fn list_page(
        &self,
        query: &str,
        page_size: u32,
        page_token: Option<&str>,
        max_retries: u32,
    ) -> std::result::Result<FilesListResponse, GoogleDriveError> {
        let mut url = format!(
            "{}/files?q={}&pageSize={}&fields={}",
            self.base_url,
            urlencoding::encode(query),
            page_size,
            urlencoding::encode(&format!("nextPageToken,files({})", FILE_FIELDS)),
        );

        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }

        let response = self
            .execute_with_retry(&url, max_retries, Some(METADATA_REQUEST_TIMEOUT))
            .await?;

        serde_json::from_slice(&response.body).map_err(|e| {
            GoogleDriveError::ParseError(format!("Failed to parse files list response: {}", e))
        })
    }
}

#[async_trait]
impl RemoteFileProvider for GoogleDriveConnector {
    #[instrument(skip(self), fields(folder_id = %folder_id))]
    async fn list_folder(&self, folder_id: &str) -> Result<Vec<RemoteFile>> {
        let query = format!("'{}' in parents and trashed=false", escape_query(folder_id));
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .list_page(&query, LIST_PAGE_SIZE, page_token.as_deref(), self.list_max_retries)
                .await?;

            files.extend(page.files.into_iter().map(Self::convert_file));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!(count = files.len(), "Listed Drive folder");
        Ok(files)
    }

    #[instrument(skip(self), fields(folder_id = %folder_id, name = %name))]
    async fn find_by_name(&self, folder_id: &str, name: &str) -> Result<RemoteFile> {
        let query = format!(
            "'{}' in parents and name='{}' and trashed=false",
            escape_query(folder_id),
            escape_query(name)
        );

        let page = self
            .list_page(&query, 1, None, self.find_max_retries)
            .await?;

        let file = page
            .files
            .into_iter()
            .next()
            .ok_or_else(|| GoogleDriveError::FileNotFound {
                name: name.to_string(),
            })?;

        Ok(Self::convert_file(file))
    }

    #[instrument(skip(self), fields(file_id = %file_id))]
    async fn download(&self, file_id: &str) -> Result<Bytes> {
        let url = format!(
            "{}/files/{}?alt=media",
            self.base_url,
            urlencoding::encode(file_id)
        );

        let response = self
            .execute_with_retry(&url, self.download_max_retries, None)
            .await?;

        info!(bytes = response.body.len(), "Downloaded Drive file");
        Ok(response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::ErrorKind;
    use core_async::time::Instant;
    use mockall::mock;
    use std::collections::HashMap;
    use std::sync::Mutex;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn connector(mock: MockHttpClient) -> GoogleDriveConnector {
        GoogleDriveConnector::new(Arc::new(mock), "test-key", &SyncTuning::default())
    }

    fn decoded_query(url: &str) -> String {
        let q = url
            .split(['?', '&'])
            .find_map(|pair| pair.strip_prefix("q="))
            .unwrap();
        urlencoding::decode(q).unwrap().into_owned()
    }

    #[test]
    fn test_escape_query() {
        assert_eq!(escape_query("plain.jpg"), "plain.jpg");
        assert_eq!(escape_query("O'Brien.jpg"), "O\\'Brien.jpg");
        assert_eq!(escape_query("a\\b'c"), "a\\\\b\\'c");
    }

    #[test]
    fn test_convert_file_prefers_image_metadata() {
        let drive_file: DriveFile = serde_json::from_str(
            r#"{
                "id": "file1",
                "name": "IMG_0001.jpg",
                "mimeType": "image/jpeg",
                "size": "1024",
                "createdTime": "2025-01-15T14:30:00.000Z",
                "imageMediaMetadata": {
                    "width": 4032, "height": 3024, "time": "2025:01:15 14:30:00",
                    "location": { "latitude": 51.50735, "longitude": -0.12776 }
                }
            }"#,
        )
        .unwrap();

        let remote = GoogleDriveConnector::convert_file(drive_file);
        assert_eq!(remote.size, Some(1024));
        assert!(remote.created_at.is_some());
        let media = remote.media.unwrap();
        assert_eq!(media.location(), Some((51.50735, -0.12776)));
        assert_eq!(media.time.as_deref(), Some("2025:01:15 14:30:00"));
        assert_eq!(media.width, Some(4032));
    }

    #[test]
    fn test_convert_file_falls_back_to_video_metadata() {
        let drive_file: DriveFile = serde_json::from_str(
            r#"{
                "id": "file2",
                "name": "clip.mp4",
                "mimeType": "video/mp4",
                "videoMediaMetadata": {
                    "width": 1920, "height": 1080,
                    "location": { "latitude": 48.8566, "longitude": 2.3522 }
                }
            }"#,
        )
        .unwrap();

        let remote = GoogleDriveConnector::convert_file(drive_file);
        let media = remote.media.unwrap();
        assert_eq!(media.location(), Some((48.8566, 2.3522)));
        assert_eq!(media.time, None);
        assert_eq!(media.height, Some(1080));
        assert!(remote.created_at.is_none());
    }

    #[test]
    fn test_convert_file_without_media_metadata() {
        let drive_file: DriveFile = serde_json::from_str(
            r#"{"id": "file3", "name": "doc.pdf", "mimeType": "application/pdf"}"#,
        )
        .unwrap();
        assert!(GoogleDriveConnector::convert_file(drive_file).media.is_none());
    }

    #[core_async::test(start_paused)]
    async fn test_list_folder_paginates() {
        let mut mock_http = MockHttpClient::new();
        let mut seq = mockall::Sequence::new();

        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req| {
                assert!(!req.url.contains("pageToken"));
                assert!(req.url.contains("pageSize=1000"));
                assert!(req.url.contains("key=test-key"));
                assert_eq!(
                    decoded_query(&req.url),
                    "'folder-1' in parents and trashed=false"
                );
                Ok(response(
                    200,
                    r#"{"files": [{"id": "a", "name": "a.jpg", "mimeType": "image/jpeg"}],
                        "nextPageToken": "page-2"}"#,
                ))
            });
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req| {
                assert!(req.url.contains("pageToken=page-2"));
                Ok(response(
                    200,
                    r#"{"files": [{"id": "b", "name": "b.jpg", "mimeType": "image/jpeg"}]}"#,
                ))
            });

        let files = connector(mock_http).list_folder("folder-1").await.unwrap();
        let ids: Vec<_> = files.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[core_async::test(start_paused)]
    async fn test_list_folder_aborts_on_other_errors() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(response(500, r#"{"error": {"code": 500, "message": "Backend Error"}}"#)));

        let err = connector(mock_http).list_folder("folder-1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert!(err.to_string().contains("Backend Error"));
    }

    #[core_async::test(start_paused)]
    async fn test_find_by_name_escapes_and_limits() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            assert!(req.url.contains("pageSize=1&"));
            assert_eq!(
                decoded_query(&req.url),
                "'folder-1' in parents and name='O\\'Brien.jpg' and trashed=false"
            );
            Ok(response(
                200,
                r#"{"files": [{"id": "x", "name": "O'Brien.jpg", "mimeType": "image/jpeg"}]}"#,
            ))
        });

        let file = connector(mock_http)
            .find_by_name("folder-1", "O'Brien.jpg")
            .await
            .unwrap();
        assert_eq!(file.id, "x");
    }

    #[core_async::test(start_paused)]
    async fn test_find_by_name_zero_results_is_not_found() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(response(200, r#"{"files": []}"#)));

        let err = connector(mock_http)
            .find_by_name("folder-1", "missing.jpg")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[core_async::test(start_paused)]
    async fn test_find_by_name_retries_then_succeeds() {
        let mut mock_http = MockHttpClient::new();
        let mut seq = mockall::Sequence::new();
        mock_http
            .expect_execute()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(429, "Too Many Requests")));
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(response(
                    200,
                    r#"{"files": [{"id": "x", "name": "a.jpg", "mimeType": "image/jpeg"}]}"#,
                ))
            });

        let start = Instant::now();
        let file = connector(mock_http)
            .find_by_name("folder-1", "a.jpg")
            .await
            .unwrap();
        assert_eq!(file.id, "x");
        // 5s + 10s of backoff
        assert!(start.elapsed() >= Duration::from_secs(15));
    }

    #[core_async::test(start_paused)]
    async fn test_download_backoff_sequence() {
        let calls: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));
        let recorded = calls.clone();

        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(6).returning(move |req| {
            assert!(req.url.contains("alt=media"));
            recorded.lock().unwrap().push(Instant::now());
            Ok(response(403, r#"{"error": {"code": 403, "message": "rateLimitExceeded"}}"#))
        });

        let err = connector(mock_http).download("file-1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimited);

        let calls = calls.lock().unwrap();
        let gaps: Vec<u64> = calls
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).as_secs())
            .collect();
        assert_eq!(gaps, vec![5, 10, 20, 40, 80]);
    }

    #[core_async::test(start_paused)]
    async fn test_download_returns_body() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(response(200, "jpeg-bytes")));

        let data = connector(mock_http).download("file-1").await.unwrap();
        assert_eq!(&data[..], b"jpeg-bytes");
    }

    #[core_async::test(start_paused)]
    async fn test_calls_are_paced() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(2)
            .returning(|_| Ok(response(200, "x")));

        let connector = connector(mock_http);
        let start = Instant::now();
        connector.download("a").await.unwrap();
        connector.download("b").await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(5));
    }
}
