//! Media repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::MediaRecord;
use crate::repositories::{Page, PageRequest};
use async_trait::async_trait;
use sqlx::{query_as, SqlitePool};

/// Largest page `list_page` will return.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Media repository interface for data access operations
#[async_trait]
pub trait MediaRepository: Send + Sync {
    /// Fetch a record by its ID
    ///
    /// # Errors
    /// `LibraryError::NotFound` when no record has this ID.
    async fn get_by_id(&self, id: &str) -> Result<MediaRecord>;

    /// Fetch a record by file name
    ///
    /// When the exact name is missing and `hint` (an extension or MIME type)
    /// names HEIC/HEIF, the converted `<stem>.jpg` name is tried as well.
    ///
    /// # Errors
    /// `LibraryError::NotFound` when neither name matches.
    async fn get_by_file_name(&self, file_name: &str, hint: Option<&str>) -> Result<MediaRecord>;

    /// List records, newest capture first
    ///
    /// Page sizes above [`MAX_PAGE_SIZE`] are capped.
    async fn list_page(&self, page_request: PageRequest) -> Result<Page<MediaRecord>>;

    /// Insert a new record and return its store-assigned ID
    ///
    /// An empty `record.id` is replaced by a fresh UUID.
    async fn create(&self, record: &MediaRecord) -> Result<String>;

    /// Overwrite the stored record with this ID
    ///
    /// # Errors
    /// `LibraryError::NotFound` when the record does not exist.
    async fn update(&self, id: &str, record: &MediaRecord) -> Result<()>;
}

/// Name a HEIC/HEIF file gets after conversion to JPEG.
pub fn converted_file_name(file_name: &str) -> String {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => format!("{}.jpg", &file_name[..idx]),
        _ => format!("{}.jpg", file_name),
    }
}

fn is_heif_hint(hint: &str) -> bool {
    let hint = hint.to_ascii_lowercase();
    hint.contains("heic") || hint.contains("heif")
}

/// SQLite implementation of MediaRepository
pub struct SqliteMediaRepository {
    pool: SqlitePool,
}

impl SqliteMediaRepository {
    /// Create a new SQLite media repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn find_by_file_name(&self, file_name: &str) -> Result<Option<MediaRecord>> {
        let record = query_as::<_, MediaRecord>(
            "SELECT * FROM media WHERE file_name = ? ORDER BY created_at LIMIT 1",
        )
        .bind(file_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}

#[async_trait]
impl MediaRepository for SqliteMediaRepository {
    async fn get_by_id(&self, id: &str) -> Result<MediaRecord> {
        query_as::<_, MediaRecord>("SELECT * FROM media WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| LibraryError::NotFound {
                entity_type: "Media".to_string(),
                id: id.to_string(),
            })
    }

    async fn get_by_file_name(&self, file_name: &str, hint: Option<&str>) -> Result<MediaRecord> {
        if let Some(record) = self.find_by_file_name(file_name).await? {
            return Ok(record);
        }

        if hint.map(is_heif_hint).unwrap_or(false) {
            let converted = converted_file_name(file_name);
            if let Some(record) = self.find_by_file_name(&converted).await? {
                return Ok(record);
            }
        }

        Err(LibraryError::NotFound {
            entity_type: "Media".to_string(),
            id: file_name.to_string(),
        })
    }

    async fn list_page(&self, page_request: PageRequest) -> Result<Page<MediaRecord>> {
        let page_request = page_request.capped(MAX_PAGE_SIZE);

        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM media")
            .fetch_one(&self.pool)
            .await?;

        let records = query_as::<_, MediaRecord>(
            "SELECT * FROM media ORDER BY taken_at DESC, created_at DESC LIMIT ? OFFSET ?",
        )
        .bind(page_request.limit() as i64)
        .bind(page_request.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(records, total.0 as u64, page_request))
    }

    async fn create(&self, record: &MediaRecord) -> Result<String> {
        if record.file_name.trim().is_empty() {
            return Err(LibraryError::InvalidInput {
                field: "file_name".to_string(),
                message: "file name cannot be empty".to_string(),
            });
        }

        let id = if record.id.is_empty() {
            MediaRecord::generate_id()
        } else {
            record.id.clone()
        };

        sqlx::query(
            r#"
            INSERT INTO media (
                id, file_name, content_type, storage_path, source_name,
                latitude, longitude, geo_location, formatted_date,
                width, height, taken_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&record.file_name)
        .bind(&record.content_type)
        .bind(&record.storage_path)
        .bind(&record.source_name)
        .bind(&record.latitude)
        .bind(&record.longitude)
        .bind(&record.geo_location)
        .bind(&record.formatted_date)
        .bind(record.width)
        .bind(record.height)
        .bind(&record.taken_at)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn update(&self, id: &str, record: &MediaRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE media SET
                file_name = ?, content_type = ?, storage_path = ?, source_name = ?,
                latitude = ?, longitude = ?, geo_location = ?, formatted_date = ?,
                width = ?, height = ?, taken_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&record.file_name)
        .bind(&record.content_type)
        .bind(&record.storage_path)
        .bind(&record.source_name)
        .bind(&record.latitude)
        .bind(&record.longitude)
        .bind(&record.geo_location)
        .bind(&record.formatted_date)
        .bind(record.width)
        .bind(record.height)
        .bind(&record.taken_at)
        .bind(record.updated_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::NotFound {
                entity_type: "Media".to_string(),
                id: id.to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::models::Coordinates;

    fn record(name: &str, taken_at: &str) -> MediaRecord {
        let mut record = MediaRecord::new_for_file(name, "image/jpeg", name);
        record.taken_at = taken_at.to_string();
        record
    }

    #[core_async::test]
    async fn test_create_assigns_id_and_get_by_id() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteMediaRepository::new(pool);

        let id = repo.create(&record("IMG_0001.jpg", "")).await.unwrap();
        assert!(!id.is_empty());

        let found = repo.get_by_id(&id).await.unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.file_name, "IMG_0001.jpg");
        assert!(found.coordinates().is_none());
    }

    #[core_async::test]
    async fn test_missing_record_is_not_found() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteMediaRepository::new(pool);

        let err = repo.get_by_id("missing").await.unwrap_err();
        assert!(err.is_not_found());

        let err = repo
            .get_by_file_name("missing.jpg", None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[core_async::test]
    async fn test_heif_hint_finds_converted_name() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteMediaRepository::new(pool);
        repo.create(&record("IMG_0002.jpg", "")).await.unwrap();

        let found = repo
            .get_by_file_name("IMG_0002.HEIC", Some("image/heic"))
            .await
            .unwrap();
        assert_eq!(found.file_name, "IMG_0002.jpg");

        let err = repo
            .get_by_file_name("IMG_0002.HEIC", Some("image/png"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[core_async::test]
    async fn test_update_persists_fields() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteMediaRepository::new(pool);
        let id = repo.create(&record("IMG_0003.jpg", "")).await.unwrap();

        let mut stored = repo.get_by_id(&id).await.unwrap();
        stored.set_coordinates(&Coordinates::new("51.507350", "-0.127758"));
        stored.geo_location = "London, United Kingdom".to_string();
        stored.formatted_date = "Wednesday, 15 January 2025, 14:30".to_string();
        stored.width = Some(4032);
        stored.height = Some(3024);
        stored.source_name = "IMG_0003.HEIC".to_string();
        repo.update(&id, &stored).await.unwrap();

        let reloaded = repo.get_by_id(&id).await.unwrap();
        assert!(reloaded.is_complete());
        assert_eq!(reloaded.width, Some(4032));
        assert_eq!(reloaded.remote_name(), "IMG_0003.HEIC");
    }

    #[core_async::test]
    async fn test_update_missing_record_fails() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteMediaRepository::new(pool);

        let err = repo
            .update("nope", &record("x.jpg", ""))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[core_async::test]
    async fn test_list_page_orders_by_capture_time() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteMediaRepository::new(pool);
        repo.create(&record("old.jpg", "2023-05-01T10:00:00Z"))
            .await
            .unwrap();
        repo.create(&record("new.jpg", "2025-01-15T14:30:00Z"))
            .await
            .unwrap();
        repo.create(&record("mid.jpg", "2024-07-20T08:00:00Z"))
            .await
            .unwrap();

        let page = repo.list_page(PageRequest::new(0, 2)).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        let names: Vec<_> = page.items.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, vec!["new.jpg", "mid.jpg"]);

        let page = repo.list_page(PageRequest::new(0, 5000)).await.unwrap();
        assert_eq!(page.page_size, MAX_PAGE_SIZE);
    }

    #[core_async::test]
    async fn test_create_rejects_empty_name() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteMediaRepository::new(pool);
        let err = repo.create(&record("  ", "")).await.unwrap_err();
        assert!(matches!(err, LibraryError::InvalidInput { .. }));
    }

    #[test]
    fn test_converted_file_name() {
        assert_eq!(converted_file_name("IMG_0001.HEIC"), "IMG_0001.jpg");
        assert_eq!(converted_file_name("archive.v2.heif"), "archive.v2.jpg");
        assert_eq!(converted_file_name("noext"), "noext.jpg");
    }
}
