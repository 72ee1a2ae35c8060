//! MediaService tests against the SQLite library and a temp-dir object store

use async_trait::async_trait;
use bridge_desktop::LocalObjectStore;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::storage::{ObjectStore, RemoteFile, RemoteFileProvider};
use bytes::Bytes;
use core_async::sync::CancellationToken;
use core_async::time::Duration;
use core_library::db::create_test_pool;
use core_library::models::{Coordinates, MediaRecord};
use core_library::repositories::{MediaRepository, PageRequest, SqliteMediaRepository};
use core_metadata::geocode::Geocoder;
use core_metadata::{MetadataExtractor, Result as MetadataResult};
use core_runtime::config::SyncTuning;
use core_service::{MediaPayload, MediaService, ResultCache, ServiceError};
use core_sync::{MetadataResolver, SyncOptions, SyncOrchestrator};
use mockall::mock;
use std::path::PathBuf;
use std::sync::Arc;

mock! {
    Remote {}

    #[async_trait]
    impl RemoteFileProvider for Remote {
        async fn list_folder(&self, folder_id: &str) -> BridgeResult<Vec<RemoteFile>>;
        async fn find_by_name(&self, folder_id: &str, name: &str) -> BridgeResult<RemoteFile>;
        async fn download(&self, file_id: &str) -> BridgeResult<Bytes>;
    }
}

struct NoGeocoder;

#[async_trait]
impl Geocoder for NoGeocoder {
    async fn reverse_geocode(&self, _coordinates: &Coordinates) -> MetadataResult<String> {
        Ok(String::new())
    }
}

struct Fixture {
    service: MediaService,
    repository: Arc<SqliteMediaRepository>,
    store: Arc<LocalObjectStore>,
    root: PathBuf,
}

async fn fixture() -> Fixture {
    let pool = create_test_pool().await.unwrap();
    let repository = Arc::new(SqliteMediaRepository::new(pool));
    let root = std::env::temp_dir().join(format!("media-sync-service-{}", uuid::Uuid::new_v4()));
    let store = Arc::new(LocalObjectStore::new(
        root.clone(),
        "http://localhost:8080/files",
        "secret",
    ));
    let cache = ResultCache::new(Duration::from_secs(60), Duration::from_secs(30));

    let service = MediaService::new(repository.clone(), store.clone(), cache);
    Fixture {
        service,
        repository,
        store,
        root,
    }
}

async fn seed(fx: &Fixture, name: &str, content_type: &str, data: &'static [u8]) {
    let mut record = MediaRecord::new_for_file(name, content_type, name);
    record.geo_location = "London, United Kingdom".to_string();
    fx.repository.create(&record).await.unwrap();
    fx.store
        .upload_file(name, Bytes::from_static(data), content_type)
        .await
        .unwrap();
}

fn with_watching_sync(fx: Fixture, remote: MockRemote) -> Fixture {
    let remote = Arc::new(remote);
    let resolver = MetadataResolver::new(
        fx.store.clone(),
        Arc::new(NoGeocoder),
        MetadataExtractor::new(),
    )
    .with_remote(remote.clone(), "folder-1");
    let orchestrator = SyncOrchestrator::new(
        remote,
        fx.store.clone(),
        fx.repository.clone(),
        Arc::new(resolver),
        SyncTuning::default(),
    )
    .with_folder("folder-1");

    Fixture {
        service: fx.service.with_sync(Arc::new(orchestrator), true),
        ..fx
    }
}

#[core_async::test]
async fn test_get_media_signs_and_caches() {
    let fx = fixture().await;
    seed(&fx, "IMG_0001.jpg", "image/jpeg", b"jpeg").await;

    let first = fx.service.get_media("IMG_0001.jpg").await.unwrap();
    match &first.payload {
        MediaPayload::SignedUrl(url) => {
            assert!(url.starts_with("http://localhost:8080/files/IMG_0001.jpg?expires="))
        }
        other => panic!("unexpected payload: {other:?}"),
    }
    assert_eq!(first.place, "London, United Kingdom");
    assert_eq!(first.content_type, "image/jpeg");

    let second = fx.service.get_media("IMG_0001.jpg").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(fx.service.cache().len().await, 1);

    let _ = std::fs::remove_dir_all(&fx.root);
}

#[core_async::test]
async fn test_get_media_matches_converted_name() {
    let fx = fixture().await;
    seed(&fx, "IMG_0002.jpg", "image/jpeg", b"jpeg").await;

    let media = fx.service.get_media("IMG_0002.HEIC").await.unwrap();
    assert_eq!(media.file_name, "IMG_0002.jpg");

    let _ = std::fs::remove_dir_all(&fx.root);
}

#[core_async::test]
async fn test_get_media_unknown_file() {
    let fx = fixture().await;

    let err = fx.service.get_media("missing.jpg").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(fx.service.cache().is_empty().await);
}

#[core_async::test]
async fn test_fetch_media_serves_stored_bytes() {
    let fx = fixture().await;
    seed(&fx, "IMG_0003.jpg", "image/jpeg", b"jpeg-bytes").await;

    let media = fx.service.fetch_media("IMG_0003.jpg").await.unwrap();
    assert_eq!(media.payload, MediaPayload::Bytes(Bytes::from_static(b"jpeg-bytes")));
    assert_eq!(media.content_type, "image/jpeg");

    let _ = std::fs::remove_dir_all(&fx.root);
}

#[core_async::test]
async fn test_list_media_pages() {
    let fx = fixture().await;
    for i in 0..3 {
        let name = format!("IMG_{i:04}.jpg");
        let record = MediaRecord::new_for_file(name.clone(), "image/jpeg", name);
        fx.repository.create(&record).await.unwrap();
    }

    let page = fx.service.list_media(PageRequest::new(0, 2)).await.unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total, 3);
    assert!(page.has_next());
}

#[core_async::test]
async fn test_sync_requires_orchestrator() {
    let fx = fixture().await;
    let cancel = CancellationToken::new();

    let err = fx
        .service
        .backfill(&SyncOptions::default(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::SyncNotConfigured(_)));
    assert!(fx
        .service
        .start_background_sync(Duration::from_secs(60), false)
        .is_err());
}

#[core_async::test]
async fn test_background_sync_shuts_down() {
    let mut remote = MockRemote::new();
    remote.expect_list_folder().returning(|_| Ok(Vec::new()));
    let fx = with_watching_sync(fixture().await, remote);

    let handle = fx
        .service
        .start_background_sync(Duration::from_millis(20), true)
        .unwrap();
    core_async::time::sleep(Duration::from_millis(70)).await;
    assert!(!handle.is_finished());

    handle.shutdown().await;
    fx.service.shutdown();
}
