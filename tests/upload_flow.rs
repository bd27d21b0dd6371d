use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use memoriesServer::error::ApiError;
use memoriesServer::models::place::Coords;
use memoriesServer::service::places_service::PlacesStore;
use memoriesServer::service::storage_service::{ObjectStore, StorageError};
use memoriesServer::service::upload_service::{UploadOptions, UploadService, UploadedImage};

#[derive(Default)]
struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    fail_puts: bool,
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
        _public: bool,
    ) -> Result<(), StorageError> {
        if self.fail_puts {
            return Err(StorageError::Remote("injected store failure".to_string()));
        }
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.objects.lock().unwrap().get(key).cloned())
    }

    fn object_url(&self, key: &str) -> String {
        format!("https://storage.test/photos/{}", key)
    }
}

fn image(content_type: &str) -> UploadedImage {
    UploadedImage {
        bytes: vec![0xFF, 0xD8, 0xFF, 0xD9],
        content_type: content_type.to_string(),
        filename: "walk.jpg".to_string(),
    }
}

fn places(memory: Arc<MemoryStore>) -> (tempfile::TempDir, PlacesStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = PlacesStore::new(dir.path().join("places.json"), memory);
    (dir, store)
}

#[tokio::test]
async fn upload_appends_exactly_one_record_with_returned_url() {
    let memory = Arc::new(MemoryStore::default());
    let (_dir, mut store) = places(memory.clone());
    let before = store.count();

    let options = UploadOptions {
        gps: Some(Coords { latitude: 55.75, longitude: 37.62 }),
        place_title: Some("Gorky Park".to_string()),
        caption: None,
        capture_date: None,
    };
    let url = UploadService::store_photo(memory.as_ref(), &mut store, image("image/jpeg"), options)
        .await
        .unwrap();

    assert_eq!(store.count(), before + 1);
    let record = store.records().last().unwrap();
    assert_eq!(record.orig_url, url);
    assert_eq!(record.thumb_url, url);
    assert_eq!(record.place_title, "Gorky Park");
    assert!(record.coords.is_some());
    assert!(url.contains("/memories/"));
    assert!(record.filename.ends_with("_walk.jpg"));
}

#[tokio::test]
async fn empty_payload_is_rejected() {
    let memory = Arc::new(MemoryStore::default());
    let (_dir, mut store) = places(memory.clone());
    let mut empty = image("image/jpeg");
    empty.bytes = Vec::new();

    let err = UploadService::store_photo(memory.as_ref(), &mut store, empty, UploadOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::BadRequest(_)));
    assert_eq!(store.count(), 0);
    assert!(memory.objects.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unsupported_content_type_is_rejected_before_any_write() {
    let memory = Arc::new(MemoryStore::default());
    let (_dir, mut store) = places(memory.clone());

    let err = UploadService::store_photo(
        memory.as_ref(),
        &mut store,
        image("application/pdf"),
        UploadOptions::default(),
    )
    .await
    .unwrap_err();

    match err {
        ApiError::BadRequest(message) => assert!(message.contains("application/pdf")),
        other => panic!("expected bad request, got {:?}", other),
    }
    assert!(memory.objects.lock().unwrap().is_empty());
    assert_eq!(store.count(), 0);
}

#[tokio::test]
async fn client_supplied_capture_date_wins_over_derivation() {
    let memory = Arc::new(MemoryStore::default());
    let (_dir, mut store) = places(memory.clone());

    let options = UploadOptions {
        capture_date: Some("14.02.24".to_string()),
        ..UploadOptions::default()
    };
    UploadService::store_photo(memory.as_ref(), &mut store, image("image/jpeg"), options)
        .await
        .unwrap();

    assert_eq!(store.records()[0].exif_date.as_deref(), Some("14.02.24"));
}

#[tokio::test]
async fn capture_date_falls_back_to_today_without_exif() {
    let memory = Arc::new(MemoryStore::default());
    let (_dir, mut store) = places(memory.clone());

    UploadService::store_photo(
        memory.as_ref(),
        &mut store,
        image("image/jpeg"),
        UploadOptions::default(),
    )
    .await
    .unwrap();

    let date = store.records()[0].exif_date.clone().unwrap();
    assert_eq!(date.len(), 8);
    assert_eq!(date.matches('.').count(), 2);
}

#[tokio::test]
async fn heic_uploads_are_stored_unconverted() {
    let memory = Arc::new(MemoryStore::default());
    let (_dir, mut store) = places(memory.clone());
    let mut heic = image("image/heic");
    heic.bytes = vec![0x00, 0x00, 0x00, 0x18, 0x66, 0x74, 0x79, 0x70];
    heic.filename = "moment.heic".to_string();
    let original = heic.bytes.clone();

    UploadService::store_photo(memory.as_ref(), &mut store, heic, UploadOptions::default())
        .await
        .unwrap();

    let objects = memory.objects.lock().unwrap();
    let stored = objects
        .iter()
        .find(|(key, _)| key.starts_with("memories/"))
        .map(|(_, bytes)| bytes.clone())
        .unwrap();
    assert_eq!(stored, original);
}

#[tokio::test]
async fn storage_failure_surfaces_as_upstream_and_appends_nothing() {
    let memory = Arc::new(MemoryStore {
        fail_puts: true,
        ..MemoryStore::default()
    });
    let (_dir, mut store) = places(memory.clone());

    let err = UploadService::store_photo(
        memory.as_ref(),
        &mut store,
        image("image/jpeg"),
        UploadOptions::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ApiError::Upstream(_)));
    assert_eq!(store.count(), 0);
}
