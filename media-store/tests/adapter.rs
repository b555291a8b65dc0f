use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::TryStreamExt;
use media_store::prelude::*;
use media_store::{BlobServiceConnector, ContainerAccess, MemoryBlobService};

/// Connector that always hands out the same in-memory service and counts
/// how many clients were requested
fn memory_connector(
    service: Arc<MemoryBlobService>,
    connects: Arc<AtomicUsize>,
) -> impl BlobServiceConnector {
    move |_account: &str, _key: &str| {
        connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&service) as Arc<dyn BlobService>)
    }
}

fn create_test_store() -> (AzureBlobStore, Arc<MemoryBlobService>, Arc<AtomicUsize>) {
    create_store_with(StorageConfig::new("a", "k", "c"))
}

fn create_store_with(config: StorageConfig) -> (AzureBlobStore, Arc<MemoryBlobService>, Arc<AtomicUsize>) {
    let service = Arc::new(MemoryBlobService::new());
    let connects = Arc::new(AtomicUsize::new(0));
    let store = AzureBlobStore::with_connector(
        config,
        memory_connector(Arc::clone(&service), Arc::clone(&connects)),
    );
    (store, service, connects)
}

fn temp_upload(contents: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents).unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test]
async fn ensure_client_is_memoized() {
    let (store, _service, connects) = create_test_store();

    let first = store.ensure_client().unwrap();
    let second = store.ensure_client().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(connects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrent_first_use_builds_one_client() {
    let (store, _service, connects) = create_test_store();
    let store = Arc::new(store);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.exists("missing.png").await })
        })
        .collect();

    for handle in handles {
        assert!(!handle.await.unwrap().unwrap());
    }
    assert_eq!(connects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_config_fails_every_operation_without_io() {
    for config in [
        StorageConfig::new("", "k", "c"),
        StorageConfig::new("a", "", "c"),
        StorageConfig::new("a", "k", ""),
    ] {
        let (store, service, connects) = create_store_with(config);
        let upload = temp_upload(b"png");
        let file = UploadedFile::new(upload.path(), "x.png");

        assert!(matches!(store.ensure_client(), Err(e) if e.is_configuration()));
        assert!(store.save(&file, Some("2024/01")).await.unwrap_err().is_configuration());
        assert!(store.exists("x.png").await.unwrap_err().is_configuration());
        assert!(store.delete("x.png", None).await.unwrap_err().is_configuration());
        assert!(store.open("x.png").await.unwrap_err().is_configuration());
        assert!(store.check_ready().unwrap_err().is_configuration());

        assert_eq!(service.calls(), 0);
        assert_eq!(connects.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn save_returns_public_url_in_target_dir() {
    let (store, service, _) = create_test_store();
    let upload = temp_upload(b"\x89PNG fake");
    let file = UploadedFile::new(upload.path(), "x.png");

    let url = store.save(&file, Some("2024/01")).await.unwrap();

    assert_eq!(url, "https://a.blob.core.windows.net/c/2024/01/x.png");
    assert_eq!(service.content("c", "2024/01/x.png").unwrap().as_ref(), b"\x89PNG fake");
    assert_eq!(service.container_access("c"), Some(ContainerAccess::Blob));
}

#[tokio::test]
async fn save_then_exists_round_trip() {
    let (store, _, _) = create_test_store();
    let upload = temp_upload(b"hello");
    let file = UploadedFile::new(upload.path(), "note.txt");

    let url = store.save(&file, None).await.unwrap();
    let name = url
        .strip_prefix("https://a.blob.core.windows.net/c/")
        .unwrap();

    assert!(store.exists(name).await.unwrap());
}

#[tokio::test]
async fn save_never_overwrites_existing_blob() {
    let (store, service, _) = create_test_store();
    service.insert("c", "2024/01/x.png", "image/png", "original");
    service.insert("c", "2024/01/x-1.png", "image/png", "second");

    let upload = temp_upload(b"third");
    let file = UploadedFile::new(upload.path(), "x.png");
    let url = store.save(&file, Some("2024/01")).await.unwrap();

    assert_eq!(url, "https://a.blob.core.windows.net/c/2024/01/x-2.png");
    assert_eq!(service.content("c", "2024/01/x.png").unwrap().as_ref(), b"original");
}

#[tokio::test]
async fn concurrent_saves_of_same_name_keep_both_uploads() {
    let (store, service, _) = create_test_store();
    let first_upload = temp_upload(b"first");
    let second_upload = temp_upload(b"second");
    let first = UploadedFile::new(first_upload.path(), "x.png");
    let second = UploadedFile::new(second_upload.path(), "x.png");

    let (first_url, second_url) = tokio::join!(
        store.save(&first, Some("2024/01")),
        store.save(&second, Some("2024/01")),
    );
    let (first_url, second_url) = (first_url.unwrap(), second_url.unwrap());

    assert_ne!(first_url, second_url);

    let prefix = "https://a.blob.core.windows.net/c/";
    let first_name = first_url.strip_prefix(prefix).unwrap();
    let second_name = second_url.strip_prefix(prefix).unwrap();
    assert_eq!(service.content("c", first_name).unwrap().as_ref(), b"first");
    assert_eq!(service.content("c", second_name).unwrap().as_ref(), b"second");

    let mut names = [first_name, second_name];
    names.sort();
    assert_eq!(names, ["2024/01/x-1.png", "2024/01/x.png"]);
}

#[tokio::test]
async fn save_into_existing_container_is_fine() {
    let (store, service, _) = create_test_store();
    service
        .create_container_if_not_exists("c", ContainerAccess::Private)
        .await
        .unwrap();

    let upload = temp_upload(b"data");
    let file = UploadedFile::new(upload.path(), "x.png");
    assert!(store.save(&file, Some("2024/01")).await.is_ok());
}

#[tokio::test]
async fn save_surfaces_remote_failures() {
    let (store, service, _) = create_test_store();
    service.fail("upload_file", 500);

    let upload = temp_upload(b"data");
    let file = UploadedFile::new(upload.path(), "x.png");
    let err = store.save(&file, Some("2024/01")).await.unwrap_err();

    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn save_records_content_type() {
    let (store, _, _) = create_test_store();
    let upload = temp_upload(b"GIF89a");
    let file = UploadedFile::new(upload.path(), "anim.gif");

    store.save(&file, Some("2024/01")).await.unwrap();
    let opened = store.open("2024/01/anim.gif").await.unwrap();

    assert_eq!(opened.properties.content_type, "image/gif");
}

#[tokio::test]
async fn exists_distinguishes_not_found_from_failure() {
    let (store, service, _) = create_test_store();
    service.insert("c", "there.png", "image/png", "x");

    assert!(store.exists("there.png").await.unwrap());
    assert!(!store.exists("absent.png").await.unwrap());

    service.fail("get_properties", 500);
    let err = store.exists("there.png").await.unwrap_err();
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn delete_joins_target_dir() {
    let (store, service, _) = create_test_store();
    service.insert("c", "2024/01/x.png", "image/png", "x");

    assert!(store.delete("x.png", Some("2024/01")).await.unwrap());
    assert!(service.content("c", "2024/01/x.png").is_none());
}

#[tokio::test]
async fn delete_resolves_false_on_remote_failure() {
    let (store, service, _) = create_test_store();

    // already absent
    assert!(!store.delete("gone.png", Some("2024/01")).await.unwrap());

    service.insert("c", "2024/01/x.png", "image/png", "x");
    service.fail("delete_blob", 503);
    assert!(!store.delete("x.png", Some("2024/01")).await.unwrap());
}

#[tokio::test]
async fn open_streams_content() {
    let (store, service, _) = create_test_store();
    service.insert("c", "img/q.png", "image/png", vec![1u8; 200_000]);

    let opened = store.open("img/q.png").await.unwrap();
    assert_eq!(opened.properties.content_length, 200_000);

    let body: Vec<bytes::Bytes> = opened.stream.try_collect().await.unwrap();
    assert_eq!(body.concat().len(), 200_000);
}

#[tokio::test]
async fn open_missing_blob_is_not_found() {
    let (store, _, _) = create_test_store();
    assert!(store.open("img/q.png").await.unwrap_err().is_not_found());
}
