//! Integration tests for the HTTP and disk object stores.

use media_store::{
    DiskObjectStore, HttpObjectStore, HttpStoreConfig, ObjectStore, StorageError, Upload,
};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// HTTP gateway
// ============================================================================

mod http_tests {
    use super::*;

    fn store_for(server: &MockServer) -> HttpObjectStore {
        HttpObjectStore::new(HttpStoreConfig::new(server.uri()).with_token("secret")).unwrap()
    }

    #[tokio::test]
    async fn test_upload_returns_gateway_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(header("authorization", "Bearer secret"))
            .and(body_string_contains("chat_audios"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "url": "https://cdn.example.com/chat_audios/abc123.webm"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = store_for(&server);
        let url = store
            .store(
                Upload::new(vec![0u8; 16])
                    .with_content_type("audio/webm")
                    .with_file_name("audio.webm"),
            )
            .await
            .unwrap();

        assert_eq!(url, "https://cdn.example.com/chat_audios/abc123.webm");
        assert_eq!(store.key_for_url(&url).as_deref(), Some("chat_audios/abc123"));
    }

    #[tokio::test]
    async fn test_upload_accepts_secure_url_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "secure_url": "https://cdn.example.com/chat_audios/xyz.ogg",
                "public_id": "chat_audios/xyz"
            })))
            .mount(&server)
            .await;

        let url = store_for(&server).store(Upload::new(vec![1])).await.unwrap();
        assert_eq!(url, "https://cdn.example.com/chat_audios/xyz.ogg");
    }

    #[tokio::test]
    async fn test_upload_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let result = store_for(&server).store(Upload::new(vec![1])).await;
        match result {
            Err(StorageError::Gateway { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("expected gateway error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_by_key() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/objects/chat_audios/abc123"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        store_for(&server).delete("chat_audios/abc123").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_missing_object_is_ok() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        store_for(&server).delete("chat_audios/gone").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_failure_surfaces() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let result = store_for(&server).delete("chat_audios/abc").await;
        assert!(matches!(result, Err(StorageError::Gateway { status: 502, .. })));
    }

    #[tokio::test]
    async fn test_delete_rejects_traversal_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let result = store_for(&server).delete("../secrets").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }
}

// ============================================================================
// Disk store
// ============================================================================

mod disk_tests {
    use super::*;

    #[tokio::test]
    async fn test_store_then_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskObjectStore::new(dir.path(), "/media/", "chat_audios");

        let url = store
            .store(Upload::new(b"RIFF".to_vec()).with_file_name("voice.wav"))
            .await
            .unwrap();
        assert!(url.starts_with("/media/chat_audios/"));
        assert!(url.ends_with(".wav"));

        let file_name = url.rsplit('/').next().unwrap();
        let on_disk = dir.path().join("chat_audios").join(file_name);
        assert_eq!(std::fs::read(&on_disk).unwrap(), b"RIFF");

        let key = store.key_for_url(&url).unwrap();
        store.delete(&key).await.unwrap();
        assert!(!on_disk.exists());
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskObjectStore::new(dir.path(), "/media", "chat_audios");

        // Folder does not exist yet
        store.delete("chat_audios/nothing").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_leaves_other_objects() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskObjectStore::new(dir.path(), "/media", "chat_audios");

        let keep = store.store(Upload::new(vec![1])).await.unwrap();
        let drop = store.store(Upload::new(vec![2])).await.unwrap();

        store.delete(&store.key_for_url(&drop).unwrap()).await.unwrap();

        let remaining: Vec<_> = std::fs::read_dir(dir.path().join("chat_audios"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(remaining.len(), 1);
        assert!(keep.ends_with(&remaining[0]));
    }
}
