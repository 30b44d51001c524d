//! End-to-end router tests against in-memory collaborators

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use http_body_util::BodyExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use kotonone::config::Settings;
use kotonone::error::{AppError, Result};
use kotonone::generation::dummy::{DummyImageGenerator, DummyPoemGenerator};
use kotonone::pipeline::GenerationPipeline;
use kotonone::records::{NewPoemRecord, PoemRecord, RecordStore};
use kotonone::storage::{ObjectMetadata, ObjectStore};
use kotonone::{api, AppState};

struct MemoryStore {
    objects: Mutex<HashMap<String, Bytes>>,
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn upload(&self, key: &str, bytes: Bytes, _metadata: &ObjectMetadata) -> Result<String> {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes);
        Ok(format!("https://store.example/{}", key))
    }

    async fn get_blob(&self, key: &str) -> Result<Bytes> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::NotFound(key.to_string()))
    }

    async fn download_url(&self, key: &str) -> Result<String> {
        Err(AppError::NotFound(key.to_string()))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.objects.lock().unwrap().contains_key(key))
    }
}

#[derive(Default)]
struct MemoryRecords {
    saved: Mutex<Vec<NewPoemRecord>>,
}

#[async_trait]
impl RecordStore for MemoryRecords {
    async fn save(&self, record: &NewPoemRecord) -> Result<String> {
        self.saved.lock().unwrap().push(record.clone());
        Ok(record.id.clone())
    }

    async fn fetch(&self, id: &str) -> Result<Option<PoemRecord>> {
        Ok(self.saved.lock().unwrap().iter().find(|r| r.id == id).map(
            |r| PoemRecord {
                id: r.id.clone(),
                theme: r.theme.clone(),
                phrase: r.phrase.clone(),
                image_url: r.image_url.clone(),
                image_prompt: r.image_prompt.clone(),
                created_at: Some(chrono::Utc::now()),
            },
        ))
    }

    async fn health(&self) -> bool {
        true
    }
}

fn test_app(tune: impl FnOnce(&mut Settings)) -> Router {
    let mut settings = Settings::default();
    settings.generation.mode = "dummy".to_string();
    settings.storage.bucket = "test-bucket".to_string();
    settings.records.base_url = "http://records.invalid".to_string();
    settings.rate_limit.enabled = false;
    tune(&mut settings);

    let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore {
        objects: Mutex::new(HashMap::new()),
    });
    let records: Arc<dyn RecordStore> = Arc::new(MemoryRecords::default());

    let pipeline = GenerationPipeline::new(
        Arc::new(DummyPoemGenerator),
        Arc::new(DummyImageGenerator),
        store.clone(),
        records.clone(),
        settings.storage.placeholder_path.clone(),
        settings.generation.image_model.clone(),
    )
    .unwrap()
    .with_dummy_mode(true);

    let state = Arc::new(AppState {
        settings,
        pipeline,
        store,
        records,
        loader_client: reqwest::Client::new(),
    });

    api::routes::create_router(state)
}

fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_create_poem_returns_complete_record() {
    let app = test_app(|_| {});

    let response = app
        .oneshot(json_request(
            "/api/poems",
            serde_json::json!({"theme": "安心したい"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;

    assert_eq!(body["success"], true);
    let data = &body["data"];
    assert!(!data["id"].as_str().unwrap().is_empty());
    assert_eq!(data["theme"], "安心したい");
    assert!(!data["phrase"].as_str().unwrap().is_empty());
    assert!(!data["imageUrl"].as_str().unwrap().is_empty());
    assert!(data["imagePrompt"].as_str().unwrap().ends_with(" [DUMMY]"));
}

#[tokio::test]
async fn test_create_poem_rejects_missing_theme() {
    let app = test_app(|_| {});

    let response = app
        .oneshot(json_request("/api/poems", serde_json::json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "テーマを入力してください");
}

#[tokio::test]
async fn test_create_poem_rejects_blank_theme() {
    let app = test_app(|_| {});

    let response = app
        .oneshot(json_request(
            "/api/poems",
            serde_json::json!({"theme": "   "}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_poem_roundtrip() {
    let app = test_app(|_| {});

    let created = app
        .clone()
        .oneshot(json_request(
            "/api/poems",
            serde_json::json!({"theme": "安心したい"}),
        ))
        .await
        .unwrap();
    let created = body_json(created).await;
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/poems/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["theme"], "安心したい");
    assert_eq!(body["data"]["id"], id.as_str());
    // Server-assigned timestamp is normalized to ISO-8601
    assert!(body["data"]["createdAt"].as_str().unwrap().contains('T'));
}

#[tokio::test]
async fn test_get_unknown_poem_is_404() {
    let app = test_app(|_| {});

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/poems/does-not-exist")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_poem_image_falls_back_to_placeholder_redirect() {
    // The in-memory store has no object and no download URL, so the
    // loader reaches its terminal state and the endpoint redirects to
    // the static placeholder.
    let app = test_app(|_| {});

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/poems/ghost/image")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap();
    assert_eq!(location, "/assets/placeholder-gradient.svg");
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app(|_| {});

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["timestamp"].as_str().unwrap().contains('T'));
}

#[tokio::test]
async fn test_api_info() {
    let app = test_app(|_| {});

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/poems")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("詩生成API"));
}

#[tokio::test]
async fn test_rate_limit_applies_to_creation_only() {
    let app = test_app(|settings| {
        settings.rate_limit.enabled = true;
        settings.rate_limit.requests_per_second = 1;
        settings.rate_limit.burst_size = 1;
    });

    let first = app
        .clone()
        .oneshot(json_request(
            "/api/poems",
            serde_json::json!({"theme": "嬉しい"}),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app
        .clone()
        .oneshot(json_request(
            "/api/poems",
            serde_json::json!({"theme": "嬉しい"}),
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

    // Reads keep working while creation is throttled
    let read = app
        .oneshot(
            Request::builder()
                .uri("/api/poems")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(read.status(), StatusCode::OK);
}
