//! Tests for the generation-and-persistence pipeline fallback chain

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kotonone::error::{AppError, Result};
use kotonone::generation::{GeneratedImage, ImageGenerator, PoemGenerator};
use kotonone::pipeline::GenerationPipeline;
use kotonone::records::{NewPoemRecord, PoemRecord, RecordStore};
use kotonone::storage::{ObjectMetadata, ObjectStore};

const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D,
];

const PLACEHOLDER: &str = "/images/fallback-background.jpg";

struct FixedPoems;

#[async_trait]
impl PoemGenerator for FixedPoems {
    async fn generate_poem(&self, _theme: &str) -> Result<String> {
        Ok("やわらかな光に\n包まれて\n心が軽やか".to_string())
    }

    async fn generate_image_prompt(&self, _theme: &str, _poem: &str) -> Result<String> {
        Ok("Abstract watercolor painting, soft tones".to_string())
    }
}

struct FixedImages {
    image: GeneratedImage,
}

#[async_trait]
impl ImageGenerator for FixedImages {
    async fn generate_image(&self, _prompt: &str) -> Result<GeneratedImage> {
        Ok(self.image.clone())
    }
}

struct FailingImages;

#[async_trait]
impl ImageGenerator for FailingImages {
    async fn generate_image(&self, _prompt: &str) -> Result<GeneratedImage> {
        Err(AppError::ImageGeneration("rate limit exceeded".to_string()))
    }
}

struct MemoryStore {
    fail_upload: bool,
    objects: Mutex<HashMap<String, Bytes>>,
}

impl MemoryStore {
    fn new(fail_upload: bool) -> Self {
        Self {
            fail_upload,
            objects: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn upload(&self, key: &str, bytes: Bytes, _metadata: &ObjectMetadata) -> Result<String> {
        if self.fail_upload {
            return Err(AppError::Storage("bucket unavailable".to_string()));
        }
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
        if self.objects.lock().unwrap().contains_key(key) {
            Ok(format!("https://store.example/{}?token=t", key))
        } else {
            Err(AppError::NotFound(key.to_string()))
        }
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

fn build_pipeline(
    images: Arc<dyn ImageGenerator>,
    store: Arc<MemoryStore>,
    records: Arc<MemoryRecords>,
) -> GenerationPipeline {
    GenerationPipeline::new(
        Arc::new(FixedPoems),
        images,
        store,
        records,
        PLACEHOLDER.to_string(),
        "dall-e-3".to_string(),
    )
    .unwrap()
}

fn inline_image() -> GeneratedImage {
    GeneratedImage {
        url: Some("https://cdn.upstream.example/tmp/img.png".to_string()),
        b64_json: Some(STANDARD.encode(PNG_BYTES)),
        revised_prompt: None,
    }
}

#[tokio::test]
async fn test_successful_creation_stores_image_durably() {
    let store = Arc::new(MemoryStore::new(false));
    let records = Arc::new(MemoryRecords::default());
    let pipeline = build_pipeline(
        Arc::new(FixedImages {
            image: inline_image(),
        }),
        store.clone(),
        records.clone(),
    );

    let created = pipeline.create("安心したい").await.unwrap();

    assert!(!created.id.is_empty());
    assert_eq!(created.theme, "安心したい");
    assert!(!created.phrase.is_empty());
    assert!(created.image_prompt.ends_with(" [STORAGE]"));
    assert_eq!(
        created.image_url,
        format!("https://store.example/images/{}.png", created.id)
    );

    // One atomic write, keyed by the same id
    let saved = records.saved.lock().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].id, created.id);
    assert!(store
        .objects
        .lock()
        .unwrap()
        .contains_key(&format!("images/{}.png", created.id)));
}

#[tokio::test]
async fn test_storage_failure_falls_back_to_upstream_url() {
    let store = Arc::new(MemoryStore::new(true));
    let records = Arc::new(MemoryRecords::default());
    let pipeline = build_pipeline(
        Arc::new(FixedImages {
            image: inline_image(),
        }),
        store,
        records,
    );

    let created = pipeline.create("ざわざわ").await.unwrap();

    assert!(created.image_prompt.ends_with(" [DIRECT]"));
    assert_eq!(created.image_url, "https://cdn.upstream.example/tmp/img.png");
}

#[tokio::test]
async fn test_image_generation_failure_uses_placeholder() {
    let store = Arc::new(MemoryStore::new(false));
    let records = Arc::new(MemoryRecords::default());
    let pipeline = build_pipeline(Arc::new(FailingImages), store, records);

    let created = pipeline.create("疲れた").await.unwrap();

    assert!(created.image_prompt.ends_with(" [FALLBACK]"));
    assert!(created.image_prompt.contains("疲れた"));
    assert_eq!(created.image_url, PLACEHOLDER);
    assert!(!created.phrase.is_empty());
}

#[tokio::test]
async fn test_source_fetch_failure_uses_placeholder() {
    // Upstream image URL 404s and there is no inline payload
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tmp/img.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new(false));
    let records = Arc::new(MemoryRecords::default());
    let pipeline = build_pipeline(
        Arc::new(FixedImages {
            image: GeneratedImage {
                url: Some(format!("{}/tmp/img.png", server.uri())),
                b64_json: None,
                revised_prompt: None,
            },
        }),
        store.clone(),
        records,
    );

    let created = pipeline.create("寂しい").await.unwrap();

    assert!(created.image_prompt.ends_with(" [FALLBACK]"));
    assert_eq!(created.image_url, PLACEHOLDER);
    assert!(store.objects.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_theme_is_trimmed_but_not_mutated() {
    let store = Arc::new(MemoryStore::new(false));
    let records = Arc::new(MemoryRecords::default());
    let pipeline = build_pipeline(
        Arc::new(FixedImages {
            image: inline_image(),
        }),
        store,
        records.clone(),
    );

    let created = pipeline.create("  安心したい\n").await.unwrap();
    assert_eq!(created.theme, "安心したい");

    // Round-trip through the record store returns the theme verbatim
    let fetched = records.fetch(&created.id).await.unwrap().unwrap();
    assert_eq!(fetched.theme, "安心したい");
    assert_eq!(fetched.phrase, created.phrase);
    assert_eq!(fetched.image_url.as_deref(), Some(created.image_url.as_str()));
}

#[tokio::test]
async fn test_empty_theme_is_rejected() {
    let store = Arc::new(MemoryStore::new(false));
    let records = Arc::new(MemoryRecords::default());
    let pipeline = build_pipeline(
        Arc::new(FixedImages {
            image: inline_image(),
        }),
        store,
        records.clone(),
    );

    let err = pipeline.create("   ").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(records.saved.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_dummy_mode_tags_record() {
    let store = Arc::new(MemoryStore::new(false));
    let records = Arc::new(MemoryRecords::default());
    let pipeline = build_pipeline(
        Arc::new(FixedImages {
            image: inline_image(),
        }),
        store.clone(),
        records,
    )
    .with_dummy_mode(true);

    let created = pipeline.create("嬉しい").await.unwrap();

    assert!(created.image_prompt.ends_with(" [DUMMY]"));
    // Canned content never touches the durable store
    assert!(store.objects.lock().unwrap().is_empty());
}
