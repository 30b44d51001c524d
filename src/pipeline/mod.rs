//! Generation pipeline - theme in, persisted poem record out
//!
//! Strictly sequential: poem, image prompt, image, durable copy, record.
//! Every stage after the poem degrades locally instead of aborting, so a
//! request that produced a poem always produces a record with some
//! renderable image reference.

use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::generation::{GeneratedImage, ImageGenerator, PoemGenerator};
use crate::records::{NewPoemRecord, RecordStore};
use crate::storage::{persist_image, ObjectStore, PersistError};

/// How the record's image reference was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageProvenance {
    /// Copied into the durable store
    Storage,
    /// Upstream generator URL used directly (durable copy failed)
    Direct,
    /// Static placeholder (generation failed entirely)
    Fallback,
    /// Canned development content
    Dummy,
}

impl ImageProvenance {
    /// Suffix appended to the stored image prompt
    pub fn tag(&self) -> &'static str {
        match self {
            ImageProvenance::Storage => " [STORAGE]",
            ImageProvenance::Direct => " [DIRECT]",
            ImageProvenance::Fallback => " [FALLBACK]",
            ImageProvenance::Dummy => " [DUMMY]",
        }
    }
}

/// Creation result returned to the API layer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPoem {
    pub id: String,
    pub theme: String,
    pub phrase: String,
    pub image_url: String,
    pub image_prompt: String,
}

/// The generation-and-persistence pipeline.
///
/// All collaborators are injected; construction wires them once at startup
/// and the pipeline itself holds no mutable state.
pub struct GenerationPipeline {
    poems: Arc<dyn PoemGenerator>,
    images: Arc<dyn ImageGenerator>,
    store: Arc<dyn ObjectStore>,
    records: Arc<dyn RecordStore>,
    fetch: Client,
    placeholder_path: String,
    source_tag: String,
    dummy_mode: bool,
}

impl GenerationPipeline {
    pub fn new(
        poems: Arc<dyn PoemGenerator>,
        images: Arc<dyn ImageGenerator>,
        store: Arc<dyn ObjectStore>,
        records: Arc<dyn RecordStore>,
        placeholder_path: String,
        source_tag: String,
    ) -> Result<Self> {
        let fetch = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            poems,
            images,
            store,
            records,
            fetch,
            placeholder_path,
            source_tag,
            dummy_mode: false,
        })
    }

    /// Tag records as canned development content
    pub fn with_dummy_mode(mut self, dummy: bool) -> Self {
        self.dummy_mode = dummy;
        self
    }

    /// Run the full pipeline for one theme
    pub async fn create(&self, theme: &str) -> Result<CreatedPoem> {
        let theme = theme.trim();
        if theme.is_empty() {
            return Err(AppError::Validation("theme is empty".to_string()));
        }

        // The id doubles as the object-store key prefix, so it is minted
        // before any image work happens.
        let id = Uuid::new_v4().simple().to_string();
        info!(id = %id, theme = %theme, "Pipeline started");

        // Poem generation failure is fatal for the request
        let phrase = self.poems.generate_poem(theme).await?;

        let (image_url, prompt, provenance) = self.produce_image(&id, theme, &phrase).await;
        let image_prompt = format!("{}{}", prompt, provenance.tag());

        let record = NewPoemRecord {
            id: id.clone(),
            theme: theme.to_string(),
            phrase: phrase.clone(),
            image_url: Some(image_url.clone()),
            image_prompt: Some(image_prompt.clone()),
        };

        let saved_id = self.records.save(&record).await?;

        info!(
            id = %saved_id,
            provenance = ?provenance,
            "Pipeline complete"
        );

        Ok(CreatedPoem {
            id: saved_id,
            theme: theme.to_string(),
            phrase,
            image_url,
            image_prompt,
        })
    }

    /// Produce the final image reference, its prompt, and the provenance
    /// tag. Never fails: the worst case is the static placeholder.
    async fn produce_image(
        &self,
        id: &str,
        theme: &str,
        phrase: &str,
    ) -> (String, String, ImageProvenance) {
        let (prompt, image) = match self.generate_artwork(theme, phrase).await {
            Ok(generated) => generated,
            Err(e) => {
                warn!(id = %id, error = %e, "Image generation failed, using placeholder");
                return (
                    self.placeholder_path.clone(),
                    format!("Fallback image for theme: {}", theme),
                    ImageProvenance::Fallback,
                );
            }
        };

        if self.dummy_mode {
            // Canned content never touches the durable store
            let url = image.url.unwrap_or_else(|| self.placeholder_path.clone());
            return (url, prompt, ImageProvenance::Dummy);
        }

        let persisted =
            persist_image(self.store.as_ref(), &self.fetch, id, &image, &self.source_tag).await;

        match persisted {
            Ok(stored_url) => (stored_url, prompt, ImageProvenance::Storage),
            Err(PersistError::Storage(reason)) if image.url.is_some() => {
                // The generator URL still works for a while; better a
                // transient image than none.
                warn!(id = %id, reason = %reason, "Durable copy failed, using upstream URL");
                (image.url.unwrap(), prompt, ImageProvenance::Direct)
            }
            Err(e) => {
                warn!(id = %id, error = %e, "No usable image, using placeholder");
                (
                    self.placeholder_path.clone(),
                    format!("Fallback image for theme: {}", theme),
                    ImageProvenance::Fallback,
                )
            }
        }
    }

    async fn generate_artwork(&self, theme: &str, phrase: &str) -> Result<(String, GeneratedImage)> {
        let prompt = self.poems.generate_image_prompt(theme, phrase).await?;
        let image = self.images.generate_image(&prompt).await?;
        Ok((prompt, image))
    }
}
