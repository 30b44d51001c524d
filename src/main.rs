//! Main entry point for the kotonone poem generation service

use kotonone::{
    api,
    config::Settings,
    generation::{
        dummy::{DummyImageGenerator, DummyPoemGenerator},
        images::ImagesClient,
        openai::OpenAiClient,
        ImageGenerator, PoemGenerator,
    },
    pipeline::GenerationPipeline,
    records::{RecordServiceClient, RecordStore},
    storage::{ObjectStore, StorageClient},
    AppState,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json())
        .init();

    info!("Starting kotonone poem generation service");

    // Load configuration
    let settings = Settings::load()?;
    settings.validate()?;
    info!(
        "Loaded configuration: server={}:{} mode={}",
        settings.server.host, settings.server.port, settings.generation.mode
    );

    let dummy_mode = settings.generation.mode == "dummy";

    // Wire generation clients
    let (poems, images): (Arc<dyn PoemGenerator>, Arc<dyn ImageGenerator>) = if dummy_mode {
        (Arc::new(DummyPoemGenerator), Arc::new(DummyImageGenerator))
    } else {
        (
            Arc::new(OpenAiClient::new(&settings.generation)?),
            Arc::new(ImagesClient::new(&settings.generation)?),
        )
    };

    // Wire storage and record clients
    let store: Arc<dyn ObjectStore> = Arc::new(StorageClient::new(&settings.storage)?);
    let records: Arc<dyn RecordStore> = Arc::new(RecordServiceClient::new(&settings.records)?);

    if !records.health().await {
        info!("Record service health check failed at startup; continuing");
    }

    // Assemble the pipeline
    let pipeline = GenerationPipeline::new(
        poems,
        images,
        store.clone(),
        records.clone(),
        settings.storage.placeholder_path.clone(),
        settings.generation.image_model.clone(),
    )?
    .with_dummy_mode(dummy_mode);

    let loader_client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    // Create application state
    let app_state = Arc::new(AppState {
        settings: settings.clone(),
        pipeline,
        store,
        records,
        loader_client,
    });

    // Build the router
    let app = api::routes::create_router(app_state);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    info!("Server listening on {}", addr);

    // Start the server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
