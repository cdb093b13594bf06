//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        AppwriteCatalogAdapter, AppwriteClient, AppwriteIdentityAdapter, AppwriteStorageAdapter,
        GeminiTextAdapter,
    },
    config::Config,
    error::ApiError,
    prompts::PromptStore,
    web::{self, state::AppState, ApiDoc},
};
use axum::Router;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize the Appwrite Adapters ---
    // One shared HTTP client; reqwest pools connections internally.
    let http_client = reqwest::Client::new();
    let appwrite = AppwriteClient::new(
        http_client,
        config.appwrite_endpoint.clone(),
        config.appwrite_project_id.clone(),
        config.appwrite_api_key.clone(),
    );
    let storage = Arc::new(AppwriteStorageAdapter::new(
        appwrite.clone(),
        config.bucket_id.clone(),
    ));
    let catalog = Arc::new(AppwriteCatalogAdapter::new(
        appwrite.clone(),
        config.database_id.clone(),
        config.file_collection_id.clone(),
    ));
    let identity = Arc::new(AppwriteIdentityAdapter::new(appwrite));

    // --- 3. Initialize the LLM Adapter & Prompt Store ---
    let llm = Arc::new(GeminiTextAdapter::new(
        &config.gemini_api_key,
        &config.llm_api_base,
        config.gemini_model.clone(),
    ));
    let prompts = Arc::new(PromptStore::new(config.prompts_path.clone()));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        storage,
        catalog,
        llm,
        identity,
        prompts,
    });
    info!(
        "Using model '{}' via {} (auth mode: {:?})",
        config.gemini_model, config.llm_api_base, config.auth_mode
    );

    // --- 5. Create the Web Router ---
    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(web::router(app_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
