//! Petfolio API Server
//!
//! Pet profiles, vaccination records, an AI vet assistant and a
//! receipt-verified subscription gate, over Firestore or local files.

use petfolio::{
    config::Config,
    entitlement::EntitlementEngine,
    services::{GeminiClient, GoogleAuthClient, PlacesClient},
    session::SessionManager,
    store, AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Petfolio API");

    // Pick the storage backend once; it never changes for the process.
    let store = store::select_backend(&config)
        .await
        .expect("Failed to initialize storage backend");

    let sessions = Arc::new(
        SessionManager::new(&config.data_dir)
            .await
            .expect("Failed to initialize session manager"),
    );

    let entitlements = EntitlementEngine::new(store.clone(), sessions.clone());

    let assistant = GeminiClient::new(config.gemini_api_key.clone());
    if !assistant.is_configured() {
        tracing::warn!("GEMINI_API_KEY not set; assistant features degraded");
    }

    let places = PlacesClient::new(config.places_api_key.clone());
    let google_auth = GoogleAuthClient::new(
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        sessions,
        entitlements,
        assistant,
        places,
        google_auth,
    });

    // Build router
    let app = petfolio::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("petfolio=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
