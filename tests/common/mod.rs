use petfolio::config::Config;
use petfolio::entitlement::EntitlementEngine;
use petfolio::models::{PlanTier, UsageStats, User};
use petfolio::routes::create_router;
use petfolio::services::{GeminiClient, GoogleAuthClient, PlacesClient};
use petfolio::session::SessionManager;
use petfolio::store::{LocalStore, PetStore};
use petfolio::time_utils::now_millis;
use petfolio::AppState;
use std::sync::Arc;
use tempfile::TempDir;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// File-backed store plus session manager rooted in a fresh temp dir.
/// The TempDir must be kept alive for the duration of the test.
#[allow(dead_code)]
pub async fn test_env() -> (TempDir, Arc<LocalStore>, Arc<SessionManager>) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = Arc::new(
        LocalStore::new(dir.path())
            .await
            .expect("Failed to create local store"),
    );
    let sessions = Arc::new(
        SessionManager::new(dir.path())
            .await
            .expect("Failed to create session manager"),
    );
    (dir, store, sessions)
}

#[allow(dead_code)]
pub fn test_engine(store: Arc<LocalStore>, sessions: Arc<SessionManager>) -> EntitlementEngine {
    EntitlementEngine::new(store, sessions)
}

/// A free-tier user with zeroed usage counters.
#[allow(dead_code)]
pub fn free_user(uid: &str) -> User {
    let now = now_millis();
    User {
        uid: uid.to_string(),
        name: "Test User".to_string(),
        email: format!("{}@example.com", uid),
        photo_url: None,
        plan: PlanTier::Free,
        plan_expires_at: None,
        created_at: now,
        last_login: now,
        usage: Some(UsageStats::default()),
    }
}

/// Seed a user into the store.
#[allow(dead_code)]
pub async fn seed_user(store: &dyn PetStore, user: &User) {
    store.upsert_user(user).await.expect("Failed to seed user");
}

/// Create a test app over a local store with offline external clients.
/// Returns the router, shared state and the temp dir keeping it alive.
#[allow(dead_code)]
pub async fn create_test_app() -> (axum::Router, Arc<AppState>, TempDir) {
    let (dir, store, sessions) = test_env().await;

    let config = Config {
        data_dir: dir.path().to_path_buf(),
        ..Config::default()
    };

    let entitlements = EntitlementEngine::new(store.clone(), sessions.clone());

    let state = Arc::new(AppState {
        config,
        store,
        sessions,
        entitlements,
        assistant: GeminiClient::new(None),
        places: PlacesClient::new(None),
        google_auth: GoogleAuthClient::new(None, None),
    });

    (create_router(state.clone()), state, dir)
}
