//! Application configuration loaded from environment variables.
//!
//! The storage backend is fixed at startup: a configured GCP project id
//! selects the Firestore backend, otherwise the local file-backed store is
//! used. There is no runtime migration between the two.

use std::env;
use std::path::PathBuf;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Frontend URL for CORS and OAuth redirects
    pub frontend_url: String,
    /// GCP project id; presence switches the store to Firestore
    pub gcp_project_id: Option<String>,
    /// Directory for local-mode data and session snapshots
    pub data_dir: PathBuf,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// HMAC key for OAuth state parameters
    pub oauth_state_key: Vec<u8>,
    /// Google OAuth client id (social login)
    pub google_client_id: Option<String>,
    /// Google OAuth client secret (social login)
    pub google_client_secret: Option<String>,
    /// Gemini API key (assistant, receipt check, food analysis)
    pub gemini_api_key: Option<String>,
    /// Google Places API key (clinic finder)
    pub places_api_key: Option<String>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: None,
            data_dir: PathBuf::from("data"),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            oauth_state_key: b"test_oauth_state_key".to_vec(),
            google_client_id: None,
            google_client_secret: None,
            gemini_api_key: None,
            places_api_key: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let jwt_signing_key = env::var("JWT_SIGNING_KEY")
            .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
            .into_bytes();

        // The OAuth state key may be set separately; it falls back to the
        // JWT key so single-secret deployments keep working.
        let oauth_state_key = env::var("OAUTH_STATE_KEY")
            .map(String::into_bytes)
            .unwrap_or_else(|_| jwt_signing_key.clone());

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: non_empty_var("PETFOLIO_GCP_PROJECT"),
            data_dir: env::var("PETFOLIO_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
            jwt_signing_key,
            oauth_state_key,
            google_client_id: non_empty_var("GOOGLE_CLIENT_ID"),
            google_client_secret: non_empty_var("GOOGLE_CLIENT_SECRET"),
            gemini_api_key: non_empty_var("GEMINI_API_KEY"),
            places_api_key: non_empty_var("PLACES_API_KEY"),
        })
    }

    /// True when the remote (Firestore) backend is selected.
    pub fn remote_mode(&self) -> bool {
        self.gcp_project_id.is_some()
    }
}

/// Read an env var, treating empty/whitespace values as unset.
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Process environment is shared across test threads; tests that mutate
    // it must run one at a time.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_config_from_env_selects_backend() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::remove_var("PETFOLIO_GCP_PROJECT");

        let config = Config::from_env().expect("Config should load");
        assert!(!config.remote_mode());
        assert_eq!(config.port, 8080);

        env::set_var("PETFOLIO_GCP_PROJECT", "petfolio-prod");
        let config = Config::from_env().expect("Config should load");
        assert!(config.remote_mode());
        assert_eq!(config.gcp_project_id.as_deref(), Some("petfolio-prod"));

        // Blank project id means local mode, not a broken remote mode
        env::set_var("PETFOLIO_GCP_PROJECT", "   ");
        let config = Config::from_env().expect("Config should load");
        assert!(!config.remote_mode());

        env::remove_var("PETFOLIO_GCP_PROJECT");
    }

    #[test]
    fn test_oauth_state_key_falls_back_to_jwt_key() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        env::set_var("JWT_SIGNING_KEY", "shared_secret_key_for_both_uses");
        env::remove_var("OAUTH_STATE_KEY");

        let config = Config::from_env().expect("Config should load");
        assert_eq!(config.oauth_state_key, config.jwt_signing_key);
    }
}
