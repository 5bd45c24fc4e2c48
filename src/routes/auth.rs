//! Account registration, login and Google OAuth routes.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, decode_claims, token_from_request};
use crate::models::{PlanTier, UsageStats, User};
use crate::services::password::{hash_password, verify_password};
use crate::time_utils::now_millis;
use crate::AppState;

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/reset", post(reset_password))
        .route("/auth/logout", post(logout))
        .route("/auth/google", get(google_start))
        .route("/auth/google/callback", get(google_callback))
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn validate_credentials(email: &str, password: &str) -> Result<()> {
    if !email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }
    if password.len() < 6 {
        return Err(AppError::BadRequest(
            "Password must be at least 6 characters".to_string(),
        ));
    }
    Ok(())
}

/// Create an account with email and password.
async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }
    validate_credentials(&body.email, &body.password)?;

    let email = body.email.trim().to_lowercase();
    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict(
            "An account with this email already exists".to_string(),
        ));
    }

    let uid = uuid::Uuid::new_v4().to_string();
    let record = hash_password(&uid, &body.password)?;
    state.store.set_credentials(&record).await?;

    let now = now_millis();
    let user = User {
        uid: uid.clone(),
        name: name.to_string(),
        email,
        photo_url: None,
        plan: PlanTier::Free,
        plan_expires_at: None,
        created_at: now,
        last_login: now,
        usage: Some(UsageStats::default()),
    };
    state.store.upsert_user(&user).await?;
    state.sessions.establish(&user).await?;

    let token = create_jwt(&uid, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    tracing::info!(uid = %uid, "New account registered");

    Ok(Json(AuthResponse { token, user }))
}

/// Email and password login.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let email = body.email.trim().to_lowercase();

    let mut user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let record = state
        .store
        .get_credentials(&user.uid)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&record, &body.password) {
        return Err(AppError::Unauthorized);
    }

    // Accounts created before usage tracking get counters on first login.
    if user.usage.is_none() {
        user.usage = Some(UsageStats::default());
    }
    user.last_login = now_millis();
    state.store.upsert_user(&user).await?;
    state.sessions.establish(&user).await?;

    let token = create_jwt(&user.uid, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    tracing::info!(uid = %user.uid, "User logged in");

    Ok(Json(AuthResponse { token, user }))
}

/// Password reset request. Only acknowledges; no reset email is sent from
/// this service.
async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResetRequest>,
) -> Result<Json<MessageResponse>> {
    let email = body.email.trim().to_lowercase();

    if state.store.find_user_by_email(&email).await?.is_none() {
        return Err(AppError::NotFound("No account with this email".to_string()));
    }

    tracing::info!("Password reset requested");

    Ok(Json(MessageResponse {
        message: "If this account exists, reset instructions have been sent.".to_string(),
    }))
}

/// Clear the server-side session. Tolerates an expired or missing token so
/// logout always succeeds for the client.
async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: axum::extract::Request,
) -> Result<Json<MessageResponse>> {
    if let Some(token) = token_from_request(&jar, &request) {
        if let Ok(claims) = decode_claims(&token, &state.config.jwt_signing_key) {
            state.sessions.clear(&claims.sub).await?;
        }
    }

    Ok(Json(MessageResponse {
        message: "Logged out".to_string(),
    }))
}

/// Query parameters for starting OAuth flow.
#[derive(Deserialize)]
pub struct AuthStartParams {
    /// Frontend URL to redirect back to after OAuth completes.
    #[serde(default)]
    redirect_uri: Option<String>,
}

/// Start OAuth flow - redirect to Google authorization.
async fn google_start(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthStartParams>,
    headers: axum::http::HeaderMap,
) -> Result<Redirect> {
    let client_id = state.google_auth.client_id()?;

    let frontend_url = params
        .redirect_uri
        .unwrap_or_else(|| state.config.frontend_url.clone());

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis();

    // Payload is "frontend_url|timestamp_hex", signed with HMAC-SHA256
    let state_payload = format!("{}|{:x}", frontend_url, timestamp);

    let mut mac = HmacSha256::new_from_slice(&state.config.oauth_state_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(state_payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    let signed_state = format!("{}|{}", state_payload, hex::encode(signature));
    let oauth_state = URL_SAFE_NO_PAD.encode(signed_state.as_bytes());

    let callback_url = callback_url(&headers);

    let auth_url = format!(
        "https://accounts.google.com/o/oauth2/v2/auth?\
         client_id={}&\
         redirect_uri={}&\
         response_type=code&\
         scope={}&\
         state={}",
        client_id,
        urlencoding::encode(&callback_url),
        urlencoding::encode("openid email profile"),
        oauth_state
    );

    tracing::info!(frontend_url = %frontend_url, "Starting OAuth flow, redirecting to Google");

    Ok(Redirect::temporary(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    code: String,
    state: String,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange code, provision the account, create session.
async fn google_callback(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect> {
    let frontend_url = verify_and_decode_state(&params.state, &state.config.oauth_state_key)
        .unwrap_or_else(|| {
            tracing::warn!(
                "Invalid or tampered state parameter, falling back to default frontend URL"
            );
            state.config.frontend_url.clone()
        });

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Google");
        let redirect = format!("{}?error={}", frontend_url, error);
        return Ok(Redirect::temporary(&redirect));
    }

    let tokens = state
        .google_auth
        .exchange_code(&params.code, &callback_url(&headers))
        .await?;
    let profile = state.google_auth.fetch_profile(&tokens.access_token).await?;

    let email = profile.email.trim().to_lowercase();
    let now = now_millis();

    // Link by email so a password account and Google login share a profile.
    let mut user = match state.store.find_user_by_email(&email).await? {
        Some(existing) => existing,
        None => User {
            uid: profile.sub.clone(),
            name: profile.name.clone(),
            email,
            photo_url: None,
            plan: PlanTier::Free,
            plan_expires_at: None,
            created_at: now,
            last_login: now,
            usage: Some(UsageStats::default()),
        },
    };

    if user.usage.is_none() {
        user.usage = Some(UsageStats::default());
    }
    if user.photo_url.is_none() {
        user.photo_url = profile.picture.clone();
    }
    user.last_login = now;

    state.store.upsert_user(&user).await?;
    state.sessions.establish(&user).await?;

    tracing::info!(uid = %user.uid, "OAuth successful, session established");

    let jwt = create_jwt(&user.uid, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    let redirect_url = format!("{}/callback?token={}", frontend_url, jwt);

    Ok(Redirect::temporary(&redirect_url))
}

/// Callback URL derived from the request host.
fn callback_url(headers: &axum::http::HeaderMap) -> String {
    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| {
            std::env::var("API_HOST").unwrap_or_else(|_| "localhost:8080".to_string())
        });

    let scheme = if host.contains("localhost") || host.contains("127.0.0.1") {
        "http"
    } else {
        "https"
    };

    format!("{}://{}/auth/google/callback", scheme, host)
}

/// Verify HMAC signature and decode the frontend URL from the OAuth state parameter.
fn verify_and_decode_state(state: &str, secret: &[u8]) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // Format is "frontend_url|timestamp_hex|signature_hex"
    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    if parts.len() != 3 {
        return None;
    }

    let frontend_url = parts[0];
    let timestamp_hex = parts[1];
    let signature_hex = parts[2];

    let payload = format!("{}|{}", frontend_url, timestamp_hex);

    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());

    let expected_signature = hex::encode(mac.finalize().into_bytes());

    if signature_hex != expected_signature {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    Some(frontend_url.to_string())
}
