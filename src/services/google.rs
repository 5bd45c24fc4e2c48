//! Google OAuth code exchange and profile lookup for social login.

use crate::error::AppError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct GoogleTokens {
    pub access_token: String,
}

/// Profile fields returned by the OpenID Connect userinfo endpoint.
#[derive(Debug, Deserialize)]
pub struct GoogleProfile {
    /// Stable Google account id
    pub sub: String,
    #[serde(default)]
    pub name: String,
    pub email: String,
    pub picture: Option<String>,
}

#[derive(Clone)]
pub struct GoogleAuthClient {
    http: reqwest::Client,
    token_url: String,
    userinfo_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
}

impl GoogleAuthClient {
    pub fn new(client_id: Option<String>, client_secret: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
            client_id,
            client_secret,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }

    pub fn client_id(&self) -> Result<&str, AppError> {
        self.client_id
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("Google login is not configured".to_string()))
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<GoogleTokens, AppError> {
        let client_id = self.client_id()?;
        let client_secret = self
            .client_secret
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("Google login is not configured".to_string()))?;

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("code", code),
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Google token exchange: {}", e)))?;

        check_response_json(response).await
    }

    pub async fn fetch_profile(&self, access_token: &str) -> Result<GoogleProfile, AppError> {
        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Google userinfo: {}", e)))?;

        check_response_json(response).await
    }
}

async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Internal(anyhow::anyhow!(
            "Google API HTTP {}: {}",
            status,
            body
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Google API JSON parse: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_parsing() {
        let profile: GoogleProfile = serde_json::from_str(
            r#"{"sub": "108", "name": "Ana", "email": "ana@example.com", "picture": "https://p/x.jpg"}"#,
        )
        .unwrap();
        assert_eq!(profile.sub, "108");
        assert_eq!(profile.email, "ana@example.com");
    }

    #[test]
    fn test_unconfigured_client() {
        let client = GoogleAuthClient::new(None, None);
        assert!(!client.is_configured());
        assert!(client.client_id().is_err());
    }
}
