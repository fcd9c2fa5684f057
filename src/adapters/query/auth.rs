//! OAuth client-credentials token provider
//!
//! Acquires bearer tokens for the query service and caches them until
//! shortly before expiry. Token failures are fatal to the whole run, so the
//! orchestrator checks acquisition once before any pipeline starts.

use crate::config::OAuthConfig;
use crate::domain::{ExportError, Result};
use chrono::{DateTime, TimeDelta, Utc};
use secrecy::ExposeSecret;
use serde::Deserialize;

/// Tokens are refreshed once they are within this margin of expiry.
const EXPIRY_MARGIN_SECONDS: i64 = 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    300
}

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_expiring_soon(&self) -> bool {
        Utc::now() >= self.expires_at - TimeDelta::seconds(EXPIRY_MARGIN_SECONDS)
    }
}

/// Cached client-credentials token source.
///
/// Safe to share across pipelines; concurrent callers serialize on the
/// cache so at most one refresh is in flight.
pub struct TokenProvider {
    http: reqwest::Client,
    config: OAuthConfig,
    cached: tokio::sync::Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            cached: tokio::sync::Mutex::new(None),
        }
    }

    /// Returns a valid access token, refreshing if needed.
    pub async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if !token.is_expiring_soon() {
                return Ok(token.access_token.clone());
            }
        }

        let fresh = self.request_token().await?;
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access_token)
    }

    async fn request_token(&self) -> Result<CachedToken> {
        tracing::debug!(token_url = %self.config.token_url, "Requesting OAuth access token");

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            (
                "client_secret",
                self.config.client_secret.expose_secret().as_ref(),
            ),
            ("scope", self.config.scope.as_str()),
            ("resource", self.config.resource_urn.as_str()),
        ];

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| ExportError::Auth(format!("Token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExportError::Auth(format!(
                "Token request failed with status {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ExportError::Auth(format!("Invalid token response: {e}")))?;

        if token.access_token.is_empty() {
            return Err(ExportError::Auth(
                "Token response contained an empty access_token".to_string(),
            ));
        }

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Utc::now() + TimeDelta::seconds(token.expires_in),
        })
    }
}
