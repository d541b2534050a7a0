//! Access token cache for the worker's credential authority.
//!
//! One `AuthClient` is shared by every capability client routed through the
//! same authority. The cached token is reused until it expires within
//! [`EXPIRY_MARGIN_MS`] of now, then refreshed via a client-credentials
//! grant. Concurrent callers past the margin may both refresh; the lock is
//! never held across the network call and the later response overwrites.

use std::sync::Mutex;

use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error};

/// Tokens expiring within this margin are treated as stale.
const EXPIRY_MARGIN_MS: i64 = 60 * 1000;

const B64_JWT: base64::engine::GeneralPurpose = base64::engine::general_purpose::URL_SAFE_NO_PAD;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("could not get access-token (status {status})")]
    TokenRequest { status: u16 },
    #[error("token endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed access token: {0}")]
    MalformedToken(String),
}

/// Credential-authority settings, usually the `[auth]` config section.
#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub token_endpoint: String,
    pub client_id: String,
    /// Supports ${ENV_VAR} substitution
    pub client_secret: String,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at_ms: i64,
}

impl CachedToken {
    /// A token is fresh while its expiry is more than the margin away.
    fn is_fresh(&self, now_ms: i64) -> bool {
        self.expires_at_ms - EXPIRY_MARGIN_MS > now_ms
    }
}

/// Source of bearer tokens for capability REST calls.
///
/// Capability clients hold this behind an `Arc` so one cache serves every
/// invocation routed through the same authority.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn get_access_token(&self) -> Result<String, AuthError>;
}

pub struct AuthClient {
    http: reqwest::Client,
    config: AuthConfig,
    cache: Mutex<Option<CachedToken>>,
}

impl AuthClient {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            cache: Mutex::new(None),
        }
    }

    fn cached_token(&self, now_ms: i64) -> Option<String> {
        let cache = self.cache.lock().ok()?;
        cache
            .as_ref()
            .filter(|cached| cached.is_fresh(now_ms))
            .map(|cached| cached.token.clone())
    }

    async fn fetch_token(&self) -> Result<CachedToken, AuthError> {
        debug!("refreshing access token from {}", self.config.token_endpoint);

        let response = self
            .http
            .post(&self.config.token_endpoint)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!(status = status.as_u16(), "could not get access-token");
            return Err(AuthError::TokenRequest {
                status: status.as_u16(),
            });
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
        }

        let body: TokenResponse = response.json().await?;
        let expires_at_ms = decode_expiry_ms(&body.access_token)?;

        Ok(CachedToken {
            token: body.access_token,
            expires_at_ms,
        })
    }

    #[cfg(test)]
    fn seed_cache(&self, token: &str, expires_at_ms: i64) {
        *self.cache.lock().unwrap() = Some(CachedToken {
            token: token.to_string(),
            expires_at_ms,
        });
    }
}

#[async_trait]
impl TokenProvider for AuthClient {
    async fn get_access_token(&self) -> Result<String, AuthError> {
        let now_ms = Utc::now().timestamp_millis();
        if let Some(token) = self.cached_token(now_ms) {
            return Ok(token);
        }

        let fresh = self.fetch_token().await?;
        let token = fresh.token.clone();
        if let Ok(mut cache) = self.cache.lock() {
            *cache = Some(fresh);
        }
        Ok(token)
    }
}

/// Reads the `exp` claim of a JWT without verifying the signature and
/// returns it in epoch milliseconds. The issuer is trusted here; the token
/// only gates our own outbound calls.
fn decode_expiry_ms(token: &str) -> Result<i64, AuthError> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| AuthError::MalformedToken("missing payload segment".to_string()))?;
    let bytes = B64_JWT
        .decode(payload)
        .map_err(|e| AuthError::MalformedToken(e.to_string()))?;

    #[derive(Deserialize)]
    struct Claims {
        exp: i64,
    }

    let claims: Claims =
        serde_json::from_slice(&bytes).map_err(|e| AuthError::MalformedToken(e.to_string()))?;
    Ok(claims.exp * 1000)
}
