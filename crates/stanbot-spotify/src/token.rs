//! Token caching for Spotify client-credentials auth.
//!
//! Provides a thread-safe, async-aware token cache with:
//! - Refresh margin to avoid token expiry during requests
//! - Single-flight pattern to prevent thundering herd on refresh
//! - Graceful fallback to existing valid token on refresh failure

use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{SpotifyError, SpotifyResult};

// =============================================================================
// Constants
// =============================================================================

/// Refresh margin: refresh token 60 seconds before expiry.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Spotify's OAuth token endpoint.
pub const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

// =============================================================================
// Credentials
// =============================================================================

/// Application credentials for the client-credentials grant.
#[derive(Debug, Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl SpotifyCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Load credentials from `SPOTIFY_CLIENT_ID` / `SPOTIFY_CLIENT_SECRET`.
    pub fn from_env() -> SpotifyResult<Self> {
        let client_id = require_env("SPOTIFY_CLIENT_ID")?;
        let client_secret = require_env("SPOTIFY_CLIENT_SECRET")?;
        Ok(Self {
            client_id,
            client_secret,
        })
    }

    /// `Authorization` header value for the token endpoint.
    fn basic_auth(&self) -> String {
        let raw = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", BASE64.encode(raw))
    }
}

fn require_env(name: &str) -> SpotifyResult<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(SpotifyError::MissingCredentials(name.to_string())),
    }
}

// =============================================================================
// Token Cache
// =============================================================================

/// Cached token with expiration tracking.
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    /// Check if token is still valid with refresh margin.
    fn is_valid(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }

    /// Check if token is technically still usable (even if refresh is needed).
    fn is_usable(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Thread-safe token cache with single-flight refresh.
pub struct TokenCache {
    http: reqwest::Client,
    credentials: SpotifyCredentials,
    token_url: String,
    cache: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    /// Create a new token cache.
    pub fn new(http: reqwest::Client, credentials: SpotifyCredentials) -> Self {
        Self {
            http,
            credentials,
            token_url: SPOTIFY_TOKEN_URL.to_string(),
            cache: RwLock::new(None),
        }
    }

    /// Override the token endpoint (tests point this at a local server).
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Invalidate the cached token.
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }

    /// Get a valid access token, refreshing if necessary.
    ///
    /// This method implements the single-flight pattern:
    /// - Fast path: return cached token if still valid
    /// - Slow path: acquire write lock and refresh (double-check first)
    /// - Fallback: on refresh failure, use existing token if still usable
    pub async fn get_token(&self) -> SpotifyResult<String> {
        // Fast path: check read lock first
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.access_token.clone());
                }
            }
        }

        // Slow path: acquire write lock and refresh
        let mut cache = self.cache.write().await;

        // Double-check: another task may have refreshed while we waited
        if let Some(cached) = cache.as_ref() {
            if cached.is_valid() {
                return Ok(cached.access_token.clone());
            }
        }

        // Attempt refresh
        match self.request_token().await {
            Ok(token) => {
                let expires_at = Instant::now() + Duration::from_secs(token.expires_in);
                *cache = Some(CachedToken {
                    access_token: token.access_token.clone(),
                    expires_at,
                });
                debug!(
                    expires_in = token.expires_in,
                    "Refreshed Spotify access token"
                );
                Ok(token.access_token)
            }
            Err(e) => {
                // On refresh failure, check if existing token is still usable
                if let Some(cached) = cache.as_ref() {
                    if cached.is_usable() {
                        warn!("Token refresh failed, using existing token: {}", e);
                        return Ok(cached.access_token.clone());
                    }
                }

                Err(e)
            }
        }
    }

    /// Exchange client credentials for an access token.
    async fn request_token(&self) -> SpotifyResult<TokenResponse> {
        let response = self
            .http
            .post(&self.token_url)
            .header(reqwest::header::AUTHORIZATION, self.credentials.basic_auth())
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SpotifyError::auth_failed(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        Ok(response.json().await?)
    }
}

// =============================================================================
// Tests
// =============================================================================
