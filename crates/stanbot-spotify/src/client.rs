//! Spotify Web API client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::error::{SpotifyError, SpotifyResult};
use crate::token::{SpotifyCredentials, TokenCache, SPOTIFY_TOKEN_URL};

// =============================================================================
// Configuration
// =============================================================================

/// Spotify Web API base URL.
pub const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub api_base: String,
    pub token_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            api_base: SPOTIFY_API_BASE.to_string(),
            token_url: SPOTIFY_TOKEN_URL.to_string(),
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

// =============================================================================
// Client
// =============================================================================

/// The first credited artist on a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackArtist {
    pub name: String,
    pub url: String,
}

/// Spotify Web API client with cached app authentication.
pub struct SpotifyClient {
    http: Client,
    api_base: String,
    tokens: Arc<TokenCache>,
}

impl Clone for SpotifyClient {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            api_base: self.api_base.clone(),
            tokens: Arc::clone(&self.tokens),
        }
    }
}

impl SpotifyClient {
    /// Create a new client.
    pub fn new(credentials: SpotifyCredentials, config: SpotifyConfig) -> SpotifyResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("stanbot-spotify/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SpotifyError::Network)?;

        let tokens =
            TokenCache::new(http.clone(), credentials).with_token_url(config.token_url);

        Ok(Self {
            http,
            api_base: config.api_base,
            tokens: Arc::new(tokens),
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> SpotifyResult<Self> {
        Self::new(SpotifyCredentials::from_env()?, SpotifyConfig::default())
    }

    /// Look up the first credited artist of a track.
    pub async fn artist_for_track(&self, track_id: &str) -> SpotifyResult<TrackArtist> {
        let url = format!("{}/tracks/{}", self.api_base, track_id);

        let mut token = self.tokens.get_token().await?;
        let mut response = self.http.get(&url).bearer_auth(&token).send().await?;
        let mut status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            debug!("Spotify rejected access token, refreshing and retrying once");
            self.tokens.invalidate().await;
            token = self.tokens.get_token().await?;
            response = self.http.get(&url).bearer_auth(&token).send().await?;
            status = response.status();
        }

        match status {
            StatusCode::OK => {
                let track: TrackResponse = response.json().await?;
                let artist = track
                    .artists
                    .into_iter()
                    .next()
                    .ok_or_else(|| SpotifyError::invalid_response("track has no artists"))?;
                let artist_url = artist
                    .external_urls
                    .spotify
                    .ok_or_else(|| SpotifyError::invalid_response("artist has no public URL"))?;

                Ok(TrackArtist {
                    name: artist.name,
                    url: artist_url,
                })
            }
            StatusCode::NOT_FOUND => Err(SpotifyError::TrackNotFound(track_id.to_string())),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(SpotifyError::request_failed(status.as_u16(), body))
            }
        }
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct TrackResponse {
    artists: Vec<ArtistEntry>,
}

#[derive(Debug, Deserialize)]
struct ArtistEntry {
    name: String,
    #[serde(default)]
    external_urls: ExternalUrls,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

// =============================================================================
// Tests
// =============================================================================
