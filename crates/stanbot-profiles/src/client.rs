//! Profile link storage backed by the Supabase REST API.
//!
//! One table, `spotify_profiles(user_id, profile_link)`, maps chat users to
//! their public Spotify profile URL for the profile-card command.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use stanbot_models::UserId;

use crate::error::{ProfileError, ProfileResult};

/// Required prefix for stored profile links.
pub const SPOTIFY_PROFILE_PREFIX: &str = "https://open.spotify.com/user/";

const PROFILE_TABLE: &str = "spotify_profiles";

// =============================================================================
// Configuration
// =============================================================================

/// Supabase connection settings.
#[derive(Debug, Clone)]
pub struct ProfileConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl ProfileConfig {
    /// Load from `SUPABASE_URL` / `SUPABASE_KEY` (and optional
    /// `SUPABASE_TIMEOUT_SECS`).
    pub fn from_env() -> ProfileResult<Self> {
        let base_url = require_env("SUPABASE_URL")?;
        let api_key = require_env("SUPABASE_KEY")?;

        let timeout_secs: u64 = std::env::var("SUPABASE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        Ok(Self {
            base_url,
            api_key,
            timeout: Duration::from_secs(timeout_secs),
            connect_timeout: Duration::from_secs(5),
        })
    }
}

fn require_env(name: &str) -> ProfileResult<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ProfileError::config_error(format!("{name} is not set"))),
    }
}

// =============================================================================
// Store
// =============================================================================

/// Supabase-backed store of per-user Spotify profile links.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    http: Client,
    api_key: String,
    rest_base: String,
}

impl ProfileStore {
    /// Create a new store.
    pub fn new(config: ProfileConfig) -> ProfileResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("stanbot-profiles/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ProfileError::Network)?;

        let rest_base = format!("{}/rest/v1", config.base_url.trim_end_matches('/'));

        Ok(Self {
            http,
            api_key: config.api_key,
            rest_base,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> ProfileResult<Self> {
        Self::new(ProfileConfig::from_env()?)
    }

    fn table_url(&self) -> String {
        format!("{}/{}", self.rest_base, PROFILE_TABLE)
    }

    /// Fetch a user's stored profile link, if any.
    pub async fn get(&self, user: UserId) -> ProfileResult<Option<String>> {
        let response = self
            .http
            .get(self.table_url())
            .query(&[
                ("user_id", format!("eq.{user}")),
                ("select", "profile_link".to_string()),
            ])
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let rows: Vec<ProfileLinkRow> = response.json().await?;
        Ok(rows.into_iter().next().map(|row| row.profile_link))
    }

    /// Store (or replace) a user's profile link.
    ///
    /// The link must be a public Spotify profile URL; anything else is
    /// rejected before any request is made.
    pub async fn upsert(&self, user: UserId, profile_link: &str) -> ProfileResult<()> {
        validate_profile_link(profile_link)?;

        let row = ProfileRow {
            user_id: user.as_u64(),
            profile_link,
        };

        let response = self
            .http
            .post(self.table_url())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "resolution=merge-duplicates")
            .json(&row)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        debug!(user = %user, "Stored profile link");
        Ok(())
    }

    /// Delete a user's stored profile link. Returns whether a row existed.
    pub async fn remove(&self, user: UserId) -> ProfileResult<bool> {
        let response = self
            .http
            .delete(self.table_url())
            .query(&[("user_id", format!("eq.{user}"))])
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=representation")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let removed: Vec<serde_json::Value> = response.json().await?;
        Ok(!removed.is_empty())
    }
}

async fn error_from_response(response: reqwest::Response) -> ProfileError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ProfileError::request_failed(status, body)
}

/// Check that a link is a public Spotify profile URL.
pub fn validate_profile_link(link: &str) -> ProfileResult<()> {
    let parsed = Url::parse(link).map_err(|e| ProfileError::invalid_link(e.to_string()))?;

    if parsed.scheme() != "https" {
        return Err(ProfileError::invalid_link("link must use https"));
    }
    if parsed.host_str() != Some("open.spotify.com") {
        return Err(ProfileError::invalid_link(
            "link must point at open.spotify.com",
        ));
    }

    let user_part = parsed.path().strip_prefix("/user/").unwrap_or("");
    if user_part.is_empty() {
        return Err(ProfileError::invalid_link(format!(
            "link must start with {SPOTIFY_PROFILE_PREFIX}"
        )));
    }

    Ok(())
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
struct ProfileRow<'a> {
    user_id: u64,
    profile_link: &'a str,
}

#[derive(Debug, Deserialize)]
struct ProfileLinkRow {
    profile_link: String,
}

// =============================================================================
// Tests
// =============================================================================
