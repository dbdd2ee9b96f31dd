//! Now-playing card content.
//!
//! Renders what a user is currently streaming into the markdown body of a
//! chat embed. The chat layer owns delivery; this module only builds text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::TrackArtist;

/// Character cells in the progress bar.
pub const PROGRESS_BAR_LENGTH: usize = 10;

/// Spotify brand green.
pub const NOW_PLAYING_COLOR: u32 = 0x1DB954;

/// A user's current Spotify listening state, as reported by the chat
/// platform's presence data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListeningActivity {
    pub track_id: String,
    pub title: String,
    pub album: String,
    pub album_cover_url: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl ListeningActivity {
    pub fn track_url(&self) -> String {
        format!("https://open.spotify.com/track/{}", self.track_id)
    }

    pub fn duration_secs(&self) -> u64 {
        (self.ends_at - self.started_at).num_seconds().max(0) as u64
    }

    /// Seconds into the track at `now`, clamped to the track bounds.
    pub fn progress_secs(&self, now: DateTime<Utc>) -> u64 {
        let duration = self.duration_secs() as i64;
        (now - self.started_at).num_seconds().clamp(0, duration) as u64
    }
}

/// Renderable now-playing embed content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NowPlayingCard {
    pub title: String,
    pub body: String,
    pub color: u32,
    pub thumbnail_url: Option<String>,
    pub profile_url: String,
}

/// Build the now-playing card for an activity.
///
/// `profile_url` is the user's stored Spotify profile link; when absent the
/// card links to the track instead.
pub fn build_card(
    activity: &ListeningActivity,
    artist: &TrackArtist,
    profile_url: Option<String>,
    now: DateTime<Utc>,
) -> NowPlayingCard {
    let track_url = activity.track_url();
    let progress = activity.progress_secs(now);
    let duration = activity.duration_secs();
    let bar = progress_bar(progress, duration, PROGRESS_BAR_LENGTH);

    let body = format!(
        "[**{}**]({})\n\n[**{}**]({}) \u{2022} {}\n\n{} `{}/{}`",
        activity.title,
        track_url,
        artist.name,
        artist.url,
        activity.album,
        bar,
        format_track_time(progress),
        format_track_time(duration),
    );

    NowPlayingCard {
        title: "Now Playing".to_string(),
        body,
        color: NOW_PLAYING_COLOR,
        thumbnail_url: activity.album_cover_url.clone(),
        profile_url: profile_url.unwrap_or(track_url),
    }
}

/// Render a track progress bar with a knob at the current position.
pub fn progress_bar(progress_secs: u64, duration_secs: u64, length: usize) -> String {
    if length == 0 {
        return String::new();
    }

    let filled = if duration_secs == 0 {
        0
    } else {
        ((progress_secs as f64 / duration_secs as f64) * length as f64) as usize
    };
    let filled = filled.min(length.saturating_sub(1));

    format!(
        "{}\u{1F518}{}",
        "\u{25AC}".repeat(filled),
        "\u{25AC}".repeat(length - filled - 1)
    )
}

/// Format seconds as `m:ss`.
pub fn format_track_time(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}
