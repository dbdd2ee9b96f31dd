//! Spotify Web API integration for the stanbot backend.
//!
//! This crate provides:
//! - Client-credentials token caching with single-flight refresh
//! - Track metadata lookups (first credited artist)
//! - Now-playing card rendering from presence data

pub mod client;
pub mod error;
pub mod now_playing;
pub mod token;

pub use client::{SpotifyClient, SpotifyConfig, TrackArtist, SPOTIFY_API_BASE};
pub use error::{SpotifyError, SpotifyResult};
pub use now_playing::{
    build_card, format_track_time, progress_bar, ListeningActivity, NowPlayingCard,
    NOW_PLAYING_COLOR, PROGRESS_BAR_LENGTH,
};
pub use token::{SpotifyCredentials, TokenCache, SPOTIFY_TOKEN_URL};
