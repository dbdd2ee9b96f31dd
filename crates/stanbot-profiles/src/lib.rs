//! Stored Spotify profile links for the stanbot backend.

pub mod client;
pub mod error;

pub use client::{
    validate_profile_link, ProfileConfig, ProfileStore, SPOTIFY_PROFILE_PREFIX,
};
pub use error::{ProfileError, ProfileResult};
