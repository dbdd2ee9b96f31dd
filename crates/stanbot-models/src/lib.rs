//! Shared data models for the stanbot backend.
//!
//! This crate provides the types every other crate agrees on:
//! - User identifiers
//! - Uploaded media attachments and their resolved kind
//! - Social link rewriting for embed-friendly mirrors

pub mod ids;
pub mod links;
pub mod media;

// Re-export common types
pub use ids::UserId;
pub use links::{fix_social_link, FixedLink, LinkSource};
pub use media::{MediaKind, MediaUpload};
