//! Social link rewriting for chat messages.
//!
//! Discord does not embed Twitter/X, Instagram, or Reddit links natively
//! anymore, so we rewrite them to mirror hosts that serve proper embeds.
//! Only the first matching link in a message is rewritten; matching is
//! attempted in a fixed order (Twitter, then Instagram, then Reddit).

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static TWITTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(?:www\.)?(x\.com|twitter\.com)/(\w+)/status/(\d+)").unwrap()
});

static INSTAGRAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://(?:www\.)?instagram\.com/\S+").unwrap());

static REDDIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://(?:www\.)?reddit\.com/\S+").unwrap());

/// Which platform a rewritten link came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkSource {
    Twitter,
    Instagram,
    Reddit,
}

/// A link rewritten to an embed-friendly mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedLink {
    /// Ready-to-post markdown, e.g. `[Reddit](https://rxddit.com/...)`.
    pub markdown: String,
    /// The rewritten URL on its own.
    pub fixed_url: String,
    pub source: LinkSource,
}

/// Scan message content for the first social link we know how to fix and
/// return its embed-friendly replacement. Returns `None` when nothing in the
/// message needs rewriting.
pub fn fix_social_link(content: &str) -> Option<FixedLink> {
    if let Some(caps) = TWITTER_RE.captures(content) {
        let host = &caps[1];
        let username = &caps[2];
        let fixed_url = caps[0].replacen(host, "fixupx.com", 1);
        return Some(FixedLink {
            markdown: format!("[Twitter \u{2022} @{username}]({fixed_url})"),
            fixed_url,
            source: LinkSource::Twitter,
        });
    }

    if let Some(m) = INSTAGRAM_RE.find(content) {
        // Tracking query params break the mirror, drop them first.
        let stripped = m.as_str().split('?').next().unwrap_or(m.as_str());
        let fixed_url = stripped.replacen("instagram.com", "g.embedez.com", 1);
        return Some(FixedLink {
            markdown: format!("[Instagram]({fixed_url})"),
            fixed_url,
            source: LinkSource::Instagram,
        });
    }

    if let Some(m) = REDDIT_RE.find(content) {
        let fixed_url = m.as_str().replacen("reddit.com", "rxddit.com", 1);
        return Some(FixedLink {
            markdown: format!("[Reddit]({fixed_url})"),
            fixed_url,
            source: LinkSource::Reddit,
        });
    }

    None
}
