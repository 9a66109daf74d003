//! Icon lookup data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::FailureKind;

/// Source tag carried by the placeholder handed out after a failed or skipped lookup.
pub const PLACEHOLDER_TAG: &str = "placeholder";

/// A token to find an icon for, plus the hints the caller has about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRef {
    pub token_id: String,
    pub declared_url: Option<String>,
    pub display_size: u32,
}

impl TokenRef {
    pub fn new(token_id: impl Into<String>, declared_url: Option<String>, display_size: u32) -> Self {
        Self { token_id: token_id.into(), declared_url, display_size }
    }

    /// Declared URL with surrounding whitespace removed; `None` when absent or blank.
    pub fn url(&self) -> Option<&str> {
        self.declared_url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

/// How an icon payload is meant to be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RenderKind {
    /// `payload` is a URL to load as an image.
    RasterUrl,
    /// `payload` is markup (SVG) to embed directly.
    InlineMarkup,
}

/// A resolved icon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct IconDescriptor {
    pub payload: String,
    pub render_kind: RenderKind,
    /// Which resolver produced the icon.
    pub source_tag: String,
    pub fetched_at: DateTime<Utc>,
    /// True when `payload` is the placeholder icon rather than a real one.
    #[serde(default)]
    pub placeholder: bool,
}

impl IconDescriptor {
    pub fn raster(url: impl Into<String>, source_tag: impl Into<String>) -> Self {
        Self {
            payload: url.into(),
            render_kind: RenderKind::RasterUrl,
            source_tag: source_tag.into(),
            fetched_at: Utc::now(),
            placeholder: false,
        }
    }

    pub fn markup(markup: impl Into<String>, source_tag: impl Into<String>) -> Self {
        Self {
            payload: markup.into(),
            render_kind: RenderKind::InlineMarkup,
            source_tag: source_tag.into(),
            fetched_at: Utc::now(),
            placeholder: false,
        }
    }

    /// A placeholder that some resolver chose deliberately, e.g. for an NFT payload
    /// known to be unavailable. It is cached like any other result.
    pub fn placeholder(placeholder_icon: impl Into<String>, source_tag: impl Into<String>) -> Self {
        Self { placeholder: true, ..Self::raster(placeholder_icon, source_tag) }
    }

    /// The placeholder handed out when no resolver produced anything.
    pub fn fallback(placeholder_icon: impl Into<String>) -> Self {
        Self::placeholder(placeholder_icon, PLACEHOLDER_TAG)
    }
}

/// A cached descriptor and the moment it stops being served.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub descriptor: IconDescriptor,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Attempt bookkeeping for one token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureRecord {
    pub attempt_count: u32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub permanently_failed: bool,
    pub last_error_kind: Option<FailureKind>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_url_trims_blank() {
        let token = TokenRef::new("abc", Some("   ".into()), 64);
        assert_eq!(token.url(), None);

        let token = TokenRef::new("abc", Some(" https://x.test/a.png ".into()), 64);
        assert_eq!(token.url(), Some("https://x.test/a.png"));
    }

    #[test]
    fn test_fallback_descriptor() {
        let d = IconDescriptor::fallback("/token-placeholder.svg");
        assert!(d.placeholder);
        assert_eq!(d.source_tag, PLACEHOLDER_TAG);
        assert_eq!(d.render_kind, RenderKind::RasterUrl);
    }

    #[test]
    fn test_entry_liveness_boundary() {
        let descriptor = IconDescriptor::raster("https://x.test/a.png", "http");
        let expires_at = descriptor.fetched_at + chrono::Duration::hours(24);
        let entry = CacheEntry { descriptor, expires_at };

        assert!(entry.is_live(expires_at - chrono::Duration::milliseconds(1)));
        assert!(!entry.is_live(expires_at));
    }
}
