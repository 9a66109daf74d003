//! URL canonicalization and the CORS-hostile domain check.

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize an http(s) URL before it is requested.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Reject anything that is not http or https
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = url::Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_lowercase();
        parsed.set_host(Some(&lowered)).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Whether `url` points at a host that never serves icons to us.
///
/// Matches when the hostname contains any entry of `blocked`, so subdomains are
/// covered. Unparseable input is not considered blocked.
pub fn is_blocked_domain(url: &str, blocked: &[String]) -> bool {
    let Ok(parsed) = url::Url::parse(url.trim()) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    blocked.iter().any(|domain| !domain.is_empty() && host.contains(domain.to_ascii_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocklist() -> Vec<String> {
        vec!["tokens.bch.sx".into(), "bch.sx".into(), "simpleledger.cash".into()]
    }

    #[test]
    fn test_canonicalize_basic() {
        let url = canonicalize("https://example.com").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_canonicalize_lowercase_host() {
        let url = canonicalize("https://CDN.JSDELIVR.NET/gh/a/b.png").unwrap();
        assert_eq!(url.host_str(), Some("cdn.jsdelivr.net"));
        assert_eq!(url.path(), "/gh/a/b.png");
    }

    #[test]
    fn test_canonicalize_remove_fragment_keep_query() {
        let url = canonicalize("https://example.com/icon.png?v=2#top").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.query(), Some("v=2"));
    }

    #[test]
    fn test_canonicalize_unsupported_scheme() {
        assert!(matches!(canonicalize("ipfs://QmHash"), Err(UrlError::UnsupportedScheme(_))));
        assert!(matches!(canonicalize("file:///etc/passwd"), Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(matches!(canonicalize("   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_canonicalize_relative_rejected() {
        assert!(matches!(canonicalize("example.com/icon.png"), Err(UrlError::InvalidUrl(_))));
    }

    #[test]
    fn test_blocked_domain_matches_subdomains() {
        assert!(is_blocked_domain("https://tokens.bch.sx/250/abc.png", &blocklist()));
        assert!(is_blocked_domain("https://icons.simpleledger.cash/x.png", &blocklist()));
        assert!(is_blocked_domain("https://BCH.SX/x.png", &blocklist()));
    }

    #[test]
    fn test_blocked_domain_negative() {
        assert!(!is_blocked_domain("https://cdn.jsdelivr.net/gh/x.png", &blocklist()));
        assert!(!is_blocked_domain("not a url", &blocklist()));
        assert!(!is_blocked_domain("https://example.com", &[]));
    }
}
