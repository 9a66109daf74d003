//! Rewrites content-addressed icon references onto a gateway.
//!
//! A metadata `tokenIcon` is either a URL string or a media object
//! `{ "default": <url>, "ipfs": { "cid": <cid>, "path": <path> } }`.

use serde_json::Value;

use crate::gateway::extract_cid;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("media object has no default property")]
    MissingDefault,

    #[error("icon is neither a string nor an object")]
    UnsupportedShape,
}

/// Normalize `icon`. `rewrite(cid, path)` builds the gateway URL for a CID.
///
/// Strings without a CID, and strings that are not URLs, pass through unchanged.
pub fn normalize_icon(icon: &Value, rewrite: &dyn Fn(&str, &str) -> String) -> Result<String, NormalizeError> {
    match icon {
        Value::String(entry) => Ok(normalize_str(entry, rewrite)),
        Value::Object(media) => {
            let default = media.get("default").filter(|d| !d.is_null()).ok_or(NormalizeError::MissingDefault)?;

            match media.get("ipfs").and_then(Value::as_object) {
                Some(ipfs) => {
                    let Some(cid) = ipfs.get("cid").and_then(Value::as_str) else {
                        return normalize_icon(default, rewrite);
                    };
                    let cid = cid.strip_prefix("ipfs://").unwrap_or(cid);
                    let path = ipfs.get("path").and_then(Value::as_str).unwrap_or_default();
                    Ok(rewrite(cid, path))
                }
                None => normalize_icon(default, rewrite),
            }
        }
        _ => Err(NormalizeError::UnsupportedShape),
    }
}

fn normalize_str(entry: &str, rewrite: &dyn Fn(&str, &str) -> String) -> String {
    let Some(cid) = extract_cid(entry) else {
        return entry.to_string();
    };
    let Ok(url) = url::Url::parse(entry) else {
        return entry.to_string();
    };
    let path = url.path().rsplit(cid).next().unwrap_or_default();
    rewrite(cid, path)
}

/// The URL an icon declares before normalization: the string itself, or the
/// media object's `default`.
pub fn declared_url(icon: &Value) -> Option<&str> {
    match icon {
        Value::String(s) => Some(s.as_str()),
        Value::Object(media) => media.get("default").and_then(declared_url),
        _ => None,
    }
}

/// Directory-form rewrite onto `gateway` (a host plus optional path prefix, no scheme).
pub fn directory_url(gateway: &str, cid: &str, path: &str) -> String {
    format!("https://{}/ipfs/{cid}{path}", gateway.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const V0: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";
    const V1: &str = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi";

    fn gw(cid: &str, path: &str) -> String {
        directory_url("files.tokentiger.com/ipfs/view", cid, path)
    }

    #[test]
    fn test_string_with_cid_rewritten() {
        let icon = json!(format!("https://gateway.pinata.cloud/ipfs/{V0}/icon.png"));
        assert_eq!(
            normalize_icon(&icon, &gw).unwrap(),
            format!("https://files.tokentiger.com/ipfs/view/ipfs/{V0}/icon.png")
        );
    }

    #[test]
    fn test_ipfs_scheme_rewritten() {
        let icon = json!(format!("ipfs://{V1}/logo.svg"));
        assert_eq!(normalize_icon(&icon, &gw).unwrap(), format!("https://files.tokentiger.com/ipfs/view/ipfs/{V1}/logo.svg"));
    }

    #[test]
    fn test_string_without_cid_passes_through() {
        let icon = json!("https://example.com/icon.png");
        assert_eq!(normalize_icon(&icon, &gw).unwrap(), "https://example.com/icon.png");
    }

    #[test]
    fn test_bare_cid_passes_through() {
        let icon = json!(V0);
        assert_eq!(normalize_icon(&icon, &gw).unwrap(), V0);
    }

    #[test]
    fn test_media_object_with_ipfs() {
        let icon = json!({ "default": "https://example.com/a.png", "ipfs": { "cid": format!("ipfs://{V1}"), "path": "/a.png" } });
        assert_eq!(normalize_icon(&icon, &gw).unwrap(), format!("https://files.tokentiger.com/ipfs/view/ipfs/{V1}/a.png"));
    }

    #[test]
    fn test_media_object_recurses_into_default() {
        let icon = json!({ "default": format!("https://ipfs.io/ipfs/{V0}") });
        assert_eq!(normalize_icon(&icon, &gw).unwrap(), format!("https://files.tokentiger.com/ipfs/view/ipfs/{V0}"));
    }

    #[test]
    fn test_media_object_without_default_fails() {
        let icon = json!({ "ipfs": { "cid": V1, "path": "" } });
        assert_eq!(normalize_icon(&icon, &gw), Err(NormalizeError::MissingDefault));
    }

    #[test]
    fn test_unsupported_shape() {
        assert_eq!(normalize_icon(&json!(42), &gw), Err(NormalizeError::UnsupportedShape));
    }

    #[test]
    fn test_declared_url() {
        assert_eq!(declared_url(&json!("https://x.test/a.png")), Some("https://x.test/a.png"));
        assert_eq!(declared_url(&json!({ "default": "https://x.test/b.png" })), Some("https://x.test/b.png"));
        assert_eq!(declared_url(&json!(null)), None);
    }
}
