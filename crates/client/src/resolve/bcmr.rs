//! Bitcoin Cash Metadata Registry (BCMR) lookups.

use serde_json::Value;

use tokicon_core::{FailureKind, IconDescriptor};

use super::{FailureTally, ResolveContext};

pub const SOURCE_TAG: &str = "bcmr";

/// Icon URI from a registry document, top-level `uris.icon` first, then `token.uris.icon`.
pub fn registry_icon(document: &Value) -> Option<&str> {
    let top = document.pointer("/uris/icon");
    let nested = document.pointer("/token/uris/icon");
    top.into_iter()
        .chain(nested)
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|icon| !icon.is_empty())
}

/// Ask each configured registry in order. Failures go to `tally`.
pub(crate) async fn lookup(token_id: &str, ctx: &ResolveContext, tally: &mut FailureTally) -> Option<IconDescriptor> {
    let timeout = ResolveContext::timeout(ctx.config.timeouts.registry_ms);
    for endpoint in &ctx.config.registry_endpoints {
        let url = format!("{}/{token_id}", endpoint.trim_end_matches('/'));
        let response = match ctx.transport.get(&url, "application/json", timeout).await {
            Ok(response) if response.is_success() => response,
            Ok(_) => continue,
            Err(e) => {
                tally.note(e.kind());
                continue;
            }
        };

        match serde_json::from_slice::<Value>(&response.body) {
            Ok(document) => {
                if let Some(icon) = registry_icon(&document) {
                    return Some(IconDescriptor::raster(icon, SOURCE_TAG));
                }
            }
            Err(e) => {
                tracing::debug!(url, error = %e, "registry returned malformed JSON");
                tally.note(FailureKind::InvalidMetadata);
            }
        }
    }
    None
}
