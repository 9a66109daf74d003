//! Icons behind a content-addressed reference.
//!
//! The CID in the declared URL is probed across the configured gateways and
//! the winner's content fetched once. Images are used as is. JSON is read for
//! a `tokenIcon`, and PS007 NFT documents that point at a `payloadCid` get the
//! placeholder since those payloads are not served by public gateways.
//! Directory listings on known gateways are followed to their `data.json`.

use async_trait::async_trait;
use serde_json::Value;

use tokicon_core::{FailureKind, IconDescriptor, TokenRef};

use super::{ResolveContext, ResolveError, Resolver};
use crate::gateway::extract_cid;

const CONTENT_ACCEPT: &str = "application/json, image/*, */*";
const JSON_ACCEPT: &str = "application/json";

pub struct ContentAddressResolver;

/// Source tags for icons found in a JSON document.
struct JsonTags {
    payload_placeholder: &'static str,
    token_icon: &'static str,
}

const DIRECT_JSON: JsonTags = JsonTags { payload_placeholder: "nft-ps007-payload-unavailable", token_icon: "ipfs-json-icon" };
const LISTING_JSON: JsonTags =
    JsonTags { payload_placeholder: "nft-tokentiger-ps007-placeholder", token_icon: "tokentiger-json-icon" };

impl ContentAddressResolver {
    fn from_document(document: &Value, ctx: &ResolveContext, tags: &JsonTags) -> Option<IconDescriptor> {
        let is_ps007 = document.get("schema").and_then(Value::as_str).is_some_and(|s| s.starts_with("ps007"));
        let has_payload = document.get("payloadCid").is_some_and(|p| !p.is_null());
        if is_ps007 && has_payload {
            return Some(IconDescriptor::placeholder(ctx.config.placeholder_icon.clone(), tags.payload_placeholder));
        }

        document
            .get("tokenIcon")
            .and_then(Value::as_str)
            .filter(|icon| !icon.trim().is_empty())
            .map(|icon| IconDescriptor::raster(icon.trim(), tags.token_icon))
    }

    fn is_listing_host(url: &str, hosts: &[String]) -> bool {
        url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .is_some_and(|host| hosts.iter().any(|h| host.eq_ignore_ascii_case(h)))
    }

    /// Follow a gateway directory listing to its `data.json`. Failures are not reported.
    async fn listing_document(&self, listing_url: &str, ctx: &ResolveContext) -> Option<IconDescriptor> {
        let url = format!("{}/data.json", listing_url.trim_end_matches('/'));
        let timeout = ResolveContext::timeout(ctx.config.timeouts.content_ms);
        let response = match ctx.transport.get(&url, JSON_ACCEPT, timeout).await {
            Ok(response) if response.is_success() => response,
            Ok(_) => return None,
            Err(e) => {
                tracing::debug!(url, error = %e, "listing data.json unavailable");
                return None;
            }
        };
        let document: Value = serde_json::from_slice(&response.body).ok()?;
        Self::from_document(&document, ctx, &LISTING_JSON)
    }
}

#[async_trait]
impl Resolver for ContentAddressResolver {
    fn name(&self) -> &'static str {
        "ipfs"
    }

    async fn attempt(&self, token: &TokenRef, ctx: &ResolveContext) -> Result<Option<IconDescriptor>, ResolveError> {
        let Some(cid) = token.url().and_then(extract_cid) else {
            return Ok(None);
        };

        let hit = ctx
            .prober
            .probe(cid)
            .await
            .map_err(|kind| ResolveError::new(kind, format!("no gateway serves {cid}")))?;

        let timeout = ResolveContext::timeout(ctx.config.timeouts.content_ms);
        let response = ctx.transport.get(&hit.url, CONTENT_ACCEPT, timeout).await?;
        if !response.is_success() {
            return Ok(None);
        }

        let content_type = response.content_type();
        if content_type.starts_with("image/") {
            return Ok(Some(IconDescriptor::raster(hit.url, "ipfs-direct-image")));
        }

        if content_type.contains("text/html")
            && Self::is_listing_host(&hit.url, &ctx.config.listing_gateway_hosts)
            && let Some(found) = self.listing_document(&hit.url, ctx).await
        {
            return Ok(Some(found));
        }

        if content_type.contains("json") {
            let document: Value = serde_json::from_slice(&response.body)
                .map_err(|e| ResolveError::new(FailureKind::InvalidMetadata, e.to_string()))?;
            return Ok(Self::from_document(&document, ctx, &DIRECT_JSON));
        }

        Ok(None)
    }
}
