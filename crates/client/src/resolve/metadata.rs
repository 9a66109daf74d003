//! Mutable-metadata (PS007) icons.
//!
//! The token's metadata document may declare a `tokenIcon`. Content-addressed
//! references are rewritten onto a gateway, preferring one the prober already
//! found for that CID, and the result is confirmed with a HEAD before use. When
//! the rewritten URL does not answer, the URL as declared is tried next.

use async_trait::async_trait;

use tokicon_core::{FailureKind, IconDescriptor, TokenRef};

use super::normalize::{declared_url, directory_url, normalize_icon};
use super::{FailureTally, ResolveContext, ResolveError, Resolver};

pub struct MetadataSchemaResolver;

impl MetadataSchemaResolver {
    fn gateway_rewrite(ctx: &ResolveContext, cid: &str, path: &str) -> String {
        match ctx.prober.cached(cid) {
            Some(hit) => format!("{}{path}", hit.url.trim_end_matches('/')),
            None => directory_url(&ctx.config.normalize_gateway, cid, path),
        }
    }
}

#[async_trait]
impl Resolver for MetadataSchemaResolver {
    fn name(&self) -> &'static str {
        "ps007"
    }

    async fn attempt(&self, token: &TokenRef, ctx: &ResolveContext) -> Result<Option<IconDescriptor>, ResolveError> {
        let Some(client) = ctx.metadata.as_ref() else {
            return Ok(None);
        };

        let timeout = ResolveContext::timeout(ctx.config.timeouts.metadata_ms);
        let document = match tokio::time::timeout(timeout, client.get_data(&token.token_id)).await {
            Err(_) => return Err(ResolveError::new(FailureKind::Timeout, "metadata lookup timed out")),
            Ok(Err(e)) => return Err(ResolveError::new(FailureKind::Network, e.to_string())),
            Ok(Ok(document)) => document,
        };

        let Some(icon) = document.token_icon() else {
            return Ok(None);
        };

        let rewrite = |cid: &str, path: &str| Self::gateway_rewrite(ctx, cid, path);
        let normalized =
            normalize_icon(icon, &rewrite).map_err(|e| ResolveError::new(FailureKind::InvalidMetadata, e.to_string()))?;
        if normalized.is_empty() {
            return Ok(None);
        }

        let mut candidates = vec![normalized.as_str()];
        if let Some(original) = declared_url(icon).map(str::trim)
            && !original.is_empty()
            && original != normalized
        {
            candidates.push(original);
        }

        let mut tally = FailureTally::default();
        for candidate in candidates {
            match ctx.head_ok(candidate, ctx.config.timeouts.validate_ms).await {
                Ok(true) => return Ok(Some(IconDescriptor::raster(candidate, self.name()))),
                Ok(false) => tracing::debug!(token_id = %token.token_id, url = candidate, "metadata icon not reachable"),
                Err(e) => tally.note(e.kind()),
            }
        }
        tally.into_result("metadata icon")
    }
}
