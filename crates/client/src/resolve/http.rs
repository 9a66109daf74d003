//! Plain http(s) icon URLs, confirmed with a HEAD.

use async_trait::async_trait;

use tokicon_core::{FailureKind, IconDescriptor, TokenRef};

use super::{ResolveContext, ResolveError, Resolver};
use crate::fetch::{canonicalize, check_url_host, is_blocked_domain};

pub struct HttpResolver;

#[async_trait]
impl Resolver for HttpResolver {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn attempt(&self, token: &TokenRef, ctx: &ResolveContext) -> Result<Option<IconDescriptor>, ResolveError> {
        let Some(declared) = token.url() else {
            return Ok(None);
        };
        let lower = declared.to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Ok(None);
        }

        let Ok(url) = canonicalize(declared) else {
            return Ok(None);
        };
        if is_blocked_domain(url.as_str(), &ctx.config.blocked_domains) {
            tracing::debug!(token_id = %token.token_id, host = url.host_str().unwrap_or_default(), "skipping blocked icon domain");
            return Err(ResolveError::new(FailureKind::Cors, "icon domain is blocked"));
        }
        if check_url_host(&url).is_err() {
            return Ok(None);
        }

        let url = url.to_string();
        if ctx.head_ok(&url, ctx.config.timeouts.http_head_ms).await? {
            return Ok(Some(IconDescriptor::raster(url, self.name())));
        }
        Ok(None)
    }
}
