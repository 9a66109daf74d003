//! NFT marketplace icons for `juungle:` URLs.
//!
//! The marketplace serves icons at `{base}/{group}/{token}`, where the group is
//! the token the NFT was minted from. The group comes from the wallet.

use async_trait::async_trait;

use tokicon_core::{FailureKind, IconDescriptor, TokenRef};

use super::{ResolveContext, ResolveError, Resolver};

pub struct NftApiResolver;

#[async_trait]
impl Resolver for NftApiResolver {
    fn name(&self) -> &'static str {
        "juungle"
    }

    async fn attempt(&self, token: &TokenRef, ctx: &ResolveContext) -> Result<Option<IconDescriptor>, ResolveError> {
        let applies = token.url().is_some_and(|u| u.to_ascii_lowercase().starts_with("juungle:"));
        let (true, Some(wallet)) = (applies, ctx.wallet.as_ref()) else {
            return Ok(None);
        };

        let timeout = ResolveContext::timeout(ctx.config.timeouts.metadata_ms);
        let data = match tokio::time::timeout(timeout, wallet.get_token_data(&token.token_id)).await {
            Err(_) => return Err(ResolveError::new(FailureKind::Timeout, "token data lookup timed out")),
            Ok(Err(e)) => return Err(ResolveError::new(FailureKind::Network, e.to_string())),
            Ok(Ok(data)) => data,
        };
        let Some(group) = data.parent_group_id.filter(|g| !g.is_empty()) else {
            return Err(ResolveError::new(FailureKind::InvalidMetadata, "NFT has no parent group"));
        };

        let url = format!("{}/{group}/{}", ctx.config.nft_api_base.trim_end_matches('/'), token.token_id);
        if ctx.head_ok(&url, ctx.config.timeouts.http_head_ms).await? {
            return Ok(Some(IconDescriptor::raster(url, self.name())));
        }
        Ok(None)
    }
}
