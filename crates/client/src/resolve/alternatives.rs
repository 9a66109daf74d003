//! Last-resort icon sources keyed only by token id.
//!
//! Metadata registries are asked first, then community icon repositories
//! through jsDelivr and finally through GitHack. Each mirror is HEAD-checked.

use async_trait::async_trait;

use tokicon_core::{IconDescriptor, TokenRef};

use super::{FailureTally, ResolveContext, ResolveError, Resolver, bcmr};

pub struct AlternativeSourceResolver;

impl AlternativeSourceResolver {
    async fn first_mirror(
        token_id: &str, mirrors: &[String], tag: &'static str, ctx: &ResolveContext, tally: &mut FailureTally,
    ) -> Option<IconDescriptor> {
        for base in mirrors {
            let url = format!("{}/{}/{token_id}.png", base.trim_end_matches('/'), ctx.config.mirror_icon_size);
            match ctx.head_ok(&url, ctx.config.timeouts.mirror_ms).await {
                Ok(true) => return Some(IconDescriptor::raster(url, tag)),
                Ok(false) => {}
                Err(e) => tally.note(e.kind()),
            }
        }
        None
    }
}

#[async_trait]
impl Resolver for AlternativeSourceResolver {
    fn name(&self) -> &'static str {
        "alternatives"
    }

    async fn attempt(&self, token: &TokenRef, ctx: &ResolveContext) -> Result<Option<IconDescriptor>, ResolveError> {
        let token_id = token.token_id.as_str();
        let mut tally = FailureTally::default();

        if let Some(found) = bcmr::lookup(token_id, ctx, &mut tally).await {
            return Ok(Some(found));
        }
        if let Some(found) = Self::first_mirror(token_id, &ctx.config.jsdelivr_mirrors, "jsdelivr", ctx, &mut tally).await {
            return Ok(Some(found));
        }
        if let Some(found) = Self::first_mirror(token_id, &ctx.config.githack_mirrors, "githack", ctx, &mut tally).await {
            return Ok(Some(found));
        }

        tally.into_result("alternative sources")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use crate::resolve::test_support::context;
    use crate::testing::FakeTransport;
    use std::sync::Arc;
    use std::time::Duration;
    use tokicon_core::FailureKind;

    const BCMR: &str = "https://bcmr.paytaca.com/api/tokens/tok1";
    const JSDELIVR_2: &str = "https://cdn.jsdelivr.net/gh/Bitcoin-com/bch-token-icons@master/128/tok1.png";
    const GITHACK_1: &str = "https://raw.githack.com/kosinusbch/slp-token-icons/master/128/tok1.png";

    fn token() -> TokenRef {
        TokenRef::new("tok1", None, 64)
    }

    #[tokio::test]
    async fn test_registry_wins() {
        let transport = Arc::new(FakeTransport::new());
        transport.get_ok(BCMR, "application/json", r#"{"uris":{"icon":"https://x.test/bcmr.png"}}"#).head_ok(JSDELIVR_2);
        let ctx = context(transport.clone());

        let found = AlternativeSourceResolver.attempt(&token(), &ctx).await.unwrap().unwrap();
        assert_eq!(found.payload, "https://x.test/bcmr.png");
        assert_eq!(found.source_tag, "bcmr");
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_jsdelivr_mirrors_in_order() {
        let transport = Arc::new(FakeTransport::new());
        transport.head_ok(JSDELIVR_2).head_ok(GITHACK_1);
        let ctx = context(transport.clone());

        let found = AlternativeSourceResolver.attempt(&token(), &ctx).await.unwrap().unwrap();
        assert_eq!(found.payload, JSDELIVR_2);
        assert_eq!(found.source_tag, "jsdelivr");
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn test_githack_after_jsdelivr() {
        let transport = Arc::new(FakeTransport::new());
        transport.head_ok(GITHACK_1);
        let ctx = context(transport);

        let found = AlternativeSourceResolver.attempt(&token(), &ctx).await.unwrap().unwrap();
        assert_eq!(found.source_tag, "githack");
    }

    #[tokio::test]
    async fn test_nothing_found_is_not_a_failure() {
        let ctx = context(Arc::new(FakeTransport::new()));
        assert_eq!(AlternativeSourceResolver.attempt(&token(), &ctx).await, Ok(None));
    }

    #[tokio::test]
    async fn test_failures_reported_most_specific() {
        let transport = Arc::new(FakeTransport::new());
        transport
            .get_err(BCMR, FetchError::Connect("refused".into()))
            .head_err(JSDELIVR_2, FetchError::Timeout(Duration::from_secs(3)));
        let ctx = context(transport);

        let err = AlternativeSourceResolver.attempt(&token(), &ctx).await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Timeout);
    }
}
