//! Icon resolution orchestrator.
//!
//! [`IconService`] owns the resolver chain and drives one lookup per token:
//!
//! - a live cache entry is returned as is
//! - a token that is in flight, failed or debounced gets the placeholder
//! - otherwise resolvers run in priority order, each under a deadline, and the
//!   first hit is cached (and persisted when a store is attached)
//! - when every resolver comes up empty, the most specific failure kind is
//!   recorded and the placeholder returned
//!
//! A lookup never returns an error. Infrastructure operations (store sweeps,
//! warm start, wallet listing) do.

use std::sync::Arc;
use std::time::Duration;

use tokicon_core::wallet::{GenerativeRenderer, MutableMetadataClient, WalletHandle};
use tokicon_core::{AppConfig, CacheStats, Error, FailureKind, IconCache, IconDescriptor, StoreDb, TokenRef};

use crate::fetch::Transport;
use crate::gateway::GatewayProber;
use crate::render::IdenticonRenderer;
use crate::resolve::{ResolveContext, Resolver, default_chain};

/// Releases the in-flight marker of a lookup whose future was dropped before
/// it recorded an outcome.
struct InFlight {
    cache: Arc<IconCache>,
    token_id: String,
    settled: bool,
}

impl InFlight {
    fn new(cache: Arc<IconCache>, token_id: &str) -> Self {
        Self { cache, token_id: token_id.to_string(), settled: false }
    }

    fn settle(&mut self) {
        self.settled = true;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let cache = self.cache.clone();
            let token_id = std::mem::take(&mut self.token_id);
            handle.spawn(async move { cache.abandon_loading(&token_id).await });
        }
    }
}

pub struct IconService {
    cache: Arc<IconCache>,
    ctx: ResolveContext,
    resolvers: Vec<Box<dyn Resolver>>,
    store: Option<StoreDb>,
    deadline: Duration,
}

impl IconService {
    /// Service with the default resolver chain and the built-in identicon renderer.
    pub fn new(config: Arc<AppConfig>, transport: Arc<dyn Transport>, cache: Arc<IconCache>) -> Self {
        let prober = Arc::new(GatewayProber::from_config(transport.clone(), cache.clone(), &config));
        let deadline = Duration::from_millis(config.timeouts.resolver_deadline_ms);
        let ctx = ResolveContext {
            config,
            transport,
            prober,
            renderer: Arc::new(IdenticonRenderer),
            wallet: None,
            metadata: None,
        };
        Self { cache, ctx, resolvers: default_chain(), store: None, deadline }
    }

    pub fn with_wallet(mut self, wallet: Arc<dyn WalletHandle>) -> Self {
        self.ctx.wallet = Some(wallet);
        self
    }

    pub fn with_metadata_client(mut self, client: Arc<dyn MutableMetadataClient>) -> Self {
        self.ctx.metadata = Some(client);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn GenerativeRenderer>) -> Self {
        self.ctx.renderer = renderer;
        self
    }

    /// Persist successful lookups to `store` (subject to `persist_icons`).
    pub fn with_store(mut self, store: StoreDb) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the resolver chain.
    pub fn with_resolvers(mut self, resolvers: Vec<Box<dyn Resolver>>) -> Self {
        self.resolvers = resolvers;
        self
    }

    pub fn cache(&self) -> &Arc<IconCache> {
        &self.cache
    }

    pub fn prober(&self) -> &Arc<GatewayProber> {
        &self.ctx.prober
    }

    pub fn config(&self) -> &AppConfig {
        &self.ctx.config
    }

    fn fallback(&self) -> IconDescriptor {
        IconDescriptor::fallback(self.ctx.config.placeholder_icon.clone())
    }

    /// Find an icon for `token`. Always returns a descriptor; the placeholder
    /// stands in for anything that could not be resolved now.
    pub async fn resolve_icon(&self, token: &TokenRef) -> IconDescriptor {
        let token_id = token.token_id.as_str();
        if token_id.trim().is_empty() {
            return self.fallback();
        }

        if let Some(entry) = self.cache.get(token_id).await {
            return entry.descriptor;
        }

        if !self.cache.try_start_loading(token_id).await {
            tracing::debug!(token_id, "lookup skipped: in flight, failed or debounced");
            return self.fallback();
        }
        let mut in_flight = InFlight::new(self.cache.clone(), token_id);

        let mut worst: Option<FailureKind> = None;
        for resolver in &self.resolvers {
            let outcome = tokio::time::timeout(self.deadline, resolver.attempt(token, &self.ctx)).await;
            match outcome {
                Ok(Ok(Some(descriptor))) => {
                    self.cache.record_success(token_id, descriptor.clone()).await;
                    in_flight.settle();
                    tracing::info!(token_id, source = %descriptor.source_tag, "icon resolved");
                    self.persist(token_id).await;
                    return descriptor;
                }
                Ok(Ok(None)) => {
                    tracing::debug!(token_id, resolver = resolver.name(), "resolver found nothing");
                }
                Ok(Err(e)) => {
                    tracing::debug!(token_id, resolver = resolver.name(), kind = %e.kind, error = %e.message, "resolver failed");
                    worst = Some(FailureKind::most_specific(worst, e.kind));
                }
                Err(_) => {
                    tracing::debug!(token_id, resolver = resolver.name(), "resolver deadline exceeded");
                    worst = Some(FailureKind::most_specific(worst, FailureKind::Timeout));
                }
            }
        }

        let kind = worst.unwrap_or(FailureKind::Unknown);
        self.cache.record_failure(token_id, kind).await;
        in_flight.settle();
        tracing::info!(token_id, kind = %kind, "no icon found, using placeholder");
        self.fallback()
    }

    async fn persist(&self, token_id: &str) {
        let Some(store) = self.store.as_ref().filter(|_| self.ctx.config.persist_icons) else {
            return;
        };
        let Some(entry) = self.cache.get(token_id).await else {
            return;
        };
        if let Err(e) = store.save_icon(token_id, &entry).await {
            tracing::warn!(token_id, error = %e, "failed to persist icon");
        }
    }

    /// Resolve every token the wallet holds, one after another.
    pub async fn resolve_wallet_tokens(
        &self, wallet: &dyn WalletHandle, display_size: u32,
    ) -> Result<Vec<(String, IconDescriptor)>, Error> {
        let tokens = wallet.list_tokens().await?;
        let mut resolved = Vec::with_capacity(tokens.len());
        for summary in tokens {
            let token = TokenRef::new(summary.token_id, summary.url, display_size);
            let descriptor = self.resolve_icon(&token).await;
            resolved.push((token.token_id, descriptor));
        }
        Ok(resolved)
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Forget everything: cache state, gateway winners and persisted icons.
    pub async fn clear_cache(&self) -> Result<(), Error> {
        self.cache.clear().await;
        self.ctx.prober.clear();
        if let Some(store) = &self.store {
            let removed = store.clear_icons().await?;
            tracing::info!(removed, "cleared persisted icons");
        }
        Ok(())
    }

    /// Sweep expired entries from the cache and the store. Returns the number
    /// dropped from the cache.
    pub async fn cleanup(&self) -> Result<usize, Error> {
        let swept = self.cache.cleanup().await;
        if let Some(store) = &self.store {
            store.purge_expired_icons().await?;
        }
        if swept > 0 {
            tracing::debug!(swept, "expired icons swept");
        }
        Ok(swept)
    }

    /// Load persisted live icons into the cache. Returns how many were restored.
    pub async fn warm_from_store(&self) -> Result<usize, Error> {
        let Some(store) = &self.store else {
            return Ok(0);
        };
        let mut restored = 0;
        for (token_id, entry) in store.load_live_icons().await? {
            if self.cache.restore(&token_id, entry).await {
                restored += 1;
            }
        }
        tracing::info!(restored, "icon cache warmed from store");
        Ok(restored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::ResolveError;
    use crate::testing::FakeTransport;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokicon_core::wallet::{TokenData, TokenSummary};
    use tokio::sync::Notify;

    enum Outcome {
        Found,
        Nothing,
        Fail(FailureKind),
        Hang,
        Gate { entered: Arc<Notify>, release: Arc<Notify> },
    }

    struct Scripted {
        name: &'static str,
        outcome: Outcome,
        calls: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn boxed(name: &'static str, outcome: Outcome) -> (Box<dyn Resolver>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (Box::new(Self { name, outcome, calls: calls.clone() }), calls)
        }
    }

    #[async_trait]
    impl Resolver for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn attempt(&self, token: &TokenRef, _ctx: &ResolveContext) -> Result<Option<IconDescriptor>, ResolveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let found = || Some(IconDescriptor::raster(format!("https://x.test/{}.png", token.token_id), self.name));
            match &self.outcome {
                Outcome::Found => Ok(found()),
                Outcome::Nothing => Ok(None),
                Outcome::Fail(kind) => Err(ResolveError::new(*kind, "scripted")),
                Outcome::Hang => {
                    tokio::time::sleep(Duration::from_secs(3_600)).await;
                    Ok(found())
                }
                Outcome::Gate { entered, release } => {
                    entered.notify_one();
                    release.notified().await;
                    Ok(found())
                }
            }
        }
    }

    fn service(transport: Arc<FakeTransport>) -> IconService {
        let config = Arc::new(AppConfig::default());
        let cache = Arc::new(IconCache::new(config.cache_policy()));
        IconService::new(config, transport, cache)
    }

    fn token(id: &str, url: Option<&str>) -> TokenRef {
        TokenRef::new(id, url.map(str::to_string), 64)
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let (first, _) = Scripted::boxed("first", Outcome::Nothing);
        let (second, second_calls) = Scripted::boxed("second", Outcome::Found);
        let (third, third_calls) = Scripted::boxed("third", Outcome::Found);
        let service = service(Arc::new(FakeTransport::new())).with_resolvers(vec![first, second, third]);

        let found = service.resolve_icon(&token("tok1", None)).await;
        assert_eq!(found.source_tag, "second");
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
        assert_eq!(third_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_second_lookup_served_from_cache() {
        let transport = Arc::new(FakeTransport::new());
        transport.head_ok("https://example.com/icon.png");
        let service = service(transport.clone());
        let token = token("tok1", Some("https://example.com/icon.png"));

        let first = service.resolve_icon(&token).await;
        let second = service.resolve_icon(&token).await;
        assert_eq!(first.source_tag, "http");
        assert_eq!(first, second);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_records_most_specific_failure() {
        let (a, _) = Scripted::boxed("a", Outcome::Fail(FailureKind::Network));
        let (b, _) = Scripted::boxed("b", Outcome::Fail(FailureKind::Dns));
        let (c, c_calls) = Scripted::boxed("c", Outcome::Fail(FailureKind::Timeout));
        let service = service(Arc::new(FakeTransport::new())).with_resolvers(vec![a, b, c]);

        let found = service.resolve_icon(&token("tok1", None)).await;
        assert!(found.placeholder);
        assert_eq!(found.payload, "/token-placeholder.svg");

        let record = service.cache().failure_record("tok1").await.unwrap();
        assert!(record.permanently_failed);
        assert_eq!(record.last_error_kind, Some(FailureKind::Dns));

        // Permanently failed: no further attempts.
        assert!(service.resolve_icon(&token("tok1", None)).await.placeholder);
        assert_eq!(c_calls.load(Ordering::SeqCst), 1);

        let stats = service.cache_stats().await;
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.error_types.get("dns"), Some(&1));
    }

    #[tokio::test]
    async fn test_empty_token_id_gets_placeholder() {
        let (only, calls) = Scripted::boxed("only", Outcome::Found);
        let service = service(Arc::new(FakeTransport::new())).with_resolvers(vec![only]);

        assert!(service.resolve_icon(&token("  ", None)).await.placeholder);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_gets_placeholder() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let (gate, calls) = Scripted::boxed("gate", Outcome::Gate { entered: entered.clone(), release: release.clone() });
        let service = Arc::new(service(Arc::new(FakeTransport::new())).with_resolvers(vec![gate]));

        let first = tokio::spawn({
            let service = service.clone();
            async move { service.resolve_icon(&token("tok1", None)).await }
        });
        entered.notified().await;

        let duplicate = service.resolve_icon(&token("tok1", None)).await;
        assert!(duplicate.placeholder);

        release.notify_one();
        let resolved = first.await.unwrap();
        assert_eq!(resolved.source_tag, "gate");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.resolve_icon(&token("tok1", None)).await, resolved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolver_deadline_moves_on() {
        let (slow, _) = Scripted::boxed("slow", Outcome::Hang);
        let (next, _) = Scripted::boxed("next", Outcome::Found);
        let service = service(Arc::new(FakeTransport::new())).with_resolvers(vec![slow, next]);

        let found = service.resolve_icon(&token("tok1", None)).await;
        assert_eq!(found.source_tag, "next");
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_deadlines_record_timeout() {
        let (slow, _) = Scripted::boxed("slow", Outcome::Hang);
        let service = service(Arc::new(FakeTransport::new())).with_resolvers(vec![slow]);

        assert!(service.resolve_icon(&token("tok1", None)).await.placeholder);
        let record = service.cache().failure_record("tok1").await.unwrap();
        assert_eq!(record.last_error_kind, Some(FailureKind::Timeout));
    }

    #[tokio::test]
    async fn test_blocked_domain_never_requested() {
        let transport = Arc::new(FakeTransport::new());
        let service = service(transport.clone());

        let found = service.resolve_icon(&token("tok1", Some("https://tokens.bch.sx/250/tok1.png"))).await;
        assert!(found.placeholder);
        assert!(!transport.calls().iter().any(|call| call.contains("bch.sx")));

        let record = service.cache().failure_record("tok1").await.unwrap();
        assert_eq!(record.last_error_kind, Some(FailureKind::Cors));
    }

    #[tokio::test]
    async fn test_persist_then_warm_start() {
        let store = StoreDb::open_in_memory().await.unwrap();

        let (found, _) = Scripted::boxed("found", Outcome::Found);
        let first = service(Arc::new(FakeTransport::new())).with_store(store.clone()).with_resolvers(vec![found]);
        let resolved = first.resolve_icon(&token("tok1", None)).await;

        let (unused, unused_calls) = Scripted::boxed("unused", Outcome::Found);
        let second = service(Arc::new(FakeTransport::new())).with_store(store).with_resolvers(vec![unused]);
        assert_eq!(second.warm_from_store().await.unwrap(), 1);

        let warmed = second.resolve_icon(&token("tok1", None)).await;
        assert_eq!(warmed.payload, resolved.payload);
        assert_eq!(warmed.source_tag, "found");
        assert_eq!(unused_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_clear_cache_drops_persisted_icons() {
        let store = StoreDb::open_in_memory().await.unwrap();
        let (found, calls) = Scripted::boxed("found", Outcome::Found);
        let service = service(Arc::new(FakeTransport::new())).with_store(store.clone()).with_resolvers(vec![found]);

        service.resolve_icon(&token("tok1", None)).await;
        service.clear_cache().await.unwrap();

        assert_eq!(service.cache_stats().await.cached, 0);
        assert!(store.load_live_icons().await.unwrap().is_empty());

        service.resolve_icon(&token("tok1", None)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cleanup_without_store() {
        let service = service(Arc::new(FakeTransport::new()));
        assert_eq!(service.cleanup().await.unwrap(), 0);
        assert_eq!(service.warm_from_store().await.unwrap(), 0);
    }

    struct TwoTokenWallet;

    #[async_trait]
    impl WalletHandle for TwoTokenWallet {
        fn address(&self) -> String {
            "bitcoincash:qtest".into()
        }

        async fn balance(&self) -> Result<u64, Error> {
            Ok(0)
        }

        async fn refresh_utxos(&self) -> Result<serde_json::Value, Error> {
            Ok(serde_json::Value::Null)
        }

        async fn list_tokens(&self) -> Result<Vec<TokenSummary>, Error> {
            Ok(vec![
                TokenSummary { token_id: "tokA".into(), name: "A".into(), ticker: "A".into(), qty: 1.0, url: None },
                TokenSummary { token_id: "tokB".into(), name: "B".into(), ticker: "B".into(), qty: 2.0, url: None },
            ])
        }

        async fn get_token_data(&self, token_id: &str) -> Result<TokenData, Error> {
            Ok(TokenData { token_id: token_id.into(), parent_group_id: None })
        }
    }

    #[tokio::test]
    async fn test_resolve_wallet_tokens() {
        let (found, _) = Scripted::boxed("found", Outcome::Found);
        let service = service(Arc::new(FakeTransport::new())).with_resolvers(vec![found]);

        let resolved = service.resolve_wallet_tokens(&TwoTokenWallet, 32).await.unwrap();
        let ids: Vec<&str> = resolved.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["tokA", "tokB"]);
        assert_eq!(resolved[1].1.payload, "https://x.test/tokB.png");
    }
}
