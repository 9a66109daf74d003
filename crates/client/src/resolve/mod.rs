//! Icon source resolvers.
//!
//! Each resolver turns a [`TokenRef`] into an [`IconDescriptor`] from one kind
//! of source. `Ok(None)` means the resolver does not apply or found nothing;
//! `Err` carries a [`FailureKind`] for diagnostics. Either way the caller moves
//! on to the next resolver. Priority order is fixed by [`default_chain`].

pub mod alternatives;
pub mod bcmr;
pub mod content;
pub mod generative;
pub mod http;
pub mod metadata;
pub mod nft_api;
pub mod normalize;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use tokicon_core::wallet::{GenerativeRenderer, MutableMetadataClient, WalletHandle};
use tokicon_core::{AppConfig, FailureKind, IconDescriptor, TokenRef};

use crate::fetch::{FetchError, Transport};
use crate::gateway::GatewayProber;

pub use alternatives::AlternativeSourceResolver;
pub use content::ContentAddressResolver;
pub use generative::GenerativeResolver;
pub use http::HttpResolver;
pub use metadata::MetadataSchemaResolver;
pub use nft_api::NftApiResolver;

/// A resolver step that produced nothing usable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ResolveError {
    pub kind: FailureKind,
    pub message: String,
}

impl ResolveError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

impl From<FetchError> for ResolveError {
    fn from(err: FetchError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

/// Everything a resolver may use.
#[derive(Clone)]
pub struct ResolveContext {
    pub config: Arc<AppConfig>,
    pub transport: Arc<dyn Transport>,
    pub prober: Arc<GatewayProber>,
    pub renderer: Arc<dyn GenerativeRenderer>,
    pub wallet: Option<Arc<dyn WalletHandle>>,
    pub metadata: Option<Arc<dyn MutableMetadataClient>>,
}

impl ResolveContext {
    pub fn timeout(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    /// HEAD `url` and report whether it answered with a 2xx.
    pub async fn head_ok(&self, url: &str, timeout_ms: u64) -> Result<bool, FetchError> {
        let response = self.transport.head(url, Self::timeout(timeout_ms)).await?;
        Ok(response.is_success())
    }
}

#[async_trait]
pub trait Resolver: Send + Sync {
    /// Source tag of the descriptors this resolver produces, also used in logs.
    fn name(&self) -> &'static str;

    async fn attempt(&self, token: &TokenRef, ctx: &ResolveContext) -> Result<Option<IconDescriptor>, ResolveError>;
}

/// Resolvers in priority order.
pub fn default_chain() -> Vec<Box<dyn Resolver>> {
    vec![
        Box::new(MetadataSchemaResolver),
        Box::new(ContentAddressResolver),
        Box::new(HttpResolver),
        Box::new(GenerativeResolver),
        Box::new(NftApiResolver),
        Box::new(AlternativeSourceResolver),
    ]
}

/// Tracks the most informative failure across several steps.
#[derive(Debug, Default)]
pub(crate) struct FailureTally(Option<FailureKind>);

impl FailureTally {
    pub(crate) fn note(&mut self, kind: FailureKind) {
        self.0 = Some(FailureKind::most_specific(self.0, kind));
    }

    /// `Ok(None)` when nothing failed outright, else the most specific failure.
    pub(crate) fn into_result(self, what: &str) -> Result<Option<IconDescriptor>, ResolveError> {
        match self.0 {
            Some(kind) => Err(ResolveError::new(kind, format!("{what} exhausted"))),
            None => Ok(None),
        }
    }
}
