//! MCP tool implementations.
//!
//! This module contains all tools exposed by the tokicon server.

pub mod cache;
pub mod icon_resolve;

pub use icon_resolve::{IconResolveParams, resolve_impl};

#[cfg(test)]
pub(crate) fn test_service() -> std::sync::Arc<tokicon_client::IconService> {
    use std::sync::Arc;
    use tokicon_client::{FetchConfig, HttpTransport, IconService};
    use tokicon_core::{AppConfig, IconCache};

    let config = Arc::new(AppConfig::default());
    let transport = Arc::new(HttpTransport::new(FetchConfig::from(config.as_ref())).unwrap());
    let cache = Arc::new(IconCache::new(config.cache_policy()));
    Arc::new(IconService::new(config, transport, cache))
}
