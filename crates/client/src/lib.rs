//! Icon resolution for tokicon.
//!
//! This crate provides the HTTP transport, the IPFS gateway prober, the icon
//! source resolvers and the [`IconService`] that orchestrates them on top of
//! the cache from `tokicon-core`.

pub mod fetch;
pub mod gateway;
pub mod render;
pub mod resolve;
pub mod service;

#[cfg(test)]
mod testing;

pub use fetch::{FetchConfig, FetchError, HttpTransport, Transport, TransportResponse};
pub use gateway::{GatewayProber, ProbeHit, extract_cid, gateway_url};
pub use render::IdenticonRenderer;
pub use resolve::{ResolveContext, ResolveError, Resolver, default_chain};
pub use service::IconService;
