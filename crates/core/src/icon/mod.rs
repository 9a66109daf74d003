//! In-memory icon cache and the data model shared by resolvers.
//!
//! The cache is pure bookkeeping: it never fetches or retries anything itself.
//! It tracks:
//!
//! - Successful lookups with an expiry (24h by default)
//! - Permanent failure markers and per-token attempt counters
//! - Tokens currently being resolved (the in-flight gate)
//! - A histogram of failure kinds and per-gateway health records

pub mod cache;
pub mod health;
pub mod types;

pub use cache::{CachePolicy, CacheStats, IconCache};
pub use health::{GatewayHealth, GatewayHealthRecord};
pub use types::{CacheEntry, FailureRecord, IconDescriptor, RenderKind, TokenRef};
