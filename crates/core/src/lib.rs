//! Core types and shared functionality for tokicon.
//!
//! This crate provides:
//! - The in-memory icon cache and its data model
//! - Unified error types and the failure taxonomy
//! - Configuration structures
//! - The SQLite settings store
//! - The adaptive poller and the wallet balance refresher
//! - Interfaces for the wallet-side collaborators

pub mod balance;
pub mod config;
pub mod error;
pub mod icon;
pub mod poller;
pub mod store;
pub mod wallet;

pub use balance::BalanceRefresher;
pub use config::AppConfig;
pub use error::{Error, FailureKind};
pub use icon::{CacheEntry, CachePolicy, CacheStats, IconCache, IconDescriptor, RenderKind, TokenRef};
pub use poller::{Ambient, PollJob, Poller, PollerConfig, PollerStatus, poll_fn};
pub use store::StoreDb;
