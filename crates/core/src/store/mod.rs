//! SQLite-backed settings store.
//!
//! Persistent local key-value storage with async access via tokio-rusqlite:
//!
//! - Balance and UTXO snapshots per address, read back with a maximum age
//! - Write-through copies of successful icon lookups for warm starts
//! - Automatic schema migrations and WAL mode

pub mod connection;
pub mod icons;
pub mod kv;
pub mod migrations;

pub use crate::Error;

pub use connection::StoreDb;
pub use kv::{CachedValue, StoreItem, StoreStats};
