//! Timestamped key-value entries for settings-level caches.
//!
//! Values are stored as JSON with the moment they were written. Reads may pass
//! a maximum age; an entry older than that is deleted and reported missing.

use super::connection::StoreDb;
use crate::Error;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_rusqlite::{params, rusqlite};

pub const BALANCE_KEY: &str = "wallet-balance-cache";
pub const SETTINGS_KEY: &str = "wallet-settings";
pub const UTXOS_KEY: &str = "wallet-utxos-cache";

/// Base keys whose entries are counted by [`StoreDb::stats`].
const TRACKED_KEYS: [&str; 3] = [BALANCE_KEY, SETTINGS_KEY, UTXOS_KEY];

pub fn balance_max_age() -> Duration {
    Duration::minutes(5)
}

pub fn utxos_max_age() -> Duration {
    Duration::minutes(15)
}

/// A value read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedValue<T> {
    pub data: T,
    pub stored_at: DateTime<Utc>,
    pub age: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct StoreItem {
    pub key: String,
    pub size: usize,
    pub age_ms: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct StoreStats {
    pub total_size: usize,
    pub item_count: usize,
    pub items: Vec<StoreItem>,
}

impl StoreDb {
    /// Store `data` under `key`, replacing any previous value.
    pub async fn set_cached<T: Serialize>(&self, key: &str, data: &T) -> Result<(), Error> {
        self.set_cached_at(key, data, Utc::now()).await
    }

    pub(crate) async fn set_cached_at<T: Serialize>(
        &self, key: &str, data: &T, stored_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        let key = key.to_string();
        let value_json = serde_json::to_string(data)?;
        let stored_at_ms = stored_at.timestamp_millis();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO settings_cache (key, value_json, stored_at_ms) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET
                        value_json = excluded.value_json,
                        stored_at_ms = excluded.stored_at_ms",
                    params![key, value_json, stored_at_ms],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Read `key`, treating entries older than `max_age` as missing.
    ///
    /// Expired entries are deleted on the way out.
    pub async fn get_cached<T: DeserializeOwned>(
        &self, key: &str, max_age: Option<Duration>,
    ) -> Result<Option<CachedValue<T>>, Error> {
        let key = key.to_string();
        let lookup_key = key.clone();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<(String, i64)>, Error> {
                let result = conn.query_row(
                    "SELECT value_json, stored_at_ms FROM settings_cache WHERE key = ?1",
                    params![lookup_key],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                );
                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        let Some((value_json, stored_at_ms)) = row else {
            return Ok(None);
        };

        let stored_at = DateTime::from_timestamp_millis(stored_at_ms)
            .ok_or_else(|| Error::Serialization(format!("bad timestamp for {key}: {stored_at_ms}")))?;
        let age = Utc::now() - stored_at;

        if max_age.is_some_and(|max| age > max) {
            self.remove(&key).await?;
            return Ok(None);
        }

        let data = serde_json::from_str(&value_json)?;
        Ok(Some(CachedValue { data, stored_at, age }))
    }

    /// Delete one key. Returns whether it existed.
    pub async fn remove(&self, key: &str) -> Result<bool, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM settings_cache WHERE key = ?1", params![key])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every wallet-related entry. Returns how many were removed.
    pub async fn clear_all(&self) -> Result<u64, Error> {
        let removed = self
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "DELETE FROM settings_cache
                     WHERE key LIKE 'wallet-%' OR key LIKE 'psf-%' OR key LIKE '%cache%'",
                    [],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)?;
        tracing::info!(removed, "cleared settings cache");
        Ok(removed)
    }

    /// Size and age of every entry under one of the tracked base keys.
    pub async fn stats(&self) -> Result<StoreStats, Error> {
        let now_ms = Utc::now().timestamp_millis();
        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<(String, usize, i64)>, Error> {
                let mut stmt = conn.prepare("SELECT key, LENGTH(value_json), stored_at_ms FROM settings_cache")?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as usize, row.get(2)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        let mut stats = StoreStats::default();
        for (key, size, stored_at_ms) in rows {
            if !TRACKED_KEYS.iter().any(|base| key.starts_with(base)) {
                continue;
            }
            stats.total_size += size;
            stats.item_count += 1;
            stats.items.push(StoreItem { key, size, age_ms: now_ms - stored_at_ms });
        }
        Ok(stats)
    }

    pub async fn set_cached_balance(&self, address: &str, balance: u64) -> Result<(), Error> {
        self.set_cached(&format!("{BALANCE_KEY}-{address}"), &balance).await
    }

    pub async fn get_cached_balance(&self, address: &str) -> Result<Option<CachedValue<u64>>, Error> {
        self.get_cached(&format!("{BALANCE_KEY}-{address}"), Some(balance_max_age())).await
    }

    pub async fn set_cached_utxos<T: Serialize>(&self, address: &str, utxos: &T) -> Result<(), Error> {
        self.set_cached(&format!("{UTXOS_KEY}-{address}"), utxos).await
    }

    pub async fn get_cached_utxos<T: DeserializeOwned>(&self, address: &str) -> Result<Option<CachedValue<T>>, Error> {
        self.get_cached(&format!("{UTXOS_KEY}-{address}"), Some(utxos_max_age())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_and_get() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.set_cached("wallet-settings", &json!({"theme": "dark"})).await.unwrap();

        let cached: CachedValue<serde_json::Value> = db.get_cached("wallet-settings", None).await.unwrap().unwrap();
        assert_eq!(cached.data["theme"], "dark");
        assert!(cached.age >= Duration::zero());
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let result: Option<CachedValue<u64>> = db.get_cached("nope", None).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_max_age_expires_and_deletes() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let key = format!("{BALANCE_KEY}-bitcoincash:qz1");
        db.set_cached_at(&key, &1_000u64, Utc::now() - Duration::minutes(6)).await.unwrap();

        assert!(db.get_cached_balance("bitcoincash:qz1").await.unwrap().is_none());
        let without_limit: Option<CachedValue<u64>> = db.get_cached(&key, None).await.unwrap();
        assert!(without_limit.is_none());
    }

    #[tokio::test]
    async fn test_balance_within_max_age() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.set_cached_balance("bitcoincash:qz1", 42_000).await.unwrap();

        let cached = db.get_cached_balance("bitcoincash:qz1").await.unwrap().unwrap();
        assert_eq!(cached.data, 42_000);
    }

    #[tokio::test]
    async fn test_utxos_survive_longer_than_balance() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let key = format!("{UTXOS_KEY}-bitcoincash:qz1");
        db.set_cached_at(&key, &json!([{"txid": "ab", "vout": 0}]), Utc::now() - Duration::minutes(10))
            .await
            .unwrap();

        let cached: CachedValue<serde_json::Value> = db.get_cached_utxos("bitcoincash:qz1").await.unwrap().unwrap();
        assert_eq!(cached.data[0]["vout"], 0);
    }

    #[tokio::test]
    async fn test_clear_all_only_wallet_keys() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.set_cached_balance("addr", 1).await.unwrap();
        db.set_cached("psf-server", &"https://api.test").await.unwrap();
        db.set_cached("theme", &"dark").await.unwrap();

        assert_eq!(db.clear_all().await.unwrap(), 2);
        let theme: Option<CachedValue<String>> = db.get_cached("theme", None).await.unwrap();
        assert!(theme.is_some());
    }

    #[tokio::test]
    async fn test_stats_counts_tracked_keys() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.set_cached_balance("addr", 1).await.unwrap();
        db.set_cached_utxos("addr", &json!([])).await.unwrap();
        db.set_cached("psf-server", &"x").await.unwrap();

        let stats = db.stats().await.unwrap();
        assert_eq!(stats.item_count, 2);
        assert_eq!(stats.total_size, stats.items.iter().map(|i| i.size).sum::<usize>());
    }

    #[tokio::test]
    async fn test_remove() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.set_cached("wallet-settings", &1).await.unwrap();
        assert!(db.remove("wallet-settings").await.unwrap());
        assert!(!db.remove("wallet-settings").await.unwrap());
    }
}
