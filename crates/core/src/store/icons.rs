//! Persisted icon lookups.

use super::connection::StoreDb;
use crate::Error;
use crate::icon::{CacheEntry, IconDescriptor};
use chrono::{DateTime, Utc};
use tokio_rusqlite::params;

impl StoreDb {
    /// Insert or replace the persisted entry for `token_id`.
    pub async fn save_icon(&self, token_id: &str, entry: &CacheEntry) -> Result<(), Error> {
        let token_id = token_id.to_string();
        let descriptor_json = serde_json::to_string(&entry.descriptor)?;
        let expires_at_ms = entry.expires_at.timestamp_millis();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO icon_entries (token_id, descriptor_json, expires_at_ms) VALUES (?1, ?2, ?3)
                     ON CONFLICT(token_id) DO UPDATE SET
                        descriptor_json = excluded.descriptor_json,
                        expires_at_ms = excluded.expires_at_ms",
                    params![token_id, descriptor_json, expires_at_ms],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Every persisted entry that has not expired yet.
    ///
    /// Rows that no longer decode are skipped with a warning.
    pub async fn load_live_icons(&self) -> Result<Vec<(String, CacheEntry)>, Error> {
        let now_ms = Utc::now().timestamp_millis();
        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<(String, String, i64)>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT token_id, descriptor_json, expires_at_ms FROM icon_entries WHERE expires_at_ms > ?1",
                )?;
                let rows = stmt
                    .query_map(params![now_ms], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        let mut entries = Vec::with_capacity(rows.len());
        for (token_id, descriptor_json, expires_at_ms) in rows {
            let descriptor = match serde_json::from_str::<IconDescriptor>(&descriptor_json) {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!(%token_id, error = %e, "skipping undecodable persisted icon");
                    continue;
                }
            };
            let Some(expires_at) = DateTime::from_timestamp_millis(expires_at_ms) else {
                continue;
            };
            entries.push((token_id, CacheEntry { descriptor, expires_at }));
        }
        Ok(entries)
    }

    /// Delete expired rows. Returns the number removed.
    pub async fn purge_expired_icons(&self) -> Result<u64, Error> {
        let now_ms = Utc::now().timestamp_millis();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM icon_entries WHERE expires_at_ms <= ?1", params![now_ms])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn clear_icons(&self) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM icon_entries", [])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
