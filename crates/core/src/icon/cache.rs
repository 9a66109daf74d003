//! Process-wide icon cache keyed by token id.
//!
//! All state sits behind one `RwLock`, so every mutation is atomic with respect
//! to every other. `try_start_loading` is the check-then-mark gate that keeps a
//! token in at most one resolution at a time.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use super::health::{self, GatewayHealth, GatewayHealthRecord};
use super::types::{CacheEntry, FailureRecord, IconDescriptor};
use crate::FailureKind;

/// Tunable cache policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// How long a successful lookup is served.
    pub ttl: chrono::Duration,
    /// Minimum spacing between two attempts for the same token.
    pub debounce: chrono::Duration,
    /// Attempts allowed per token before it is written off.
    pub max_attempts: u32,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self { ttl: chrono::Duration::hours(24), debounce: chrono::Duration::seconds(5), max_attempts: 1 }
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct CacheStats {
    pub cached: usize,
    pub failed: usize,
    pub loading: usize,
    pub total_attempts: u64,
    pub gateway_count: usize,
    pub error_types: BTreeMap<String, u64>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    records: HashMap<String, FailureRecord>,
    in_flight: HashSet<String>,
    error_types: HashMap<FailureKind, u64>,
    gateways: HashMap<String, GatewayHealthRecord>,
}

impl CacheState {
    /// Live entry for `token_id`. An expired entry is purged; its attempt
    /// record stays until `clear`.
    fn live_entry(&mut self, token_id: &str, now: DateTime<Utc>) -> Option<&CacheEntry> {
        let expired = self.entries.get(token_id).is_some_and(|entry| !entry.is_live(now));
        if expired {
            self.entries.remove(token_id);
            return None;
        }
        self.entries.get(token_id)
    }

    fn should_attempt_load(&mut self, token_id: &str, now: DateTime<Utc>, policy: &CachePolicy) -> bool {
        if self.live_entry(token_id, now).is_some() || self.in_flight.contains(token_id) {
            return false;
        }

        let Some(record) = self.records.get(token_id) else {
            return policy.max_attempts > 0;
        };

        if record.permanently_failed {
            return false;
        }

        if let Some(last) = record.last_attempt_at
            && now - last < policy.debounce
        {
            return false;
        }

        record.attempt_count < policy.max_attempts
    }

    fn start_loading(&mut self, token_id: &str, now: DateTime<Utc>) {
        self.in_flight.insert(token_id.to_string());
        let record = self.records.entry(token_id.to_string()).or_default();
        record.last_attempt_at = Some(now);
        record.attempt_count += 1;
    }

    fn record_success(&mut self, token_id: &str, descriptor: IconDescriptor, now: DateTime<Utc>, policy: &CachePolicy) {
        self.in_flight.remove(token_id);
        self.entries.insert(token_id.to_string(), CacheEntry { descriptor, expires_at: now + policy.ttl });
    }

    fn record_failure(&mut self, token_id: &str, kind: FailureKind) {
        self.in_flight.remove(token_id);
        let record = self.records.entry(token_id.to_string()).or_default();
        record.permanently_failed = true;
        record.last_error_kind = Some(kind);
        *self.error_types.entry(kind).or_insert(0) += 1;
    }

    fn cleanup(&mut self, now: DateTime<Utc>) -> usize {
        let expired: Vec<String> =
            self.entries.iter().filter(|(_, entry)| !entry.is_live(now)).map(|(id, _)| id.clone()).collect();
        for token_id in &expired {
            self.entries.remove(token_id);
        }
        expired.len()
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            cached: self.entries.len(),
            failed: self.records.values().filter(|r| r.permanently_failed).count(),
            loading: self.in_flight.len(),
            total_attempts: self.records.values().map(|r| u64::from(r.attempt_count)).sum(),
            gateway_count: self.gateways.len(),
            error_types: self.error_types.iter().map(|(kind, count)| (kind.as_str().to_string(), *count)).collect(),
        }
    }
}

/// In-memory icon cache shared by every lookup in the process.
#[derive(Debug)]
pub struct IconCache {
    state: RwLock<CacheState>,
    policy: CachePolicy,
}

impl Default for IconCache {
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}

impl IconCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self { state: RwLock::new(CacheState::default()), policy }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Whether a lookup for `token_id` may start now.
    ///
    /// False while a live entry exists, while the token is failed, in flight or
    /// inside the debounce window, and once its attempt budget is spent.
    pub async fn should_attempt_load(&self, token_id: &str) -> bool {
        let mut state = self.state.write().await;
        state.should_attempt_load(token_id, Utc::now(), &self.policy)
    }

    /// Mark `token_id` in flight, stamp the attempt time and count the attempt.
    pub async fn start_loading(&self, token_id: &str) {
        let mut state = self.state.write().await;
        state.start_loading(token_id, Utc::now());
    }

    /// `should_attempt_load` followed by `start_loading` under one lock.
    ///
    /// Returns true when the caller now owns the lookup for `token_id`.
    pub async fn try_start_loading(&self, token_id: &str) -> bool {
        let now = Utc::now();
        let mut state = self.state.write().await;
        if !state.should_attempt_load(token_id, now, &self.policy) {
            return false;
        }
        state.start_loading(token_id, now);
        true
    }

    pub async fn record_success(&self, token_id: &str, descriptor: IconDescriptor) {
        let mut state = self.state.write().await;
        state.record_success(token_id, descriptor, Utc::now(), &self.policy);
    }

    pub async fn record_failure(&self, token_id: &str, kind: FailureKind) {
        let mut state = self.state.write().await;
        state.record_failure(token_id, kind);
    }

    /// Drop the in-flight marker of a lookup that was cancelled before it
    /// recorded an outcome. The attempt still counts.
    pub async fn abandon_loading(&self, token_id: &str) {
        let mut state = self.state.write().await;
        state.in_flight.remove(token_id);
    }

    /// Cached entry for `token_id`, purging it if it has expired.
    pub async fn get(&self, token_id: &str) -> Option<CacheEntry> {
        let mut state = self.state.write().await;
        state.live_entry(token_id, Utc::now()).cloned()
    }

    /// Put back an entry loaded from persistent storage. Expired entries are ignored.
    pub async fn restore(&self, token_id: &str, entry: CacheEntry) -> bool {
        if !entry.is_live(Utc::now()) {
            return false;
        }
        let mut state = self.state.write().await;
        state.entries.insert(token_id.to_string(), entry);
        true
    }

    pub async fn is_failed(&self, token_id: &str) -> bool {
        let state = self.state.read().await;
        state.records.get(token_id).is_some_and(|r| r.permanently_failed)
    }

    pub async fn failure_record(&self, token_id: &str) -> Option<FailureRecord> {
        let state = self.state.read().await;
        state.records.get(token_id).cloned()
    }

    /// Remove expired entries. Returns how many were dropped.
    pub async fn cleanup(&self) -> usize {
        let mut state = self.state.write().await;
        state.cleanup(Utc::now())
    }

    /// Drop everything: entries, failures, in-flight markers, histograms and gateway health.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        *state = CacheState::default();
    }

    pub async fn stats(&self) -> CacheStats {
        self.state.read().await.stats()
    }

    pub async fn record_gateway_performance(&self, endpoint: &str, success: bool, latency: Duration) {
        let mut state = self.state.write().await;
        state.gateways.entry(endpoint.to_string()).or_default().record(success, latency);
    }

    pub async fn gateway_health(&self, endpoint: &str) -> Option<GatewayHealth> {
        let state = self.state.read().await;
        state.gateways.get(endpoint).and_then(|record| record.summary(endpoint))
    }

    /// Gateways with enough samples, best first.
    pub async fn best_gateways(&self) -> Vec<GatewayHealth> {
        let state = self.state.read().await;
        let healths = state.gateways.iter().filter_map(|(endpoint, record)| record.summary(endpoint)).collect();
        health::rank(healths)
    }
}
