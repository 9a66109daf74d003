//! Sequential IPFS gateway prober.
//!
//! Gateways are tried one at a time in configured order, never concurrently.
//! The first reachable one wins and is remembered per CID for a short while.
//! Every probe outcome feeds the gateway health records in the icon cache;
//! gateways with enough samples and no success at all are moved to the back.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use tokicon_core::config::GatewayConfig;
use tokicon_core::{AppConfig, FailureKind, IconCache};

use super::cid::gateway_url;
use crate::fetch::Transport;

/// A gateway that answered for a CID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeHit {
    /// Configured gateway entry.
    pub endpoint: String,
    /// URL of the content on that gateway.
    pub url: String,
    pub latency: Duration,
}

pub struct GatewayProber {
    transport: Arc<dyn Transport>,
    cache: Arc<IconCache>,
    gateways: Vec<GatewayConfig>,
    ttl: Duration,
    winners: Mutex<HashMap<String, (ProbeHit, Instant)>>,
}

impl GatewayProber {
    pub fn new(transport: Arc<dyn Transport>, cache: Arc<IconCache>, gateways: Vec<GatewayConfig>, ttl: Duration) -> Self {
        Self { transport, cache, gateways, ttl, winners: Mutex::new(HashMap::new()) }
    }

    pub fn from_config(transport: Arc<dyn Transport>, cache: Arc<IconCache>, config: &AppConfig) -> Self {
        Self::new(transport, cache, config.gateways.clone(), config.gateway_cache_ttl())
    }

    /// Remembered winner for `cid`, if still fresh. Never touches the network.
    pub fn cached(&self, cid: &str) -> Option<ProbeHit> {
        let winners = self.winners.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        winners.get(cid).filter(|(_, at)| at.elapsed() < self.ttl).map(|(hit, _)| hit.clone())
    }

    /// Find a gateway serving `cid`.
    ///
    /// Returns the most specific failure seen when no gateway answers.
    pub async fn probe(&self, cid: &str) -> Result<ProbeHit, FailureKind> {
        if let Some(hit) = self.cached(cid) {
            return Ok(hit);
        }

        let mut worst: Option<FailureKind> = None;
        for gateway in self.probe_order().await {
            let url = gateway_url(&gateway.url, cid);
            let timeout = Duration::from_millis(gateway.timeout_ms);
            let start = Instant::now();
            let result = self.transport.head(&url, timeout).await;
            let latency = start.elapsed();

            let success = matches!(&result, Ok(response) if response.is_success());
            self.cache.record_gateway_performance(&gateway.url, success, latency).await;

            if success {
                let hit = ProbeHit { endpoint: gateway.url.clone(), url, latency };
                tracing::debug!(cid, gateway = %hit.endpoint, latency_ms = latency.as_millis() as u64, "gateway answered");
                self.winners
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .insert(cid.to_string(), (hit.clone(), Instant::now()));
                return Ok(hit);
            }

            let kind = match &result {
                Err(e) => e.kind(),
                Ok(_) => FailureKind::Unknown,
            };
            worst = Some(FailureKind::most_specific(worst, kind));
        }

        tracing::debug!(cid, "no gateway answered");
        Err(worst.unwrap_or(FailureKind::Unknown))
    }

    /// Forget every remembered winner.
    pub fn clear(&self) {
        self.winners.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clear();
    }

    /// Configured order, with gateways that never succeeded moved to the end.
    async fn probe_order(&self) -> Vec<&GatewayConfig> {
        let mut healthy = Vec::with_capacity(self.gateways.len());
        let mut demoted = Vec::new();
        for gateway in &self.gateways {
            let dead = self
                .cache
                .gateway_health(&gateway.url)
                .await
                .is_some_and(|h| h.request_count >= tokicon_core::icon::health::MIN_RANKING_SAMPLES && h.success_rate == 0.0);
            if dead { demoted.push(gateway) } else { healthy.push(gateway) }
        }
        healthy.extend(demoted);
        healthy
    }
}
