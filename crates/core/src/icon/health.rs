//! Gateway health bookkeeping.
//!
//! Used for best-effort ranking only; nothing correctness-relevant depends on it.

use std::time::Duration;

use serde::Serialize;

/// Samples an endpoint needs before it takes part in ranking.
pub const MIN_RANKING_SAMPLES: u64 = 3;

/// Success-rate spread inside which latency decides.
const RATE_BAND: f64 = 0.1;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayHealthRecord {
    pub success_count: u64,
    pub failure_count: u64,
    pub total_latency: Duration,
    pub request_count: u64,
}

impl GatewayHealthRecord {
    pub fn record(&mut self, success: bool, latency: Duration) {
        self.request_count += 1;
        self.total_latency += latency;
        if success {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
    }

    pub fn summary(&self, endpoint: &str) -> Option<GatewayHealth> {
        if self.request_count == 0 {
            return None;
        }
        Some(GatewayHealth {
            endpoint: endpoint.to_string(),
            success_rate: self.success_count as f64 / self.request_count as f64,
            average_latency_ms: self.total_latency.as_millis() as f64 / self.request_count as f64,
            request_count: self.request_count,
        })
    }
}

/// Derived view of a gateway's record.
#[derive(Debug, Clone, PartialEq, Serialize, schemars::JsonSchema)]
pub struct GatewayHealth {
    pub endpoint: String,
    pub success_rate: f64,
    pub average_latency_ms: f64,
    pub request_count: u64,
}

/// Order gateways best first. Endpoints with fewer than `MIN_RANKING_SAMPLES`
/// requests are left out.
///
/// Rates are sorted descending, then split into runs where every member is
/// within `RATE_BAND` of the run's best rate; each run is ordered by average
/// latency. Comparing against the run leader rather than pairwise keeps the
/// ordering total.
pub fn rank(mut healths: Vec<GatewayHealth>) -> Vec<GatewayHealth> {
    healths.retain(|h| h.request_count >= MIN_RANKING_SAMPLES);
    healths.sort_by(|a, b| b.success_rate.total_cmp(&a.success_rate));

    let mut start = 0;
    while start < healths.len() {
        let leader = healths[start].success_rate;
        let end = healths[start..]
            .iter()
            .position(|h| leader - h.success_rate > RATE_BAND)
            .map_or(healths.len(), |offset| start + offset);
        healths[start..end].sort_by(|a, b| a.average_latency_ms.total_cmp(&b.average_latency_ms));
        start = end;
    }
    healths
}
