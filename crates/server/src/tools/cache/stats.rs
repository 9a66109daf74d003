//! icon_cache_stats tool implementation.
//!
//! Reports cache counters, the failure-kind histogram and the best-ranked gateways.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::Serialize;
use tokicon_client::IconService;
use tokicon_core::CacheStats;
use tokicon_core::icon::GatewayHealth;

use crate::error::to_json;

/// Gateways listed in the output, best first.
const TOP_GATEWAYS: usize = 5;

/// Output from the icon_cache_stats tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct IconCacheStatsOutput {
    #[serde(flatten)]
    pub stats: CacheStats,
    pub best_gateways: Vec<GatewayHealth>,
}

/// Implementation of the icon_cache_stats tool.
pub async fn stats_impl(service: &IconService) -> Result<CallToolResult, McpError> {
    let stats = service.cache_stats().await;
    let mut best_gateways = service.cache().best_gateways().await;
    best_gateways.truncate(TOP_GATEWAYS);

    let output = IconCacheStatsOutput { stats, best_gateways };
    Ok(CallToolResult::success(vec![Content::text(to_json(&output)?)]))
}
