//! icon_cache_clear tool implementation.
//!
//! Drops every cached icon, failure marker and gateway winner, plus the
//! persisted icons in the settings store.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::Serialize;
use tokicon_client::IconService;

use crate::error::to_json;

/// Output from the icon_cache_clear tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct IconCacheClearOutput {
    /// Icons that were cached before clearing.
    pub cleared: usize,
    /// Tokens that had been given up on before clearing.
    pub failures_cleared: usize,
}

/// Implementation of the icon_cache_clear tool.
pub async fn clear_impl(service: &IconService) -> Result<CallToolResult, McpError> {
    let before = service.cache_stats().await;
    service.clear_cache().await?;
    tracing::info!(cleared = before.cached, "icon cache cleared");

    let output = IconCacheClearOutput { cleared: before.cached, failures_cleared: before.failed };
    Ok(CallToolResult::success(vec![Content::text(to_json(&output)?)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_service;
    use tokicon_core::{FailureKind, TokenRef};

    #[tokio::test]
    async fn test_clear_empties_cache() {
        let service = test_service();
        service.resolve_icon(&TokenRef::new("tok1", Some("pouns://[2,7]".into()), 64)).await;
        assert!(service.cache().try_start_loading("tok2").await);
        service.cache().record_failure("tok2", FailureKind::Dns).await;

        let stats = service.cache_stats().await;
        assert_eq!((stats.cached, stats.failed), (1, 1));

        assert!(clear_impl(&service).await.is_ok());
        assert_eq!(service.cache_stats().await, Default::default());
    }
}
