//! MCP server handler implementation.
//!
//! Routes tool calls to the icon service.
use std::sync::Arc;

use crate::tools::{IconResolveParams, cache, resolve_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use tokicon_client::IconService;

/// The MCP server handler for tokicon.
#[derive(Clone)]
pub struct IconServer {
    service: Arc<IconService>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl IconServer {
    pub fn new(service: Arc<IconService>) -> Self {
        Self { service, tool_router: Self::tool_router() }
    }

    /// Resolve the icon for a token.
    ///
    /// Always answers with a descriptor; the placeholder stands in for tokens
    /// without a reachable icon.
    #[tool(description = "Resolve the icon for a token id, optionally with the URL the token declares. \
                          Returns a descriptor with a raster URL or inline SVG markup.")]
    async fn icon_resolve(&self, params: Parameters<IconResolveParams>) -> Result<CallToolResult, McpError> {
        resolve_impl(&self.service, params.0).await
    }

    #[tool(description = "Icon cache counters, failure kinds and best-ranked IPFS gateways.")]
    async fn icon_cache_stats(&self) -> Result<CallToolResult, McpError> {
        cache::stats_impl(&self.service).await
    }

    #[tool(description = "Clear cached icons, failure markers, gateway winners and persisted icons.")]
    async fn icon_cache_clear(&self) -> Result<CallToolResult, McpError> {
        cache::clear_impl(&self.service).await
    }
}

impl ServerHandler for IconServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "tokicon".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
