//! icon_resolve tool implementation.
//!
//! Resolves the icon for one token through the cache and the resolver chain.
//! A token without an icon yields the placeholder, not an error.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokicon_client::IconService;
use tokicon_core::{IconDescriptor, TokenRef};

use crate::error::{ToolError, to_json};

const MAX_SIZE: u32 = 1024;

/// Parameters for the icon_resolve tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IconResolveParams {
    /// Token id to find an icon for.
    pub token_id: String,

    /// Icon or document URL declared by the token, if known.
    #[serde(default)]
    pub url: Option<String>,

    /// Display size in pixels for generated icons (default: 64).
    #[serde(default = "default_size")]
    pub size: u32,
}

fn default_size() -> u32 {
    64
}

/// Output from the icon_resolve tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IconResolveOutput {
    pub token_id: String,
    pub icon: IconDescriptor,
}

/// Implementation of the icon_resolve tool.
pub async fn resolve_impl(service: &IconService, params: IconResolveParams) -> Result<CallToolResult, McpError> {
    let token_id = params.token_id.trim();
    if token_id.is_empty() {
        return Err(ToolError::InvalidInput("token_id cannot be empty".to_string()).into());
    }
    if params.size == 0 || params.size > MAX_SIZE {
        return Err(ToolError::InvalidInput(format!("size must be between 1 and {MAX_SIZE}")).into());
    }

    let token = TokenRef::new(token_id, params.url, params.size);
    let icon = service.resolve_icon(&token).await;

    let output = IconResolveOutput { token_id: token.token_id, icon };
    Ok(CallToolResult::success(vec![Content::text(to_json(&output)?)]))
}
