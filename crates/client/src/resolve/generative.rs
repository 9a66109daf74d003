//! Locally rendered icons for `pouns://` and `nouns://` seeds.
//!
//! The seed is a numeric array in the URL, written with brackets or
//! parentheses: `pouns://[1,4,0,2]` or `nouns://(1,4,0,2)`.

use async_trait::async_trait;

use tokicon_core::{FailureKind, IconDescriptor, TokenRef};

use super::{ResolveContext, ResolveError, Resolver};

const SCHEMES: [&str; 2] = ["pouns://", "nouns://"];

/// Size attributes the renderer emits, replaced by the requested display size.
const RENDERED_SIZE: &str = r#"<svg width="320" height="320""#;

pub struct GenerativeResolver;

/// Parse the seed part of a generative URL. An empty array is not a seed.
pub fn parse_seed(raw: &str) -> Result<Vec<u32>, ResolveError> {
    let normalized = raw.trim().trim_end_matches('/').replace('(', "[").replace(')', "]");
    let seed = serde_json::from_str::<Vec<u32>>(&normalized)
        .map_err(|e| ResolveError::new(FailureKind::InvalidMetadata, format!("bad generative seed {raw:?}: {e}")))?;
    if seed.is_empty() {
        return Err(ResolveError::new(FailureKind::InvalidMetadata, format!("empty generative seed {raw:?}")));
    }
    Ok(seed)
}

#[async_trait]
impl Resolver for GenerativeResolver {
    fn name(&self) -> &'static str {
        "pouns"
    }

    async fn attempt(&self, token: &TokenRef, ctx: &ResolveContext) -> Result<Option<IconDescriptor>, ResolveError> {
        let Some(url) = token.url() else {
            return Ok(None);
        };
        let Some(raw_seed) = SCHEMES.iter().find_map(|scheme| url.strip_prefix(*scheme)) else {
            return Ok(None);
        };

        let seed = parse_seed(raw_seed)?;
        let svg = ctx
            .renderer
            .render(&seed)
            .map_err(|e| ResolveError::new(FailureKind::Unknown, format!("generative render failed: {e}")))?;

        let size = token.display_size;
        let svg = svg.replacen(RENDERED_SIZE, &format!(r#"<svg width="{size}" height="{size}""#), 1);
        Ok(Some(IconDescriptor::markup(svg, self.name())))
    }
}
