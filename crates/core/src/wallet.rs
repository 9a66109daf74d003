//! Interfaces to the wallet-side collaborators.
//!
//! Key management, transaction building and the wallet's own data access live
//! outside this workspace. The icon pipeline reaches them only through these
//! traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Error;

/// A token held by the wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSummary {
    pub token_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ticker: String,
    #[serde(default)]
    pub qty: f64,
    /// Icon or document URL declared at genesis.
    #[serde(default)]
    pub url: Option<String>,
}

/// Genesis details for one token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    pub token_id: String,
    /// Group token an NFT was minted from.
    #[serde(default)]
    pub parent_group_id: Option<String>,
}

/// Mutable-metadata document attached to a token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutableMetadata {
    #[serde(default)]
    pub immutable_data: Option<serde_json::Value>,
    #[serde(default)]
    pub mutable_data: Option<MutableData>,
    #[serde(default)]
    pub token_stats: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutableData {
    /// Either a URL string or a media object `{ default, ipfs: { cid, path } }`.
    #[serde(default)]
    pub token_icon: Option<serde_json::Value>,
    #[serde(default)]
    pub schema: Option<String>,
}

impl MutableMetadata {
    /// The token icon, present only when both halves of the document exist.
    pub fn token_icon(&self) -> Option<&serde_json::Value> {
        self.immutable_data.as_ref()?;
        self.mutable_data.as_ref()?.token_icon.as_ref().filter(|icon| !icon.is_null())
    }
}

#[async_trait]
pub trait WalletHandle: Send + Sync {
    fn address(&self) -> String;

    /// Confirmed balance in satoshis.
    async fn balance(&self) -> Result<u64, Error>;

    /// Re-read the wallet's UTXO set and return it as the wallet reports it.
    async fn refresh_utxos(&self) -> Result<serde_json::Value, Error>;

    async fn list_tokens(&self) -> Result<Vec<TokenSummary>, Error>;

    async fn get_token_data(&self, token_id: &str) -> Result<TokenData, Error>;
}

#[async_trait]
pub trait MutableMetadataClient: Send + Sync {
    async fn get_data(&self, token_id: &str) -> Result<MutableMetadata, Error>;
}

/// Turns a numeric seed into SVG markup. Runs locally.
pub trait GenerativeRenderer: Send + Sync {
    fn render(&self, seed: &[u32]) -> Result<String, Error>;
}
