//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (TOKICON_*)
//! 2. TOML config file (if TOKICON_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! Nested sections are reachable from the environment with `__`, e.g.
//! `TOKICON_CACHE__MAX_ATTEMPTS=2` or `TOKICON_TIMEOUTS__HTTP_HEAD_MS=1500`.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::icon::CachePolicy;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (TOKICON_*)
/// 2. TOML config file (if TOKICON_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite settings store.
    ///
    /// Set via TOKICON_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to read from any icon source response.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Icon reference handed out when nothing better is available.
    #[serde(default = "default_placeholder_icon")]
    pub placeholder_icon: String,

    /// Write successful icon lookups through to the settings store.
    #[serde(default = "default_true")]
    pub persist_icons: bool,

    /// Icon cache policy.
    #[serde(default)]
    pub cache: IconCacheConfig,

    /// Per-source network timeouts.
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// IPFS gateways in probe order. `{CID}` marks subdomain gateways.
    #[serde(default = "default_gateways")]
    pub gateways: Vec<GatewayConfig>,

    /// How long a winning gateway is remembered per content id, in seconds.
    #[serde(default = "default_gateway_cache_ttl_secs")]
    pub gateway_cache_ttl_secs: u64,

    /// Gateway used when rewriting content-addressed metadata URLs and no probe winner exists.
    #[serde(default = "default_normalize_gateway")]
    pub normalize_gateway: String,

    /// Gateway hosts that answer directory CIDs with an HTML listing next to a `data.json`.
    #[serde(default = "default_listing_gateway_hosts")]
    pub listing_gateway_hosts: Vec<String>,

    /// Domains that never serve icons to us (CORS-hostile); requests to them are skipped.
    ///
    /// Set via TOKICON_BLOCKED_DOMAINS environment variable.
    #[serde(default = "default_blocked_domains")]
    pub blocked_domains: Vec<String>,

    /// Token metadata registry (BCMR) endpoints.
    #[serde(default = "default_registry_endpoints")]
    pub registry_endpoints: Vec<String>,

    /// jsDelivr mirrors of community icon repositories.
    #[serde(default = "default_jsdelivr_mirrors")]
    pub jsdelivr_mirrors: Vec<String>,

    /// GitHack mirrors of community icon repositories.
    #[serde(default = "default_githack_mirrors")]
    pub githack_mirrors: Vec<String>,

    /// Size directory requested from the icon repository mirrors.
    #[serde(default = "default_mirror_icon_size")]
    pub mirror_icon_size: u32,

    /// Base URL of the NFT marketplace icon API.
    #[serde(default = "default_nft_api_base")]
    pub nft_api_base: String,
}

/// Icon cache policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IconCacheConfig {
    /// Lifetime of a successful lookup, in seconds (default: 24h).
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Minimum spacing between attempts for one token, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Attempts per token before it is given up on. One keeps public gateways from being hammered.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Period of the expired-entry sweep, in seconds.
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

/// Network timeouts in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Mutable-metadata lookup.
    #[serde(default = "default_3000")]
    pub metadata_ms: u64,

    /// HEAD validation of a metadata-declared icon.
    #[serde(default = "default_3000")]
    pub validate_ms: u64,

    /// GET of content behind a gateway.
    #[serde(default = "default_3000")]
    pub content_ms: u64,

    /// HEAD of a plain http(s) icon URL.
    #[serde(default = "default_2000")]
    pub http_head_ms: u64,

    /// Metadata registry API request.
    #[serde(default = "default_5000")]
    pub registry_ms: u64,

    /// HEAD against a CDN mirror.
    #[serde(default = "default_3000")]
    pub mirror_ms: u64,

    /// Upper bound for a single resolver, whatever it does internally.
    #[serde(default = "default_resolver_deadline_ms")]
    pub resolver_deadline_ms: u64,
}

/// One probeable IPFS gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Prefix the CID is appended to, or a template containing `{CID}`.
    pub url: String,

    /// Probe timeout in milliseconds.
    #[serde(default = "default_2000")]
    pub timeout_ms: u64,
}

impl GatewayConfig {
    fn new(url: &str, timeout_ms: u64) -> Self {
        Self { url: url.to_string(), timeout_ms }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./tokicon-store.sqlite")
}

fn default_user_agent() -> String {
    "tokicon/0.1".into()
}

fn default_max_bytes() -> usize {
    2 * 1024 * 1024
}

fn default_placeholder_icon() -> String {
    "/token-placeholder.svg".into()
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_debounce_ms() -> u64 {
    5_000
}

fn default_max_attempts() -> u32 {
    1
}

fn default_cleanup_interval_secs() -> u64 {
    60 * 60
}

fn default_2000() -> u64 {
    2_000
}

fn default_3000() -> u64 {
    3_000
}

fn default_5000() -> u64 {
    5_000
}

fn default_resolver_deadline_ms() -> u64 {
    30_000
}

fn default_gateways() -> Vec<GatewayConfig> {
    vec![
        GatewayConfig::new("https://files.tokentiger.com/ipfs/view/", 3_000),
        GatewayConfig::new("https://gateway.pinata.cloud/ipfs/", 2_000),
        GatewayConfig::new("https://ipfs.io/ipfs/", 2_000),
        GatewayConfig::new("https://4everland.io/ipfs/", 2_000),
        GatewayConfig::new("https://dweb.link/ipfs/", 2_000),
        GatewayConfig::new("https://{CID}.ipfs.dweb.link/", 2_000),
        GatewayConfig::new("https://{CID}.w3s.link/", 2_000),
        GatewayConfig::new("https://nftstorage.link/ipfs/", 2_000),
        GatewayConfig::new("https://trustless-gateway.link/ipfs/", 2_000),
    ]
}

fn default_gateway_cache_ttl_secs() -> u64 {
    5 * 60
}

fn default_normalize_gateway() -> String {
    "files.tokentiger.com/ipfs/view".into()
}

fn default_listing_gateway_hosts() -> Vec<String> {
    vec!["files.tokentiger.com".into()]
}

fn default_blocked_domains() -> Vec<String> {
    vec!["tokens.bch.sx".into(), "bch.sx".into(), "simpleledger.cash".into()]
}

fn default_registry_endpoints() -> Vec<String> {
    vec!["https://bcmr.paytaca.com/api/tokens".into()]
}

fn default_jsdelivr_mirrors() -> Vec<String> {
    vec![
        "https://cdn.jsdelivr.net/gh/kosinusbch/slp-token-icons@master".into(),
        "https://cdn.jsdelivr.net/gh/Bitcoin-com/bch-token-icons@master".into(),
        "https://cdn.jsdelivr.net/gh/cgar420/bch-token-icons@master".into(),
    ]
}

fn default_githack_mirrors() -> Vec<String> {
    vec![
        "https://raw.githack.com/kosinusbch/slp-token-icons/master".into(),
        "https://raw.githack.com/Bitcoin-com/bch-token-icons/master".into(),
        "https://raw.githack.com/cgar420/bch-token-icons/master".into(),
    ]
}

fn default_mirror_icon_size() -> u32 {
    128
}

fn default_nft_api_base() -> String {
    "https://www.juungle.net/api/v1/nfts/icon".into()
}

impl Default for IconCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            debounce_ms: default_debounce_ms(),
            max_attempts: default_max_attempts(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            metadata_ms: 3_000,
            validate_ms: 3_000,
            content_ms: 3_000,
            http_head_ms: 2_000,
            registry_ms: 5_000,
            mirror_ms: 3_000,
            resolver_deadline_ms: default_resolver_deadline_ms(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            placeholder_icon: default_placeholder_icon(),
            persist_icons: true,
            cache: IconCacheConfig::default(),
            timeouts: TimeoutConfig::default(),
            gateways: default_gateways(),
            gateway_cache_ttl_secs: default_gateway_cache_ttl_secs(),
            normalize_gateway: default_normalize_gateway(),
            listing_gateway_hosts: default_listing_gateway_hosts(),
            blocked_domains: default_blocked_domains(),
            registry_endpoints: default_registry_endpoints(),
            jsdelivr_mirrors: default_jsdelivr_mirrors(),
            githack_mirrors: default_githack_mirrors(),
            mirror_icon_size: default_mirror_icon_size(),
            nft_api_base: default_nft_api_base(),
        }
    }
}

impl AppConfig {
    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `TOKICON_`
    /// 2. TOML file from `TOKICON_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("TOKICON_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("TOKICON_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Cache policy derived from the `cache` section.
    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            ttl: chrono::Duration::seconds(self.cache.ttl_secs as i64),
            debounce: chrono::Duration::milliseconds(self.cache.debounce_ms as i64),
            max_attempts: self.cache.max_attempts,
        }
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cache.cleanup_interval_secs)
    }

    pub fn gateway_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.gateway_cache_ttl_secs)
    }

    /// Longest a content lookup can take: every gateway probed in turn, then
    /// the content GET and one listing follow-up GET.
    pub fn content_path_ms(&self) -> u64 {
        let probes: u64 = self.gateways.iter().map(|g| g.timeout_ms).sum();
        probes + 2 * self.timeouts.content_ms
    }
}
