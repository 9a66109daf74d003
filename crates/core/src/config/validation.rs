//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

fn check_timeout(field: &str, value_ms: u64) -> Result<(), ConfigError> {
    if value_ms < 100 {
        return Err(invalid(field, "must be at least 100ms"));
    }
    if value_ms > 60_000 {
        return Err(invalid(field, "must not exceed 60000ms"));
    }
    Ok(())
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - any network timeout is below 100ms or above 60s
    /// - `cache.max_attempts` or `cache.ttl_secs` is 0
    /// - `gateways` is empty or holds a non-http(s) entry
    /// - `timeouts.resolver_deadline_ms` is shorter than a full gateway sweep
    /// - `user_agent` or `placeholder_icon` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        let t = &self.timeouts;
        check_timeout("timeouts.metadata_ms", t.metadata_ms)?;
        check_timeout("timeouts.validate_ms", t.validate_ms)?;
        check_timeout("timeouts.content_ms", t.content_ms)?;
        check_timeout("timeouts.http_head_ms", t.http_head_ms)?;
        check_timeout("timeouts.registry_ms", t.registry_ms)?;
        check_timeout("timeouts.mirror_ms", t.mirror_ms)?;
        check_timeout("timeouts.resolver_deadline_ms", t.resolver_deadline_ms)?;

        if self.cache.max_attempts == 0 {
            return Err(invalid("cache.max_attempts", "must be at least 1"));
        }
        if self.cache.ttl_secs == 0 {
            return Err(invalid("cache.ttl_secs", "must be greater than 0"));
        }
        if self.cache.cleanup_interval_secs == 0 {
            return Err(invalid("cache.cleanup_interval_secs", "must be greater than 0"));
        }

        if self.gateways.is_empty() {
            return Err(invalid("gateways", "at least one gateway is required"));
        }
        for gateway in &self.gateways {
            if !gateway.url.starts_with("https://") && !gateway.url.starts_with("http://") {
                return Err(ConfigError::Invalid {
                    field: "gateways".into(),
                    reason: format!("not an http(s) gateway: {}", gateway.url),
                });
            }
            check_timeout("gateways.timeout_ms", gateway.timeout_ms)?;
        }
        if t.resolver_deadline_ms < self.content_path_ms() {
            return Err(ConfigError::Invalid {
                field: "timeouts.resolver_deadline_ms".into(),
                reason: format!(
                    "{}ms cannot cover probing every gateway plus content fetches ({}ms)",
                    t.resolver_deadline_ms,
                    self.content_path_ms()
                ),
            });
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }
        if self.placeholder_icon.is_empty() {
            return Err(invalid("placeholder_icon", "must not be empty"));
        }

        if self.cache.max_attempts > 1 {
            tracing::warn!(
                max_attempts = self.cache.max_attempts,
                "cache.max_attempts above 1 retries unreliable public gateways for every failing token"
            );
        }

        Ok(())
    }
}
