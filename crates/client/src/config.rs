// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration.
//!
//! Loaded from TOML; every key except `base_url` has a default.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// How requests that cannot reach the remote system are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreAndForwardMode {
    /// Nothing is deferred.
    None,
    /// A deferring event is raised; the application persists the request.
    Manual,
    /// The client persists the request and the coordinator drains it.
    #[default]
    Automatic,
}

impl StoreAndForwardMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreAndForwardMode::None => "none",
            StoreAndForwardMode::Manual => "manual",
            StoreAndForwardMode::Automatic => "automatic",
        }
    }
}

impl fmt::Display for StoreAndForwardMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StoreAndForwardMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" => Ok(StoreAndForwardMode::None),
            "manual" => Ok(StoreAndForwardMode::Manual),
            "automatic" => Ok(StoreAndForwardMode::Automatic),
            _ => Err(Error::Config(format!(
                "invalid store_and_forward '{s}'\n  hint: valid modes are: none, manual, automatic"
            ))),
        }
    }
}

/// OAuth2 client-credentials settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Renew this many seconds before the token expires.
    #[serde(default = "default_renew_margin_secs")]
    pub renew_margin_secs: u64,
}

impl AuthConfig {
    pub fn renew_margin(&self) -> Duration {
        Duration::from_secs(self.renew_margin_secs)
    }
}

/// Settings for one client instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Root of the remote API, e.g. `https://api.example/v1`.
    pub base_url: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_manual_entry_header")]
    pub manual_entry_header: String,
    /// Retries after the first attempt.
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
    #[serde(default = "default_auth_retry_delay_ms")]
    pub auth_retry_delay_ms: u64,
    #[serde(default = "default_not_found_retry_delay_ms")]
    pub not_found_retry_delay_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub store_and_forward: StoreAndForwardMode,
    #[serde(default)]
    pub bulk_as_single_packs: bool,
    #[serde(default = "default_max_bulk_pack_count")]
    pub max_bulk_pack_count: usize,
    #[serde(default = "default_recovery_poll_interval_ms")]
    pub recovery_poll_interval_ms: u64,
    #[serde(default = "default_true")]
    pub detect_repeated_requests: bool,
    #[serde(default = "default_repeated_request_window_secs")]
    pub repeated_request_window_secs: u64,
    #[serde(default = "default_cache_max_size")]
    pub cache_max_size: usize,
    #[serde(default = "default_cache_sweep_interval_ms")]
    pub cache_sweep_interval_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_manual_entry_header() -> String {
    "X-Manual-Entry".to_string()
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_interval_ms() -> u64 {
    1000
}

fn default_auth_retry_delay_ms() -> u64 {
    30_000
}

fn default_not_found_retry_delay_ms() -> u64 {
    30_000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_bulk_pack_count() -> usize {
    10_000
}

fn default_recovery_poll_interval_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

fn default_repeated_request_window_secs() -> u64 {
    60
}

fn default_cache_max_size() -> usize {
    1000
}

fn default_cache_sweep_interval_ms() -> u64 {
    10_000
}

fn default_renew_margin_secs() -> u64 {
    60
}

impl ClientConfig {
    /// A configuration with every default and the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        ClientConfig {
            base_url: base_url.into(),
            language: default_language(),
            manual_entry_header: default_manual_entry_header(),
            retry_count: default_retry_count(),
            retry_interval_ms: default_retry_interval_ms(),
            auth_retry_delay_ms: default_auth_retry_delay_ms(),
            not_found_retry_delay_ms: default_not_found_retry_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            store_and_forward: StoreAndForwardMode::default(),
            bulk_as_single_packs: false,
            max_bulk_pack_count: default_max_bulk_pack_count(),
            recovery_poll_interval_ms: default_recovery_poll_interval_ms(),
            detect_repeated_requests: true,
            repeated_request_window_secs: default_repeated_request_window_secs(),
            cache_max_size: default_cache_max_size(),
            cache_sweep_interval_ms: default_cache_sweep_interval_ms(),
            auth: None,
        }
    }

    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ClientConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::Config("base_url is empty".to_string()));
        }
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("invalid base_url '{}': {e}", self.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "invalid base_url '{}'\n  hint: use an http:// or https:// URL",
                self.base_url
            )));
        }
        if self.max_bulk_pack_count == 0 {
            return Err(Error::Config(
                "max_bulk_pack_count must be at least 1".to_string(),
            ));
        }
        if self.manual_entry_header.trim().is_empty() {
            return Err(Error::Config("manual_entry_header is empty".to_string()));
        }
        Ok(())
    }

    /// Total physical attempts per call: retries plus the first one.
    pub fn attempts(&self) -> u32 {
        self.retry_count.saturating_add(1)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn auth_retry_delay(&self) -> Duration {
        Duration::from_millis(self.auth_retry_delay_ms)
    }

    pub fn not_found_retry_delay(&self) -> Duration {
        Duration::from_millis(self.not_found_retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn recovery_poll_interval(&self) -> Duration {
        Duration::from_millis(self.recovery_poll_interval_ms)
    }

    pub fn repeated_request_window(&self) -> Duration {
        Duration::from_secs(self.repeated_request_window_secs)
    }

    pub fn cache_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.cache_sweep_interval_ms)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
