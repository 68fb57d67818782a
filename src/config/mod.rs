// src/config/mod.rs - Application configuration with TOML loading

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::SteamId;

/// Settings for the word filter and warning tracker subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Master switch for chat filtering.
    pub enabled: bool,
    /// When set, matches only increment trigger counters. No ledger
    /// entries are created and no handlers run.
    pub dry: bool,
    /// Whether exceeded events are delivered to the operator channel.
    pub ping_discord: bool,
    /// Cumulative weight a user must strictly exceed to trigger
    /// escalation.
    pub max_weight: u32,
    /// Interval between expiry sweeps, in seconds.
    pub check_timeout_secs: u64,
    /// Maximum age of a warning before it stops counting, in seconds.
    pub match_timeout_secs: u64,
    /// Clear a user's ledger after their warnings exceeded the limit,
    /// giving them a cooldown instead of instantly re-escalating.
    pub reset_on_escalation: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dry: false,
            ping_discord: true,
            max_weight: 6,
            check_timeout_secs: 5,
            match_timeout_secs: 120,
            reset_on_escalation: false,
        }
    }
}

impl FilterConfig {
    pub fn check_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.check_timeout_secs.max(1))
    }

    pub fn match_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.match_timeout_secs as i64)
    }
}

/// Operator-facing notification channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    pub log_channel_id: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            log_channel_id: String::new(),
        }
    }
}

/// General instance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Site owner, used as the source identity for automatic bans.
    pub owner: SteamId,
    pub site_name: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            owner: SteamId::new(0),
            site_name: "chatwarden".to_string(),
        }
    }
}

/// Top level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub filters: FilterConfig,
    pub discord: DiscordConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file. A missing file yields the
    /// defaults so a fresh checkout runs without any setup.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;

        info!("Loaded configuration from {}", path.display());

        Ok(config)
    }
}
