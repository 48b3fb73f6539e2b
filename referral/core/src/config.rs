// Copyright (c) 2024 The Botho Foundation

//! Referral service configuration types.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{address::Address, referral::referral_link};

/// Errors loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Main referral service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferralConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerSettings,

    /// Referral tracking settings
    #[serde(default)]
    pub referral: ReferralSettings,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Socket address to listen on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Origins allowed by CORS. Empty allows `http://localhost` on any port.
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Maximum accepted request body size in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Referral tracking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralSettings {
    /// Path to SQLite database
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Public site URL used to build referral links
    #[serde(default = "default_site_url")]
    pub site_url: String,

    /// Number of entries returned by the leaderboard
    #[serde(default = "default_leaderboard_size")]
    pub leaderboard_size: usize,

    /// How long a writer waits for a locked database, in milliseconds
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_listen_addr() -> String {
    "0.0.0.0:3002".to_string()
}

fn default_max_body_bytes() -> usize {
    10 * 1024
}

fn default_db_path() -> String {
    "referrals.db".to_string()
}

fn default_site_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_leaderboard_size() -> usize {
    10
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            allowed_origins: Vec::new(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for ReferralSettings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            site_url: default_site_url(),
            leaderboard_size: default_leaderboard_size(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl ReferralConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

impl ReferralSettings {
    /// Invite link for `address` on the configured site.
    pub fn referral_link(&self, address: &Address) -> String {
        referral_link(&self.site_url, address)
    }
}
