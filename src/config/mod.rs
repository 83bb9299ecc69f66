//! Configuration management for the bums runner
//!
//! This module handles loading and validating configuration from a TOML file
//! (or the legacy `config.json`), with environment variable overrides.

pub mod inputs;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub use inputs::{load_accounts, load_proxies, Roster};

/// Default TOML configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "bums.toml";

/// Legacy JSON configuration file (`{"maxUpgradeCost": N}`)
pub const LEGACY_CONFIG_FILE: &str = "config.json";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote API settings
    pub api: ApiConfig,

    /// Batch scheduler settings
    pub scheduler: SchedulerConfig,

    /// Upgrade planner settings
    pub upgrades: UpgradeConfig,

    /// Task sweep settings
    pub tasks: TaskConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Remote API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API base URL
    pub base_url: String,

    /// Service used to resolve a proxy's external IP
    pub ip_check_url: String,

    /// Invitation code sent with every login
    pub invitation_code: String,

    /// Key mixed into the collection checksum
    pub secret_key: String,

    /// Gang joined by accounts without one
    pub default_gang: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Timeout for the external IP lookup in seconds
    pub ip_check_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://api.bums.bot"),
            ip_check_url: String::from("https://api.ipify.org?format=json"),
            invitation_code: String::from("FXVePI68"),
            secret_key: String::from("7be2a16a82054ee58398c5edb7ac4a5a"),
            default_gang: String::from("cryptohomea"),
            request_timeout_secs: 30,
            ip_check_timeout_secs: 10,
        }
    }
}

/// Batch scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Accounts processed concurrently per batch
    pub concurrency: usize,

    /// Wall-clock budget for one account pipeline in seconds
    pub account_timeout_secs: u64,

    /// Delay after each remote-affecting step in seconds
    pub step_delay_secs: u64,

    /// Delay between batches in seconds
    pub batch_cooldown_secs: u64,

    /// Delay between full passes in seconds
    pub pass_cooldown_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            account_timeout_secs: 600,
            step_delay_secs: 5,
            batch_cooldown_secs: 3,
            pass_cooldown_secs: 300,
        }
    }
}

/// Upgrade planner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeConfig {
    /// Most an account may spend on a single upgrade
    #[serde(alias = "maxUpgradeCost")]
    pub max_upgrade_cost: i64,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            max_upgrade_cost: 1_000_000,
        }
    }
}

/// Task sweep configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Extra or replacement episode codes, keyed by episode number
    pub episode_codes: BTreeMap<String, String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Config {
    /// Resolve configuration: explicit file, else `bums.toml`, else the
    /// legacy `config.json`, else defaults. Environment overrides apply last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None if Path::new(LEGACY_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(LEGACY_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file (TOML, or legacy JSON by extension)
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        if path.extension().is_some_and(|ext| ext == "json") {
            let legacy: UpgradeConfig = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config file: {}", path.display()))?;
            return Ok(Self {
                upgrades: legacy,
                ..Self::default()
            });
        }

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Override values from `BUMS_*` environment variables
    pub fn apply_env(&mut self) {
        fn var<T: std::str::FromStr>(name: &str) -> Option<T> {
            std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
        }

        if let Some(v) = var("BUMS_CONCURRENCY") {
            self.scheduler.concurrency = v;
        }
        if let Some(v) = var("BUMS_ACCOUNT_TIMEOUT") {
            self.scheduler.account_timeout_secs = v;
        }
        if let Some(v) = var("BUMS_STEP_DELAY") {
            self.scheduler.step_delay_secs = v;
        }
        if let Some(v) = var("BUMS_BATCH_COOLDOWN") {
            self.scheduler.batch_cooldown_secs = v;
        }
        if let Some(v) = var("BUMS_PASS_COOLDOWN") {
            self.scheduler.pass_cooldown_secs = v;
        }
        if let Some(v) = var("BUMS_MAX_UPGRADE_COST") {
            self.upgrades.max_upgrade_cost = v;
        }
        if let Some(v) = var("BUMS_BASE_URL") {
            self.api.base_url = v;
        }
        if let Some(v) = var("BUMS_INVITATION_CODE") {
            self.api.invitation_code = v;
        }
        if let Some(v) = var("BUMS_SECRET_KEY") {
            self.api.secret_key = v;
        }
        if let Some(v) = var("BUMS_DEFAULT_GANG") {
            self.api.default_gang = v;
        }
        if let Some(v) = var("BUMS_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = var("BUMS_LOG_FORMAT") {
            self.logging.format = v;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.concurrency == 0 {
            anyhow::bail!("scheduler.concurrency must be greater than 0");
        }

        if self.scheduler.account_timeout_secs == 0 {
            anyhow::bail!("scheduler.account_timeout_secs must be greater than 0");
        }

        if self.api.request_timeout_secs == 0 {
            anyhow::bail!("api.request_timeout_secs must be greater than 0");
        }

        if self.upgrades.max_upgrade_cost < 0 {
            anyhow::bail!("upgrades.max_upgrade_cost must not be negative");
        }

        url::Url::parse(&self.api.base_url)
            .with_context(|| format!("api.base_url is not a valid URL: {}", self.api.base_url))?;

        for key in self.tasks.episode_codes.keys() {
            if key.parse::<u32>().is_err() {
                anyhow::bail!("tasks.episode_codes key '{key}' is not an episode number");
            }
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    #[must_use]
    pub fn ip_check_timeout(&self) -> Duration {
        Duration::from_secs(self.api.ip_check_timeout_secs)
    }

    #[must_use]
    pub fn account_timeout(&self) -> Duration {
        Duration::from_secs(self.scheduler.account_timeout_secs)
    }

    #[must_use]
    pub fn step_delay(&self) -> Duration {
        Duration::from_secs(self.scheduler.step_delay_secs)
    }

    #[must_use]
    pub fn batch_cooldown(&self) -> Duration {
        Duration::from_secs(self.scheduler.batch_cooldown_secs)
    }

    #[must_use]
    pub fn pass_cooldown(&self) -> Duration {
        Duration::from_secs(self.scheduler.pass_cooldown_secs)
    }
}
