//! Application configuration structures.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Largest `recheck_delay` whose interval still fits in seconds.
const MAX_RECHECK_DELAY: u64 = u64::MAX / 60;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Minutes between successive polls of the same board
    #[serde(default = "defaults::recheck_delay")]
    pub recheck_delay: u64,

    /// Strip HTML from post bodies before matching
    #[serde(default = "defaults::clean_comments")]
    pub clean_comments: bool,

    /// Seconds between starting consecutive board pollers
    #[serde(default = "defaults::startup_stagger")]
    pub startup_stagger_secs: u64,

    /// How match handlers are scheduled
    #[serde(default)]
    pub dispatch: DispatchMode,

    /// HTTP board provider settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Scan rules, evaluated in order
    #[serde(default)]
    pub scans: Vec<ScanConfig>,
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.scans.is_empty() {
            return Err(AppError::config("No scans defined"));
        }
        for (i, scan) in self.scans.iter().enumerate() {
            if scan.board_names().is_empty() {
                return Err(AppError::config(format!(
                    "scans[{i}] ({:?}) has no boards",
                    scan.description
                )));
            }
        }
        if self.recheck_delay == 0 {
            return Err(AppError::config("recheck_delay must be > 0"));
        }
        if self.recheck_delay > MAX_RECHECK_DELAY {
            return Err(AppError::config(format!(
                "recheck_delay must be at most {MAX_RECHECK_DELAY} minutes"
            )));
        }
        self.provider.validate()
    }

    /// Delay between polls of one board.
    pub fn recheck_interval(&self) -> Duration {
        Duration::from_secs(self.recheck_delay.saturating_mul(60))
    }

    /// Delay between starting consecutive board pollers.
    pub fn startup_stagger(&self) -> Duration {
        Duration::from_secs(self.startup_stagger_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recheck_delay: defaults::recheck_delay(),
            clean_comments: defaults::clean_comments(),
            startup_stagger_secs: defaults::startup_stagger(),
            dispatch: DispatchMode::default(),
            provider: ProviderConfig::default(),
            scans: Vec::new(),
        }
    }
}

/// Scheduling policy for match handlers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Each handler runs on its own task; pollers never wait for it
    #[default]
    Concurrent,
    /// Handlers run one at a time behind a shared lock
    Serialized,
}

/// A single scan rule as written in the configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Free-form label shown alongside matches
    #[serde(default)]
    pub description: String,

    /// Check only the topic post instead of every post in the thread
    #[serde(default = "defaults::topics_only")]
    pub topics_only: bool,

    /// Space-separated board names
    pub boards: String,

    /// Phrases matched as plain substrings
    #[serde(default)]
    pub terms: Vec<String>,

    /// Tokens matched as whole words
    #[serde(default)]
    pub words: Vec<String>,
}

impl ScanConfig {
    /// Board names this rule covers.
    pub fn board_names(&self) -> BTreeSet<String> {
        self.boards.split_whitespace().map(str::to_string).collect()
    }
}

/// HTTP board provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the JSON API
    #[serde(default = "defaults::api_url")]
    pub api_url: String,

    /// Base URL used to build human-facing post links
    #[serde(default = "defaults::site_url")]
    pub site_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between thread requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Maximum concurrent thread requests per board
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl ProviderConfig {
    fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            return Err(AppError::config("provider.user_agent is empty"));
        }
        if self.timeout_secs == 0 {
            return Err(AppError::config("provider.timeout_secs must be > 0"));
        }
        if self.max_concurrent == 0 {
            return Err(AppError::config("provider.max_concurrent must be > 0"));
        }
        Ok(())
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_url: defaults::api_url(),
            site_url: defaults::site_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

mod defaults {
    // Scanner defaults
    pub fn recheck_delay() -> u64 {
        3
    }
    pub fn clean_comments() -> bool {
        true
    }
    pub fn startup_stagger() -> u64 {
        8
    }
    pub fn topics_only() -> bool {
        true
    }

    // Provider defaults
    pub fn api_url() -> String {
        "https://a.4cdn.org".into()
    }
    pub fn site_url() -> String {
        "https://boards.4chan.org".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; threadscan/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        1000
    }
    pub fn max_concurrent() -> usize {
        2
    }
}
