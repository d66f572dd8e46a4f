use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::breaker::CircuitBreakerConfig;
use crate::retry::BackoffPolicy;
use crate::transport::FetchConfig;

/// Circuit breaker thresholds (`[breaker]` in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Failed calls (without an intervening success) that open the breaker.
    pub max_failures: u32,
    /// Seconds the breaker stays open before a probe is allowed.
    pub cooldown_secs: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            cooldown_secs: 60,
        }
    }
}

impl From<&BreakerConfig> for CircuitBreakerConfig {
    fn from(c: &BreakerConfig) -> Self {
        CircuitBreakerConfig {
            max_failures: c.max_failures.max(1),
            cooldown: Duration::from_secs(c.cooldown_secs),
        }
    }
}

/// Executor retry policy (`[retry]` in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per logical call (including the first).
    pub max_retries: u32,
    pub base_delay_ms: u64,
    /// Upper bound of the random jitter added to each delay.
    pub jitter_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            jitter_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryConfig {
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            base_delay: Duration::from_millis(self.base_delay_ms),
            jitter: Duration::from_millis(self.jitter_ms),
            max_delay: Some(Duration::from_millis(self.max_delay_ms)),
        }
    }
}

/// Transport-edge fetch retries (`[fetch]` in config.toml). Uncapped unless `max_delay_ms` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchRetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    #[serde(default)]
    pub max_delay_ms: Option<u64>,
}

impl Default for FetchRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: None,
        }
    }
}

impl From<&FetchRetryConfig> for FetchConfig {
    fn from(c: &FetchRetryConfig) -> Self {
        FetchConfig {
            max_retries: c.max_retries,
            backoff: BackoffPolicy {
                base_delay: Duration::from_millis(c.base_delay_ms),
                jitter: Duration::ZERO,
                max_delay: c.max_delay_ms.map(Duration::from_millis),
            },
        }
    }
}

/// HTTP timeouts (`[transport]` in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 15,
            timeout_secs: 30,
        }
    }
}

/// Global configuration loaded from `~/.config/rcall/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RcallConfig {
    /// Backend base URL; relative paths are resolved against it.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Path read by the health probe.
    #[serde(default = "default_health_path")]
    pub health_path: String,
    #[serde(default)]
    pub breaker: BreakerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub fetch: FetchRetryConfig,
    #[serde(default)]
    pub transport: TransportConfig,
}

impl Default for RcallConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            health_path: default_health_path(),
            breaker: BreakerConfig::default(),
            retry: RetryConfig::default(),
            fetch: FetchRetryConfig::default(),
            transport: TransportConfig::default(),
        }
    }
}

fn default_health_path() -> String {
    "/".to_string()
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rcall")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<RcallConfig> {
    load_or_init_at(config_path()?)
}

pub fn load_or_init_at(path: PathBuf) -> Result<RcallConfig> {
    if !path.exists() {
        let default_cfg = RcallConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: RcallConfig = toml::from_str(&data)?;
    Ok(cfg)
}
