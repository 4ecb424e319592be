//! Configuration loading from TOML with environment variable overrides.
//!
//! Reads `config.toml` into strongly-typed structs. Every field has a
//! default, so a missing file or section still yields a usable config.
//! The market input and the betting switch can be overridden from the
//! environment (`KALSHI_URL`, `KALSHI_BETTING`).

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::engine::aggregator::DEFAULT_MAX_CONCURRENT;
use crate::platforms::kalshi::{KalshiEnvironment, DEFAULT_PAGE_LIMIT};
use crate::strategy::AdvisorConfig;

/// Environment variable carrying the market URL or ticker.
pub const MARKET_URL_ENV: &str = "KALSHI_URL";
/// Environment variable enabling the betting workflow.
pub const BETTING_ENV: &str = "KALSHI_BETTING";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub market: MarketConfig,
    pub venue: VenueConfig,
    pub advisor: AdvisorSection,
    pub workflow: WorkflowConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct MarketConfig {
    /// Default market URL or ticker.
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct VenueConfig {
    /// "auto" (detect from the input URL), "demo" or "prod".
    pub environment: String,
    pub timeout_secs: u64,
    pub min_request_interval_ms: u64,
    pub max_concurrent_quotes: usize,
    pub page_limit: u32,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            environment: "auto".to_string(),
            timeout_secs: 30,
            min_request_interval_ms: 100,
            max_concurrent_quotes: DEFAULT_MAX_CONCURRENT,
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl VenueConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    /// Configured environment, or the one implied by `input`.
    pub fn resolve_environment(&self, input: &str) -> Result<KalshiEnvironment> {
        if self.environment.trim().eq_ignore_ascii_case("auto") {
            Ok(KalshiEnvironment::detect(input))
        } else {
            self.environment
                .parse()
                .with_context(|| format!("Invalid venue.environment: {}", self.environment))
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AdvisorSection {
    /// Minimum edge as a probability (0.10 = 10 percentage points).
    pub edge_threshold: Decimal,
}

impl Default for AdvisorSection {
    fn default() -> Self {
        Self {
            edge_threshold: dec!(0.10),
        }
    }
}

impl From<&AdvisorSection> for AdvisorConfig {
    fn from(section: &AdvisorSection) -> Self {
        AdvisorConfig {
            edge_threshold: section.edge_threshold,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Run the confirmation/betting workflow after the comparison table.
    pub enabled: bool,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Load `path` if it exists, otherwise use defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let threshold = self.advisor.edge_threshold;
        if threshold < Decimal::ZERO || threshold >= Decimal::ONE {
            anyhow::bail!("advisor.edge_threshold must be in [0, 1), got {threshold}");
        }
        if self.venue.timeout_secs == 0 {
            anyhow::bail!("venue.timeout_secs must be positive");
        }
        Ok(())
    }

    /// Market input: explicit argument, then `KALSHI_URL`, then config.
    pub fn market_input(&self, arg: Option<String>) -> Option<String> {
        arg.or_else(|| std::env::var(MARKET_URL_ENV).ok())
            .or_else(|| self.market.url.clone())
            .filter(|s| !s.trim().is_empty())
    }

    /// Whether the betting workflow should run (`KALSHI_BETTING` wins).
    pub fn betting_enabled(&self) -> bool {
        match std::env::var(BETTING_ENV) {
            Ok(v) => matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
            Err(_) => self.workflow.enabled,
        }
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
