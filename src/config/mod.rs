//! Configuration management for the kaatru pipeline
//!
//! This module handles loading and validating configuration from
//! environment variables and TOML files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Article fetching and extraction configuration
    pub scraper: ScraperConfig,

    /// Translation service configuration
    pub translator: TranslatorConfig,

    /// Per-run processing limits
    pub limits: LimitsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Scraper-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Scrape calls allowed per minute (global across all fetch tasks)
    pub requests_per_minute: u32,

    /// Standard delay between requests in seconds; the 429 cooldown is
    /// twice this value
    pub delay_between_requests_secs: u64,

    /// Total fetch attempts per request (first attempt included)
    pub max_retry_attempts: u32,

    /// Base delay in milliseconds for exponential backoff
    pub backoff_base_ms: u64,

    /// Cap in milliseconds on the backoff delay
    pub backoff_max_ms: u64,

    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,

    /// Maximum concurrent extraction chains
    pub concurrency: usize,

    /// Wall-clock budget in seconds for a single item (resolve + extract)
    pub per_item_timeout_secs: u64,

    /// Wall-clock budget in seconds for the whole fetch batch
    pub batch_deadline_secs: u64,

    /// Pause in milliseconds between strategy attempts on the same URL
    pub strategy_pause_ms: u64,

    /// User agent string; empty selects a rotating browser-like agent
    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 30,
            delay_between_requests_secs: 2,
            max_retry_attempts: 3,
            backoff_base_ms: 1000,
            backoff_max_ms: 30_000,
            request_timeout_secs: 30,
            concurrency: 5,
            per_item_timeout_secs: 90,
            batch_deadline_secs: 600,
            strategy_pause_ms: 1000,
            user_agent: String::new(),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Source language code (e.g. "en")
    pub source_language: String,

    /// Target language code (e.g. "ta")
    pub target_language: String,

    /// Translation calls allowed per minute (the service limit is global
    /// and low, which is why translation runs sequentially)
    pub calls_per_minute: u32,

    /// Base delay in milliseconds between translation calls; also the
    /// unit for the translator's attempt-proportional retry waits
    pub translation_delay_ms: u64,

    /// Total translation attempts per call
    pub max_retry_attempts: u32,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            source_language: "en".to_string(),
            target_language: "ta".to_string(),
            calls_per_minute: 20,
            translation_delay_ms: 500,
            max_retry_attempts: 3,
            request_timeout_secs: 30,
        }
    }
}

/// Per-run processing limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum entries processed in one run
    pub max_articles_per_run: usize,

    /// Minimum extracted text length in chars; shorter records are dropped
    pub min_article_length: usize,

    /// Longest text translated in a single call, in chars
    pub max_single_call_length: usize,

    /// Chunk ceiling in chars when splitting long text for translation
    pub chunk_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_articles_per_run: 50,
            min_article_length: 100,
            max_single_call_length: 15_000,
            chunk_size: 5_000,
        }
    }
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
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            scraper: ScraperConfig {
                requests_per_minute: env_parse(
                    "KAATRU_REQUESTS_PER_MINUTE",
                    defaults.scraper.requests_per_minute,
                ),
                delay_between_requests_secs: env_parse(
                    "KAATRU_REQUEST_DELAY",
                    defaults.scraper.delay_between_requests_secs,
                ),
                max_retry_attempts: env_parse(
                    "KAATRU_MAX_RETRIES",
                    defaults.scraper.max_retry_attempts,
                ),
                backoff_base_ms: env_parse("KAATRU_BACKOFF_BASE_MS", defaults.scraper.backoff_base_ms),
                backoff_max_ms: env_parse("KAATRU_BACKOFF_MAX_MS", defaults.scraper.backoff_max_ms),
                request_timeout_secs: env_parse(
                    "KAATRU_REQUEST_TIMEOUT",
                    defaults.scraper.request_timeout_secs,
                ),
                concurrency: env_parse("KAATRU_CONCURRENCY", defaults.scraper.concurrency),
                per_item_timeout_secs: env_parse(
                    "KAATRU_PER_ITEM_TIMEOUT",
                    defaults.scraper.per_item_timeout_secs,
                ),
                batch_deadline_secs: env_parse(
                    "KAATRU_BATCH_DEADLINE",
                    defaults.scraper.batch_deadline_secs,
                ),
                strategy_pause_ms: env_parse(
                    "KAATRU_STRATEGY_PAUSE_MS",
                    defaults.scraper.strategy_pause_ms,
                ),
                user_agent: std::env::var("KAATRU_USER_AGENT").unwrap_or_default(),
            },
            translator: TranslatorConfig {
                source_language: std::env::var("KAATRU_SOURCE_LANG")
                    .unwrap_or(defaults.translator.source_language),
                target_language: std::env::var("KAATRU_TARGET_LANG")
                    .unwrap_or(defaults.translator.target_language),
                calls_per_minute: env_parse(
                    "KAATRU_TRANSLATION_CALLS_PER_MINUTE",
                    defaults.translator.calls_per_minute,
                ),
                translation_delay_ms: env_parse(
                    "KAATRU_TRANSLATION_DELAY_MS",
                    defaults.translator.translation_delay_ms,
                ),
                max_retry_attempts: env_parse(
                    "KAATRU_TRANSLATION_MAX_RETRIES",
                    defaults.translator.max_retry_attempts,
                ),
                request_timeout_secs: env_parse(
                    "KAATRU_TRANSLATION_TIMEOUT",
                    defaults.translator.request_timeout_secs,
                ),
            },
            limits: LimitsConfig {
                max_articles_per_run: env_parse(
                    "KAATRU_MAX_ARTICLES",
                    defaults.limits.max_articles_per_run,
                ),
                min_article_length: env_parse(
                    "KAATRU_MIN_ARTICLE_LENGTH",
                    defaults.limits.min_article_length,
                ),
                max_single_call_length: env_parse(
                    "KAATRU_MAX_SINGLE_CALL_LENGTH",
                    defaults.limits.max_single_call_length,
                ),
                chunk_size: env_parse("KAATRU_CHUNK_SIZE", defaults.limits.chunk_size),
            },
            logging: LoggingConfig {
                level: std::env::var("KAATRU_LOG_LEVEL").unwrap_or(defaults.logging.level),
                format: std::env::var("KAATRU_LOG_FORMAT").unwrap_or(defaults.logging.format),
            },
        };

        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.scraper.requests_per_minute == 0 {
            anyhow::bail!("requests_per_minute must be greater than 0");
        }
        if self.scraper.concurrency == 0 {
            anyhow::bail!("concurrency must be greater than 0");
        }
        if self.scraper.max_retry_attempts == 0 {
            anyhow::bail!("max_retry_attempts must be greater than 0");
        }
        if self.translator.calls_per_minute == 0 {
            anyhow::bail!("translator calls_per_minute must be greater than 0");
        }
        if self.translator.source_language.is_empty() || self.translator.target_language.is_empty()
        {
            anyhow::bail!("source and target languages must be set");
        }
        if self.limits.chunk_size == 0 {
            anyhow::bail!("chunk_size must be greater than 0");
        }
        if self.limits.chunk_size > self.limits.max_single_call_length {
            anyhow::bail!("chunk_size must not exceed max_single_call_length");
        }
        if self.limits.min_article_length == 0 {
            anyhow::bail!("min_article_length must be greater than 0");
        }
        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.scraper.request_timeout_secs)
    }

    /// Get the standard inter-request delay as Duration
    #[must_use]
    pub fn request_delay(&self) -> Duration {
        Duration::from_secs(self.scraper.delay_between_requests_secs)
    }

    /// Get the per-item timeout as Duration
    #[must_use]
    pub fn per_item_timeout(&self) -> Duration {
        Duration::from_secs(self.scraper.per_item_timeout_secs)
    }

    /// Get the batch deadline as Duration
    #[must_use]
    pub fn batch_deadline(&self) -> Duration {
        Duration::from_secs(self.scraper.batch_deadline_secs)
    }

    /// Get the base translation delay as Duration
    #[must_use]
    pub fn translation_delay(&self) -> Duration {
        Duration::from_millis(self.translator.translation_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_match_documented_limits() {
        let config = Config::default();
        assert_eq!(config.scraper.requests_per_minute, 30);
        assert_eq!(config.translator.calls_per_minute, 20);
        assert_eq!(config.limits.max_articles_per_run, 50);
        assert_eq!(config.limits.min_article_length, 100);
        assert_eq!(config.limits.max_single_call_length, 15_000);
        assert_eq!(config.limits.chunk_size, 5_000);
    }

    #[test]
    fn test_invalid_concurrency() {
        let mut config = Config::default();
        config.scraper.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_chunk_size_must_fit_single_call() {
        let mut config = Config::default();
        config.limits.chunk_size = config.limits.max_single_call_length + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_languages_rejected() {
        let mut config = Config::default();
        config.translator.target_language.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[scraper]
requests_per_minute = 10
concurrency = 3

[translator]
target_language = "fr"

[limits]
max_articles_per_run = 5
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.scraper.requests_per_minute, 10);
        assert_eq!(config.scraper.concurrency, 3);
        assert_eq!(config.translator.target_language, "fr");
        assert_eq!(config.limits.max_articles_per_run, 5);
        // Unset fields fall back to defaults
        assert_eq!(config.limits.chunk_size, 5_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duration_helpers() {
        let config = Config::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.request_delay(), Duration::from_secs(2));
        assert_eq!(config.translation_delay(), Duration::from_millis(500));
    }
}
