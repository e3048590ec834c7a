//! GovernorConfig - 環境変数から読み込む設定
//!
//! Defaults first, then trimmed `PANOQ_*` overrides, then `validate()`.

use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::queue::DEFAULT_MAX_CONCURRENCY;
use crate::retry::{DEFAULT_RETRY_BUDGET, RetryPolicy};

const DEFAULT_API_BASE_URL: &str = "http://localhost:4000";
const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;
const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be a non-negative integer")]
    ParseInt(String),

    #[error("{0} must be a number")]
    ParseFloat(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GovernorConfig {
    pub api_base_url: String,
    pub max_concurrency: usize,
    pub default_retry_budget: u32,
    pub backoff_base_ms: u64,
    pub backoff_multiplier: f64,
    pub attempt_timeout_ms: Option<u64>,
    pub page_size: u32,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            default_retry_budget: DEFAULT_RETRY_BUDGET,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            attempt_timeout_ms: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl GovernorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`GovernorConfig::from_env`] over an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.api_base_url = optional_trimmed(&lookup, "PANOQ_API_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(config.api_base_url);
        config.max_concurrency =
            parse_usize(&lookup, "PANOQ_MAX_CONCURRENCY", config.max_concurrency)?;
        config.default_retry_budget = parse_u32(
            &lookup,
            "PANOQ_DEFAULT_RETRY_BUDGET",
            config.default_retry_budget,
        )?;
        config.backoff_base_ms =
            parse_u64(&lookup, "PANOQ_BACKOFF_BASE_MS", config.backoff_base_ms)?;
        config.backoff_multiplier = parse_f64(
            &lookup,
            "PANOQ_BACKOFF_MULTIPLIER",
            config.backoff_multiplier,
        )?;
        config.attempt_timeout_ms = match optional_trimmed(&lookup, "PANOQ_ATTEMPT_TIMEOUT_MS") {
            Some(raw) => Some(
                raw.parse::<u64>()
                    .map_err(|_| ConfigError::ParseInt("PANOQ_ATTEMPT_TIMEOUT_MS".to_string()))?,
            ),
            None => None,
        };
        config.page_size = parse_u32(&lookup, "PANOQ_PAGE_SIZE", config.page_size)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(ConfigError::InvalidConfiguration(
                "PANOQ_API_BASE_URL must start with http:// or https://".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "PANOQ_MAX_CONCURRENCY must be greater than 0".to_string(),
            ));
        }
        if self.backoff_base_ms == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "PANOQ_BACKOFF_BASE_MS must be greater than 0".to_string(),
            ));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidConfiguration(
                "PANOQ_BACKOFF_MULTIPLIER must be a finite number >= 1".to_string(),
            ));
        }
        if self.attempt_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidConfiguration(
                "PANOQ_ATTEMPT_TIMEOUT_MS must be greater than 0 when set".to_string(),
            ));
        }
        if self.page_size == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "PANOQ_PAGE_SIZE must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_millis(self.backoff_base_ms),
            self.backoff_multiplier,
        )
    }

    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout_ms.map(Duration::from_millis)
    }
}

fn optional_trimmed<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_u32<F>(lookup: &F, key: &str, default: u32) -> Result<u32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match optional_trimmed(lookup, key) {
        Some(raw) => raw
            .parse::<u32>()
            .map_err(|_| ConfigError::ParseInt(key.to_string())),
        None => Ok(default),
    }
}

fn parse_u64<F>(lookup: &F, key: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match optional_trimmed(lookup, key) {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| ConfigError::ParseInt(key.to_string())),
        None => Ok(default),
    }
}

fn parse_usize<F>(lookup: &F, key: &str, default: usize) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match optional_trimmed(lookup, key) {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| ConfigError::ParseInt(key.to_string())),
        None => Ok(default),
    }
}

fn parse_f64<F>(lookup: &F, key: &str, default: f64) -> Result<f64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match optional_trimmed(lookup, key) {
        Some(raw) => raw
            .parse::<f64>()
            .map_err(|_| ConfigError::ParseFloat(key.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<GovernorConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        GovernorConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = load(&[]).unwrap();

        assert_eq!(config, GovernorConfig::default());
        assert_eq!(config.max_concurrency, 1);
        assert_eq!(config.default_retry_budget, 2);
        assert_eq!(config.retry_policy(), RetryPolicy::standard());
        assert_eq!(config.attempt_timeout(), None);
    }

    #[test]
    fn overrides_are_trimmed_and_parsed() {
        let config = load(&[
            ("PANOQ_API_BASE_URL", " https://gallery.example.com/ "),
            ("PANOQ_MAX_CONCURRENCY", "3"),
            ("PANOQ_DEFAULT_RETRY_BUDGET", "0"),
            ("PANOQ_BACKOFF_BASE_MS", "250"),
            ("PANOQ_BACKOFF_MULTIPLIER", "1.5"),
            ("PANOQ_ATTEMPT_TIMEOUT_MS", "8000"),
            ("PANOQ_PAGE_SIZE", "24"),
        ])
        .unwrap();

        assert_eq!(config.api_base_url, "https://gallery.example.com");
        assert_eq!(config.max_concurrency, 3);
        assert_eq!(config.default_retry_budget, 0);
        assert_eq!(
            config.retry_policy().next_delay(1),
            Duration::from_millis(375)
        );
        assert_eq!(config.attempt_timeout(), Some(Duration::from_secs(8)));
        assert_eq!(config.page_size, 24);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = load(&[("PANOQ_MAX_CONCURRENCY", "   ")]).unwrap();
        assert_eq!(config.max_concurrency, 1);
    }

    #[test]
    fn unparsable_numbers_name_the_variable() {
        assert_eq!(
            load(&[("PANOQ_DEFAULT_RETRY_BUDGET", "-1")]),
            Err(ConfigError::ParseInt("PANOQ_DEFAULT_RETRY_BUDGET".to_string()))
        );
        assert_eq!(
            load(&[("PANOQ_BACKOFF_MULTIPLIER", "fast")]),
            Err(ConfigError::ParseFloat("PANOQ_BACKOFF_MULTIPLIER".to_string()))
        );
    }

    #[rstest]
    #[case("PANOQ_API_BASE_URL", "ftp://gallery")]
    #[case("PANOQ_MAX_CONCURRENCY", "0")]
    #[case("PANOQ_BACKOFF_BASE_MS", "0")]
    #[case("PANOQ_BACKOFF_MULTIPLIER", "0.5")]
    #[case("PANOQ_BACKOFF_MULTIPLIER", "inf")]
    #[case("PANOQ_ATTEMPT_TIMEOUT_MS", "0")]
    #[case("PANOQ_PAGE_SIZE", "0")]
    fn invalid_values_are_rejected(#[case] key: &str, #[case] value: &str) {
        let err = load(&[(key, value)]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfiguration(message) if message.contains(key)));
    }
}
