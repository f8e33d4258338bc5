use std::{env, str::FromStr, time::Duration};

use tablemap_core::retry::ExponentialRetry;
use tablemap_core::{Result, TableError};

/// Store and retry configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    /// Custom endpoint URL, e.g. a local DynamoDB (default: none)
    pub endpoint_url: Option<String>,
    /// AWS region (default: "us-east-1")
    pub region: String,
    /// Attempts per operation including the first (default: 4)
    pub retry_max_attempts: u32,
    /// Delay after the first failed attempt, in milliseconds (default: 100)
    pub retry_base_delay_ms: u64,
    /// Upper bound for a single delay, in milliseconds (default: 5,000)
    pub retry_max_delay_ms: u64,
    /// Rows requested per scan page (default: 1,000)
    pub page_size: usize,
}

impl TableConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `TABLEMAP_ENDPOINT_URL` - Endpoint override, falls back to `AWS_ENDPOINT_URL`
    /// - `AWS_REGION` - AWS region (default: "us-east-1")
    /// - `TABLEMAP_RETRY_MAX_ATTEMPTS` - Attempts per operation (default: 4)
    /// - `TABLEMAP_RETRY_BASE_DELAY_MS` - Initial backoff (default: 100)
    /// - `TABLEMAP_RETRY_MAX_DELAY_MS` - Backoff cap (default: 5,000)
    /// - `TABLEMAP_PAGE_SIZE` - Scan page size (default: 1,000)
    ///
    /// Unset variables take their default; set but malformed ones are errors.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`TableConfig::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            endpoint_url: lookup("TABLEMAP_ENDPOINT_URL")
                .or_else(|| lookup("AWS_ENDPOINT_URL"))
                .filter(|url| !url.trim().is_empty()),
            region: lookup("AWS_REGION").unwrap_or(defaults.region),
            retry_max_attempts: parse_var(&lookup, "TABLEMAP_RETRY_MAX_ATTEMPTS")?
                .unwrap_or(defaults.retry_max_attempts),
            retry_base_delay_ms: parse_var(&lookup, "TABLEMAP_RETRY_BASE_DELAY_MS")?
                .unwrap_or(defaults.retry_base_delay_ms),
            retry_max_delay_ms: parse_var(&lookup, "TABLEMAP_RETRY_MAX_DELAY_MS")?
                .unwrap_or(defaults.retry_max_delay_ms),
            page_size: parse_var(&lookup, "TABLEMAP_PAGE_SIZE")?.unwrap_or(defaults.page_size),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.retry_max_attempts == 0 {
            return Err(TableError::Config(
                "TABLEMAP_RETRY_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }
        if self.page_size == 0 {
            return Err(TableError::Config(
                "TABLEMAP_PAGE_SIZE must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds the exponential backoff policy described by this configuration.
    pub fn retry_policy(&self) -> ExponentialRetry {
        ExponentialRetry::new(
            self.retry_max_attempts,
            Duration::from_millis(self.retry_base_delay_ms),
            Duration::from_millis(self.retry_max_delay_ms),
        )
    }

    /// Returns a display string for the target environment.
    pub fn target_display(&self) -> String {
        match &self.endpoint_url {
            Some(url) => format!("Local DynamoDB ({})", url),
            None => format!("AWS DynamoDB (region: {})", self.region),
        }
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            region: "us-east-1".to_string(),
            retry_max_attempts: 4,
            retry_base_delay_ms: 100,
            retry_max_delay_ms: 5_000,
            page_size: 1_000,
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| TableError::Config(format!("{key} has an invalid value: {raw:?}"))),
    }
}
