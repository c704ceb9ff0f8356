use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{AppError, Result};

/// Engine configuration. Every field is a recognized tunable with an
/// environment-variable override; defaults match production values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Rows per listing page.
    pub page_size: u32,
    /// TTL for composed listing results, in seconds.
    pub listing_ttl_secs: u64,
    /// TTL for aggregate counters (e.g. reputation), in seconds.
    pub counter_ttl_secs: u64,
    /// TTL for short-lived flags (e.g. unresolved-report queue), in seconds.
    pub flag_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            listing_ttl_secs: default_listing_ttl_secs(),
            counter_ttl_secs: default_counter_ttl_secs(),
            flag_ttl_secs: default_flag_ttl_secs(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            page_size: env_parsed("FEED_PAGE_SIZE", default_page_size)?,
            listing_ttl_secs: env_parsed("LISTING_CACHE_TTL_SECS", default_listing_ttl_secs)?,
            counter_ttl_secs: env_parsed("COUNTER_CACHE_TTL_SECS", default_counter_ttl_secs)?,
            flag_ttl_secs: env_parsed("FLAG_CACHE_TTL_SECS", default_flag_ttl_secs)?,
        })
    }

    pub fn listing_ttl(&self) -> Duration {
        Duration::from_secs(self.listing_ttl_secs)
    }

    pub fn counter_ttl(&self) -> Duration {
        Duration::from_secs(self.counter_ttl_secs)
    }

    pub fn flag_ttl(&self) -> Duration {
        Duration::from_secs(self.flag_ttl_secs)
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: fn() -> T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::Config(format!("invalid value for {}: {}", name, raw))),
        Err(_) => Ok(default()),
    }
}

fn default_page_size() -> u32 {
    25
}

fn default_listing_ttl_secs() -> u64 {
    300
}

fn default_counter_ttl_secs() -> u64 {
    3600
}

fn default_flag_ttl_secs() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_recognized_tunables() {
        let config = Config::default();
        assert_eq!(config.page_size, 25);
        assert_eq!(config.listing_ttl_secs, 300);
        assert_eq!(config.counter_ttl_secs, 3600);
        assert_eq!(config.flag_ttl_secs, 60);
    }

    #[test]
    fn from_env_falls_back_to_defaults() {
        // None of the override vars are set in the test environment.
        let config = Config::from_env().unwrap();
        assert_eq!(config.page_size, Config::default().page_size);
        assert_eq!(config.listing_ttl(), Duration::from_secs(300));
    }
}
