use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_YOUTUBE_MAX_RESULTS: u32 = 12;
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 800;
pub const DEFAULT_TOAST_LIMIT: usize = 5;
pub const DEFAULT_TOAST_REMOVE_DELAY_MS: u64 = 5000;

#[derive(Debug, Clone)]
pub struct Config {
    /// Absent keys are not an error here; the lookup fails at call time instead.
    pub youtube_api_key: Option<String>,
    pub youtube_api_base: String,
    pub youtube_max_results: u32,
    pub search_debounce_ms: u64,
    pub toast_limit: usize,
    pub toast_remove_delay_ms: u64,
}

impl Config {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Config> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Config {
            youtube_api_key: lookup("YOUTUBE_API_KEY").filter(|k| !k.trim().is_empty()),
            youtube_api_base: lookup("YOUTUBE_API_BASE")
                .unwrap_or_else(|| DEFAULT_YOUTUBE_API_BASE.to_string()),
            youtube_max_results: get_parsed_or_default(
                &lookup,
                "YOUTUBE_MAX_RESULTS",
                DEFAULT_YOUTUBE_MAX_RESULTS,
            )?,
            search_debounce_ms: get_parsed_or_default(
                &lookup,
                "SEARCH_DEBOUNCE_MS",
                DEFAULT_SEARCH_DEBOUNCE_MS,
            )?,
            toast_limit: get_parsed_or_default(&lookup, "TOAST_LIMIT", DEFAULT_TOAST_LIMIT)?,
            toast_remove_delay_ms: get_parsed_or_default(
                &lookup,
                "TOAST_REMOVE_DELAY_MS",
                DEFAULT_TOAST_REMOVE_DELAY_MS,
            )?,
        })
    }

    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            quiet_period: Duration::from_millis(self.search_debounce_ms),
        }
    }

    pub fn queue_settings(&self) -> QueueSettings {
        QueueSettings {
            capacity: self.toast_limit,
            lifetime: Duration::from_millis(self.toast_remove_delay_ms),
        }
    }
}

/// Timing for [`DebouncedSearch`](crate::search::DebouncedSearch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSettings {
    pub quiet_period: Duration,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            quiet_period: Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS),
        }
    }
}

/// Bounds for [`NotificationQueue`](crate::notifications::NotificationQueue).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSettings {
    pub capacity: usize,
    pub lifetime: Duration,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_TOAST_LIMIT,
            lifetime: Duration::from_millis(DEFAULT_TOAST_REMOVE_DELAY_MS),
        }
    }
}

fn get_parsed_or_default<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for environment variable {key}: {raw:?}")),
        None => Ok(default),
    }
}
