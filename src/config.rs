use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_LEAGUE: &str = "English Premier League";

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const MIN_TIMEOUT_SECS: u64 = 10;
const LOG_DIR: &str = "matchcast";
const LOG_FILE: &str = "matchcast.log";

#[derive(Debug, Clone)]
pub struct Config {
    /// `None` only in demo mode.
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub request_timeout: Duration,
    pub default_league: String,
    pub demo: bool,
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source so tests don't have
    /// to touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let demo = var("MATCHCAST_DEMO")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);

        let api_key = var("API_KEY").or_else(|| var("GEMINI_API_KEY"));
        if api_key.is_none() && !demo {
            return Err(ConfigError::MissingApiKey);
        }

        let api_base = var("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        if !(api_base.starts_with("https://") || api_base.starts_with("http://")) {
            return Err(ConfigError::Invalid {
                name: "GEMINI_API_BASE",
                value: api_base,
            });
        }

        let timeout_secs = var("GEMINI_TIMEOUT_SECS")
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .max(MIN_TIMEOUT_SECS);

        let log_file = var("MATCHCAST_LOG_FILE")
            .map(PathBuf::from)
            .or_else(|| default_log_path(var("XDG_CACHE_HOME"), var("HOME")));

        Ok(Self {
            api_key,
            model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_base: api_base.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(timeout_secs),
            default_league: var("DEFAULT_LEAGUE").unwrap_or_else(|| DEFAULT_LEAGUE.to_string()),
            demo,
            log_file,
        })
    }
}

fn default_log_path(xdg_cache: Option<String>, home: Option<String>) -> Option<PathBuf> {
    if let Some(base) = xdg_cache {
        return Some(PathBuf::from(base).join(LOG_DIR).join(LOG_FILE));
    }
    let home = home?;
    Some(PathBuf::from(home).join(".cache").join(LOG_DIR).join(LOG_FILE))
}
