// src/config.rs

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

// Net defaults
pub const BASE_URL: &str = "https://www.charitynavigator.org/ein";
pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:127.0) Gecko/20100101 Firefox/127.0";
pub const TIMEOUT_SECS: u64 = 15;

// Store
pub const DEFAULT_DB: &str = "charity_data.db";

// Tabular input: a row carrying this token is the column header, not a key.
pub const HEADER_TOKEN: &str = "EIN";

// Pacing between successful fetches; randomized within the range. Be polite.
pub const PAUSE_MIN_MS: u64 = 400;
pub const PAUSE_MAX_MS: u64 = 1200;

/// Run configuration. Defaults come from the constants above; an optional
/// TOML file overrides them, and CLI flags override that.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub db_path: PathBuf,
    pub pause_min_ms: u64,
    pub pause_max_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: BASE_URL.to_string(),
            user_agent: USER_AGENT.to_string(),
            timeout_secs: TIMEOUT_SECS,
            db_path: PathBuf::from(DEFAULT_DB),
            pause_min_ms: PAUSE_MIN_MS,
            pause_max_ms: PAUSE_MAX_MS,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Pause bounds as a well-ordered inclusive range.
    pub fn pause_range(&self) -> (u64, u64) {
        let min = self.pause_min_ms.min(self.pause_max_ms);
        let max = self.pause_min_ms.max(self.pause_max_ms);
        (min, max)
    }
}
