// src/error.rs
// Error taxonomy for the ingestion pipeline.
//
// Fetch and extraction errors are recoverable per key; store errors escalate
// and abort the run, since persistence integrity can no longer be assumed.

use thiserror::Error;

/// Outbound HTTP failure. Timeouts surface as `Transport` (reqwest folds
/// them into its transport error).
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status}")]
    Status { status: u16 },
}

/// A script-block fragment that could not be repaired into valid JSON.
/// Carries the original fragment for diagnostics.
#[derive(Debug, Error)]
#[error("malformed fragment: {fragment:?}")]
pub struct MalformedFragment {
    pub fragment: String,
}

/// SQLite-level failure. Unlike the per-key errors above, this one
/// propagates out of the run loop.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite failure: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("export failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration file problems; raised before any network or store activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}
