// src/net.rs
// Outbound HTTP, one page per key.
//
// The trait seam exists so the orchestrator can run against a scripted
// fetcher under test; the real implementation is a thin blocking reqwest
// wrapper with a realistic client identity and a hard timeout.

use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;

use crate::config::Config;
use crate::error::FetchError;

/// Fetch collaborator: one profile page per entity key.
pub trait Fetch {
    fn fetch(&self, ein: &str) -> Result<String, FetchError>;
}

pub struct HttpFetcher {
    client: Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(HttpFetcher {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, ein: &str) -> Result<String, FetchError> {
        let url = format!("{}/{}", self.base_url, ein);
        debug!(%url, "GET");
        let response = self.client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { status: status.as_u16() });
        }
        Ok(response.text()?)
    }
}
