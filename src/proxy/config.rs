use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const API_BASE_ENV: &str = "FRONTDESK_API_BASE";
pub const HTTP_TIMEOUT_ENV: &str = "FRONTDESK_HTTP_TIMEOUT_MS";

const DEFAULT_API_BASE: &str = "http://localhost:3000";
const DEFAULT_TIMEOUT: Duration = Duration::from_millis(15_000);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            request_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ProxyConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(base) = std::env::var(API_BASE_ENV) {
            let base = base.trim();
            if !base.is_empty() {
                config.base_url = base.to_string();
            }
        }

        if let Ok(raw) = std::env::var(HTTP_TIMEOUT_ENV) {
            let millis: u64 = raw
                .trim()
                .parse()
                .map_err(|err| anyhow!("{HTTP_TIMEOUT_ENV} must be milliseconds: {err}"))?;
            config.request_timeout = Duration::from_millis(millis);
        }

        Ok(config)
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}
