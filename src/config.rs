use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8001";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful FAQ assistant.";
pub const DEFAULT_MAX_RESULTS: u32 = 5;
pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(30);

const DATABASE_FILE: &str = "faq_assistant.sqlite";

// --- Environment variables ---

pub const ENV_BASE_URL: &str = "FAQ_API_BASE_URL";
pub const ENV_HEALTH_INTERVAL: &str = "FAQ_HEALTH_INTERVAL_SECS";
pub const ENV_REQUEST_TIMEOUT: &str = "FAQ_REQUEST_TIMEOUT_SECS";
pub const ENV_DATA_DIR: &str = "FAQ_DATA_DIR";

/// Everything the client needs to know about where the backend lives and how to talk to it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub health_interval: Duration,
    // None leaves timeouts to the transport
    pub request_timeout: Option<Duration>,
    pub default_system_prompt: String,
    pub default_max_results: u32,
    pub data_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            health_interval: DEFAULT_HEALTH_INTERVAL,
            request_timeout: None,
            default_system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            default_max_results: DEFAULT_MAX_RESULTS,
            data_dir: PathBuf::from(".faq-assistant"),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable source; unset or blank values keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(base_url) = read(ENV_BASE_URL) {
            log::debug!("Using API base URL from {}: {}", ENV_BASE_URL, base_url);
            config.base_url = base_url.trim().to_string();
        }
        if let Some(raw) = read(ENV_HEALTH_INTERVAL) {
            let secs = parse_secs(ENV_HEALTH_INTERVAL, &raw)?;
            if secs == 0 {
                anyhow::bail!("{} must be greater than zero", ENV_HEALTH_INTERVAL);
            }
            config.health_interval = Duration::from_secs(secs);
        }
        if let Some(raw) = read(ENV_REQUEST_TIMEOUT) {
            let secs = parse_secs(ENV_REQUEST_TIMEOUT, &raw)?;
            config.request_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(dir) = read(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
        }
        Ok(config)
    }

    /// Absolute URL of a backend route, e.g. `endpoint("/health")`.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

fn parse_secs(name: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .context(format!("Invalid value for environment variable '{}': {}", name, raw))
}
