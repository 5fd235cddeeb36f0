//! Environment-based configuration

use std::time::Duration;
use thiserror::Error;

pub const ENV_API_KEY: &str = "ALPHA_VANTAGE_API_KEY";
pub const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const ENV_BUCKET: &str = "S3_BUCKET_NAME";
pub const ENV_REGION: &str = "AWS_REGION";
pub const ENV_REQUEST_DELAY: &str = "REQUEST_DELAY_SECS";
pub const ENV_PROVIDER_URL: &str = "ALPHA_VANTAGE_BASE_URL";

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_REQUEST_DELAY_SECS: u64 = 12;
const DEFAULT_PROVIDER_URL: &str = "https://www.alphavantage.co";

/// Tickers charted on every run, in marker order
pub const SYMBOLS: [&str; 8] = ["JPM", "BAC", "C", "WFC", "GS", "MS", "BLK", "BX"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),
}

/// Run configuration, built once at startup and passed by reference
#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub provider_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
    pub region: String,
    pub request_delay_secs: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("provider_url", &self.provider_url)
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("request_delay_secs", &self.request_delay_secs)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load from the process environment, reading `.env` first if present
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup.
    ///
    /// Every required key is checked before returning so the error lists all
    /// of the missing ones. Blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut missing = Vec::new();
        let mut required = |key: &str| match get(key) {
            Some(v) => v,
            None => {
                missing.push(key.to_string());
                String::new()
            }
        };

        let api_key = required(ENV_API_KEY);
        let access_key_id = required(ENV_ACCESS_KEY_ID);
        let secret_access_key = required(ENV_SECRET_ACCESS_KEY);
        let bucket = required(ENV_BUCKET);

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        Ok(Self {
            api_key,
            provider_url: get(ENV_PROVIDER_URL).unwrap_or_else(|| DEFAULT_PROVIDER_URL.to_string()),
            access_key_id,
            secret_access_key,
            bucket,
            region: get(ENV_REGION).unwrap_or_else(|| DEFAULT_REGION.to_string()),
            request_delay_secs: get(ENV_REQUEST_DELAY)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_REQUEST_DELAY_SECS),
        })
    }

    /// Pause between provider requests
    pub fn request_delay(&self) -> Duration {
        Duration::from_secs(self.request_delay_secs)
    }
}
