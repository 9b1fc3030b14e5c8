//! Deployment-level adapter settings.
//!
//! These come from process configuration, never from a request. Secrets are
//! optional at load time; a missing one surfaces as a
//! [`ConfigurationError`] when a session is opened.

use std::time::Duration;

use adrelay_core::{ConfigurationError, Platform};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Shared HTTP behaviour for every outbound call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts for idempotent reads (creative downloads). Mutates are
    /// attempted once.
    #[serde(default = "default_fetch_retries")]
    pub fetch_retries: u32,

    /// Base delay between read attempts; doubled per attempt plus jitter.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Largest creative image accepted.
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_fetch_retries() -> u32 {
    3
}
fn default_retry_base_delay_ms() -> u64 {
    250
}
fn default_max_image_bytes() -> usize {
    DEFAULT_MAX_IMAGE_BYTES
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            fetch_retries: default_fetch_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Bound for one pipeline step: a token exchange plus every read
    /// attempt at the per-request timeout, and the longest backoff between
    /// attempts.
    pub fn step_timeout(&self) -> Duration {
        let attempts = self.fetch_retries.max(1);
        let base = self.retry_base_delay_ms;
        let backoff: u64 = (1..attempts)
            .map(|a| base.saturating_mul(1u64 << (a - 1).min(6)).saturating_add(base))
            .sum();
        self.timeout() * (attempts + 1) + Duration::from_millis(backoff)
    }

    /// Build the pooled client used by an adapter.
    pub fn build_client(&self) -> Result<reqwest::Client, ConfigurationError> {
        reqwest::Client::builder()
            .timeout(self.timeout())
            .build()
            .map_err(|e| ConfigurationError::Invalid {
                key: "http".to_string(),
                message: e.to_string(),
            })
    }
}

/// Settings for the mutate-style ads API used by the search and video
/// platforms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdsApiConfig {
    #[serde(default = "default_ads_base_url")]
    pub base_url: String,

    /// OAuth token endpoint for the refresh-token exchange.
    #[serde(default = "default_token_url")]
    pub token_url: String,

    #[serde(default = "default_ads_version")]
    pub api_version: String,

    #[serde(default)]
    pub developer_token: Option<String>,

    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub client_secret: Option<String>,
}

fn default_ads_base_url() -> String {
    "https://googleads.googleapis.com".to_string()
}
fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}
fn default_ads_version() -> String {
    "v17".to_string()
}

impl Default for AdsApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_ads_base_url(),
            token_url: default_token_url(),
            api_version: default_ads_version(),
            developer_token: None,
            client_id: None,
            client_secret: None,
        }
    }
}

/// Resolved secrets of an [`AdsApiConfig`].
#[derive(Clone)]
pub(crate) struct AdsApiSecrets {
    pub developer_token: String,
    pub client_id: String,
    pub client_secret: String,
}

impl AdsApiConfig {
    pub(crate) fn secrets(&self, platform: Platform) -> Result<AdsApiSecrets, ConfigurationError> {
        Ok(AdsApiSecrets {
            developer_token: required(platform, "developer_token", &self.developer_token)?,
            client_id: required(platform, "client_id", &self.client_id)?,
            client_secret: required(platform, "client_secret", &self.client_secret)?,
        })
    }
}

fn required(
    platform: Platform,
    key: &'static str,
    value: &Option<String>,
) -> Result<String, ConfigurationError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ConfigurationError::MissingSecret { platform, key })
}

/// Settings for the social graph API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialApiConfig {
    #[serde(default = "default_graph_url")]
    pub graph_url: String,

    #[serde(default = "default_graph_version")]
    pub api_version: String,
}

fn default_graph_url() -> String {
    "https://graph.facebook.com".to_string()
}
fn default_graph_version() -> String {
    "v19.0".to_string()
}

impl Default for SocialApiConfig {
    fn default() -> Self {
        Self {
            graph_url: default_graph_url(),
            api_version: default_graph_version(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_secret_names_key() {
        let config = AdsApiConfig {
            developer_token: Some("dev".into()),
            client_id: Some("  ".into()),
            ..Default::default()
        };
        let err = config.secrets(Platform::VideoAds).err().unwrap();
        assert_eq!(
            err,
            ConfigurationError::MissingSecret {
                platform: Platform::VideoAds,
                key: "client_id"
            }
        );
    }

    #[test]
    fn test_http_defaults() {
        let settings: HttpSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.timeout_secs, 30);
        assert_eq!(settings.max_image_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn test_step_timeout_covers_every_attempt() {
        let settings = HttpSettings::default();
        assert!(settings.step_timeout() > settings.timeout() * settings.fetch_retries);
        // 4 x 30 s plus backoff ceilings of 500 ms and 750 ms.
        assert_eq!(settings.step_timeout(), Duration::from_millis(121_250));

        let single = HttpSettings {
            fetch_retries: 0,
            ..HttpSettings::default()
        };
        assert_eq!(single.step_timeout(), Duration::from_secs(60));
    }
}
