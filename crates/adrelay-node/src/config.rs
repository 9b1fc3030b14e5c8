//! Node configuration.
//!
//! Loaded from environment variables with the prefix `ADRELAY` and `__` as
//! the section separator, e.g. `ADRELAY__VIDEO_ADS__DEVELOPER_TOKEN`.

use adrelay_adapters::{AdsApiConfig, HttpSettings, SocialApiConfig};
use adrelay_dispatch::ModelConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub search_ads: AdsApiConfig,
    #[serde(default)]
    pub video_ads: AdsApiConfig,
    #[serde(default)]
    pub social_ads: SocialApiConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::from_builder(config::Config::builder().add_source(
            config::Environment::with_prefix("ADRELAY")
                .separator("__")
                .try_parsing(true),
        ))
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, config::ConfigError> {
        builder.build()?.try_deserialize()
    }
}
