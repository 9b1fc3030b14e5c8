//! Campaign specification and builder.
//!
//! A [`CampaignSpec`] is built fresh for every provisioning request and is
//! never reused across calls.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Result, ValidationError, ValidationRule};
use crate::types::{CampaignStatus, ChannelType, DeliveryMethod, Platform};

/// Everything needed to provision one runnable campaign on one platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignSpec {
    /// Campaign name shown in the platform UI.
    pub name: String,

    /// Advertising channel; must be supported by the creative's platform.
    pub channel_type: ChannelType,

    /// Daily budget in the smallest currency unit (cents).
    pub daily_budget: i64,

    /// First serving day, `YYYY-MM-DD`.
    pub start_date: String,

    /// Last serving day, `YYYY-MM-DD`.
    pub end_date: String,

    /// Status the campaign is created with.
    #[serde(default)]
    pub status: CampaignStatus,

    /// Budget pacing.
    #[serde(default)]
    pub delivery_method: DeliveryMethod,

    /// Platform-specific creative payload.
    pub creative: Creative,
}

/// Platform-specific creative payload. The variant decides the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "platform", rename_all = "kebab-case")]
pub enum Creative {
    SearchAds(SearchCreative),
    VideoAds(VideoCreative),
    SocialAds(SocialCreative),
}

impl Creative {
    pub fn platform(&self) -> Platform {
        match self {
            Creative::SearchAds(_) => Platform::SearchAds,
            Creative::VideoAds(_) => Platform::VideoAds,
            Creative::SocialAds(_) => Platform::SocialAds,
        }
    }
}

/// Responsive search ad text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCreative {
    pub headlines: Vec<String>,
    pub descriptions: Vec<String>,
    pub final_url: String,
    #[serde(default)]
    pub path1: Option<String>,
    #[serde(default)]
    pub path2: Option<String>,
}

/// Responsive video ad: text assets plus a hosted video and logo image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoCreative {
    /// Short headlines.
    pub headlines: Vec<String>,
    pub long_headlines: Vec<String>,
    pub descriptions: Vec<String>,
    /// YouTube URL or bare video id.
    pub video_url: String,
    /// Remotely hosted image, fetched and embedded at asset creation.
    pub logo_image_url: String,
    pub business_name: String,
    pub final_url: String,
    #[serde(default)]
    pub call_to_action: Option<String>,
}

/// Single-image link ad for social feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialCreative {
    /// Page the ad is published as.
    pub page_id: String,
    pub primary_text: String,
    pub headline: String,
    #[serde(default)]
    pub description: Option<String>,
    pub image_url: String,
    pub link_url: String,
    #[serde(default)]
    pub call_to_action: Option<String>,
    /// ISO 3166 alpha-2 country codes to target.
    #[serde(default = "default_countries")]
    pub countries: Vec<String>,
}

fn default_countries() -> Vec<String> {
    vec!["US".to_string()]
}

impl CampaignSpec {
    /// Create a new CampaignSpecBuilder.
    pub fn builder() -> CampaignSpecBuilder {
        CampaignSpecBuilder::default()
    }

    pub fn platform(&self) -> Platform {
        self.creative.platform()
    }

    /// SHA-256 of the canonical JSON form. Two runs of the same spec share a
    /// fingerprint, which is how duplicate provisioning is spotted in logs.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}

/// Builder for creating CampaignSpecs with a fluent API.
#[derive(Debug, Default)]
pub struct CampaignSpecBuilder {
    name: Option<String>,
    channel_type: Option<ChannelType>,
    daily_budget: i64,
    start_date: String,
    end_date: String,
    status: CampaignStatus,
    delivery_method: DeliveryMethod,
    creative: Option<Creative>,
}

impl CampaignSpecBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Override the platform's default channel.
    pub fn channel(mut self, channel: ChannelType) -> Self {
        self.channel_type = Some(channel);
        self
    }

    /// Daily budget in the smallest currency unit.
    pub fn daily_budget(mut self, minor_units: i64) -> Self {
        self.daily_budget = minor_units;
        self
    }

    /// Serving window as `YYYY-MM-DD` strings; checked by validation, not here.
    pub fn dates(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_date = start.into();
        self.end_date = end.into();
        self
    }

    pub fn status(mut self, status: CampaignStatus) -> Self {
        self.status = status;
        self
    }

    pub fn delivery(mut self, delivery: DeliveryMethod) -> Self {
        self.delivery_method = delivery;
        self
    }

    pub fn creative(mut self, creative: Creative) -> Self {
        self.creative = Some(creative);
        self
    }

    /// Build the spec. Only structural presence is checked here.
    pub fn build(self) -> Result<CampaignSpec> {
        let creative = self.creative.ok_or_else(|| {
            ValidationError::new(ValidationRule::Creative, "Creative payload is required")
        })?;
        let name = self.name.unwrap_or_default();
        let channel_type = self
            .channel_type
            .unwrap_or_else(|| creative.platform().default_channel());

        Ok(CampaignSpec {
            name,
            channel_type,
            daily_budget: self.daily_budget,
            start_date: self.start_date,
            end_date: self.end_date,
            status: self.status,
            delivery_method: self.delivery_method,
            creative,
        })
    }
}
