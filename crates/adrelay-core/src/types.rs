//! Common types shared by every provisioning component.

use std::fmt;

use serde::{Deserialize, Serialize};

/// External advertising platform a pipeline provisions against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    /// Keyword search advertising.
    SearchAds,
    /// Video advertising with responsive video ads.
    VideoAds,
    /// Social feed advertising.
    SocialAds,
}

impl Platform {
    /// All supported platforms, in registry order.
    pub const ALL: [Platform; 3] = [Platform::SearchAds, Platform::VideoAds, Platform::SocialAds];

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::SearchAds => "Search-Ads",
            Platform::VideoAds => "Video-Ads",
            Platform::SocialAds => "Social-Ads",
        }
    }

    /// URL path segment used by the HTTP surface.
    pub fn slug(&self) -> &'static str {
        match self {
            Platform::SearchAds => "search-ads",
            Platform::VideoAds => "video-ads",
            Platform::SocialAds => "social-ads",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Platform::ALL.into_iter().find(|p| p.slug() == slug)
    }

    /// Channel used when the request does not name one.
    pub fn default_channel(&self) -> ChannelType {
        match self {
            Platform::SearchAds => ChannelType::Search,
            Platform::VideoAds => ChannelType::DemandGen,
            Platform::SocialAds => ChannelType::Social,
        }
    }

    /// Channels the platform's pipeline knows how to build.
    pub fn supports_channel(&self, channel: ChannelType) -> bool {
        match self {
            Platform::SearchAds => matches!(channel, ChannelType::Search),
            Platform::VideoAds => matches!(channel, ChannelType::Video | ChannelType::DemandGen),
            Platform::SocialAds => matches!(channel, ChannelType::Social),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Kind of resource created on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Budget,
    Campaign,
    AdGroup,
    Asset,
    Ad,
}

/// The slot a resource fills in a pipeline. Several roles may share a kind
/// (video and image assets are both `Asset`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepRole {
    Budget,
    Campaign,
    AdGroup,
    VideoAsset,
    ImageAsset,
    Creative,
    Ad,
}

impl StepRole {
    pub fn kind(&self) -> ResourceKind {
        match self {
            StepRole::Budget => ResourceKind::Budget,
            StepRole::Campaign => ResourceKind::Campaign,
            StepRole::AdGroup => ResourceKind::AdGroup,
            StepRole::VideoAsset | StepRole::ImageAsset | StepRole::Creative => ResourceKind::Asset,
            StepRole::Ad => ResourceKind::Ad,
        }
    }

    /// Pipeline state during which this role is created.
    pub fn state(&self) -> PipelineState {
        match self {
            StepRole::Budget => PipelineState::CreateBudget,
            StepRole::Campaign => PipelineState::CreateCampaign,
            StepRole::AdGroup => PipelineState::CreateAdGroup,
            StepRole::VideoAsset | StepRole::ImageAsset | StepRole::Creative => {
                PipelineState::CreateCreativeAssets
            }
            StepRole::Ad => PipelineState::CreateAd,
        }
    }

    /// Key used in JSON responses (`adGroup`, `videoAsset`, ...).
    pub fn key(&self) -> &'static str {
        match self {
            StepRole::Budget => "budget",
            StepRole::Campaign => "campaign",
            StepRole::AdGroup => "adGroup",
            StepRole::VideoAsset => "videoAsset",
            StepRole::ImageAsset => "imageAsset",
            StepRole::Creative => "creative",
            StepRole::Ad => "ad",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            StepRole::Budget => "budget",
            StepRole::Campaign => "campaign",
            StepRole::AdGroup => "ad group",
            StepRole::VideoAsset => "video asset",
            StepRole::ImageAsset => "image asset",
            StepRole::Creative => "creative",
            StepRole::Ad => "ad",
        }
    }
}

impl fmt::Display for StepRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// State of a provisioning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Validate,
    CreateBudget,
    CreateCampaign,
    CreateAdGroup,
    CreateCreativeAssets,
    CreateAd,
    Done,
    Failed,
}

impl PipelineState {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

/// Status the campaign is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Enabled,
    /// Created paused so nothing spends before review (default).
    #[default]
    Paused,
}

/// Advertising channel of the campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    Search,
    Video,
    DemandGen,
    Social,
}

/// How the daily budget is paced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    #[default]
    Standard,
    Accelerated,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_state_terminal() {
        assert!(PipelineState::Done.is_terminal());
        assert!(PipelineState::Failed.is_terminal());
        assert!(!PipelineState::CreateAdGroup.is_terminal());
    }

    #[test]
    fn test_asset_roles_share_kind() {
        assert_eq!(StepRole::VideoAsset.kind(), ResourceKind::Asset);
        assert_eq!(StepRole::ImageAsset.kind(), ResourceKind::Asset);
        assert_eq!(StepRole::Creative.kind(), ResourceKind::Asset);
        assert_eq!(StepRole::ImageAsset.state(), PipelineState::CreateCreativeAssets);
    }

    #[test]
    fn test_platform_slug_round_trip() {
        for platform in Platform::ALL {
            assert_eq!(Platform::from_slug(platform.slug()), Some(platform));
        }
        assert_eq!(Platform::from_slug("display-ads"), None);
    }

    #[test]
    fn test_channel_support() {
        assert!(Platform::VideoAds.supports_channel(ChannelType::DemandGen));
        assert!(!Platform::VideoAds.supports_channel(ChannelType::Search));
        assert!(Platform::SearchAds.supports_channel(Platform::SearchAds.default_channel()));
        assert!(serde_json::from_str::<ChannelType>("\"display\"").is_err());
    }
}
