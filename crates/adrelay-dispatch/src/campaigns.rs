//! Campaign capabilities.
//!
//! One capability per platform pipeline plus `list_connected_platforms`.
//! Arguments use currency units; the campaign spec uses minor units.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

use adrelay_core::{
    validation, CampaignSpec, CampaignStatus, Creative, Platform, PlatformCredentials, SearchCreative,
    SocialCreative, VideoCreative,
};
use adrelay_pipeline::Pipeline;

use crate::capability::{Capability, CapabilityDescriptor, CapabilityError, CapabilityRegistry};
use crate::schema::{FieldKind, InputSchema};

const STATUS_CHOICES: &[&str] = &["enabled", "paused"];

fn text(min_len: usize) -> FieldKind {
    FieldKind::Text {
        min_len,
        max_len: None,
    }
}

fn list(min_items: usize, max_items: usize) -> FieldKind {
    FieldKind::TextList {
        min_items,
        max_items: Some(max_items),
    }
}

fn common_schema() -> InputSchema {
    InputSchema::new()
        .required(
            "campaignName",
            FieldKind::Text {
                min_len: validation::MIN_CAMPAIGN_NAME_LEN,
                max_len: Some(validation::MAX_CAMPAIGN_NAME_LEN),
            },
            "Campaign name.",
        )
        .required(
            "budgetAmount",
            FieldKind::PositiveNumber,
            "Daily budget in currency units, e.g. 25.50.",
        )
        .required("startDate", FieldKind::Date, "First day, YYYY-MM-DD.")
        .required("endDate", FieldKind::Date, "Last day, YYYY-MM-DD.")
        .optional(
            "status",
            FieldKind::Choice(STATUS_CHOICES),
            "Initial status; defaults to paused.",
        )
}

fn search_schema() -> InputSchema {
    common_schema()
        .required("headlines", list(3, 15), "3 to 15 headlines, 30 characters max.")
        .required("descriptions", list(2, 4), "2 to 4 descriptions, 90 characters max.")
        .required("finalUrl", FieldKind::Url, "Landing page URL.")
        .optional("path1", text(0), "First display path segment.")
        .optional("path2", text(0), "Second display path segment.")
}

fn video_schema() -> InputSchema {
    common_schema()
        .required("headlines", list(3, 5), "3 to 5 short headlines.")
        .required("longHeadlines", list(1, 5), "1 to 5 long headlines.")
        .required("descriptions", list(2, 5), "2 to 5 descriptions.")
        .required("videoUrl", text(1), "YouTube URL or video id.")
        .required("logoImageUrl", FieldKind::Url, "Logo image URL.")
        .required(
            "businessName",
            FieldKind::Text {
                min_len: 1,
                max_len: Some(25),
            },
            "Advertiser name shown with the ad.",
        )
        .required("finalUrl", FieldKind::Url, "Landing page URL.")
        .optional("callToAction", text(1), "Call to action label.")
}

fn social_schema() -> InputSchema {
    common_schema()
        .required("pageId", text(1), "Page the ad is published as.")
        .required("primaryText", text(1), "Main ad text.")
        .required("headline", text(1), "Headline under the image.")
        .required("imageUrl", FieldKind::Url, "Ad image URL.")
        .required("linkUrl", FieldKind::Url, "Destination URL.")
        .optional("description", text(0), "Link description.")
        .optional("callToAction", text(1), "Call to action, e.g. LEARN_MORE.")
        .optional(
            "countries",
            FieldKind::TextList {
                min_items: 1,
                max_items: None,
            },
            "Two-letter country codes; defaults to US.",
        )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommonArgs {
    campaign_name: String,
    budget_amount: f64,
    start_date: String,
    end_date: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchArgs {
    #[serde(flatten)]
    common: CommonArgs,
    headlines: Vec<String>,
    descriptions: Vec<String>,
    final_url: String,
    #[serde(default)]
    path1: Option<String>,
    #[serde(default)]
    path2: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoArgs {
    #[serde(flatten)]
    common: CommonArgs,
    headlines: Vec<String>,
    long_headlines: Vec<String>,
    descriptions: Vec<String>,
    video_url: String,
    logo_image_url: String,
    business_name: String,
    final_url: String,
    #[serde(default)]
    call_to_action: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SocialArgs {
    #[serde(flatten)]
    common: CommonArgs,
    page_id: String,
    primary_text: String,
    headline: String,
    image_url: String,
    link_url: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    call_to_action: Option<String>,
    #[serde(default)]
    countries: Option<Vec<String>>,
}

/// Currency units to minor units (cents), rounded to the nearest unit.
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

fn parse<T: DeserializeOwned>(args: &Value) -> Result<T, CapabilityError> {
    serde_json::from_value(args.clone()).map_err(|e| CapabilityError::InvalidArguments(e.to_string()))
}

fn build(common: CommonArgs, creative: Creative) -> Result<CampaignSpec, CapabilityError> {
    let status = match common.status.as_deref() {
        Some("enabled") => CampaignStatus::Enabled,
        _ => CampaignStatus::Paused,
    };
    Ok(CampaignSpec::builder()
        .name(common.campaign_name)
        .daily_budget(to_minor_units(common.budget_amount))
        .dates(common.start_date, common.end_date)
        .status(status)
        .creative(creative)
        .build()?)
}

/// Build a campaign spec for `platform` from validated arguments.
pub fn spec_from_args(platform: Platform, args: &Value) -> Result<CampaignSpec, CapabilityError> {
    match platform {
        Platform::SearchAds => {
            let a: SearchArgs = parse(args)?;
            build(
                a.common,
                Creative::SearchAds(SearchCreative {
                    headlines: a.headlines,
                    descriptions: a.descriptions,
                    final_url: a.final_url,
                    path1: a.path1,
                    path2: a.path2,
                }),
            )
        }
        Platform::VideoAds => {
            let a: VideoArgs = parse(args)?;
            build(
                a.common,
                Creative::VideoAds(VideoCreative {
                    headlines: a.headlines,
                    long_headlines: a.long_headlines,
                    descriptions: a.descriptions,
                    video_url: a.video_url,
                    logo_image_url: a.logo_image_url,
                    business_name: a.business_name,
                    final_url: a.final_url,
                    call_to_action: a.call_to_action,
                }),
            )
        }
        Platform::SocialAds => {
            let a: SocialArgs = parse(args)?;
            build(
                a.common,
                Creative::SocialAds(SocialCreative {
                    page_id: a.page_id,
                    primary_text: a.primary_text,
                    headline: a.headline,
                    description: a.description,
                    image_url: a.image_url,
                    link_url: a.link_url,
                    call_to_action: a.call_to_action,
                    countries: a
                        .countries
                        .filter(|c| !c.is_empty())
                        .unwrap_or_else(|| vec!["US".to_string()]),
                }),
            )
        }
    }
}

/// Name of the campaign-creation capability bound to `platform`.
pub fn capability_name(platform: Platform) -> &'static str {
    match platform {
        Platform::SearchAds => "create_search_ads_campaign",
        Platform::VideoAds => "create_video_ads_campaign",
        Platform::SocialAds => "create_social_ads_campaign",
    }
}

fn descriptor(platform: Platform) -> CapabilityDescriptor {
    let (description, schema) = match platform {
        Platform::SearchAds => (
            "Create a keyword search campaign with a responsive search ad.",
            search_schema(),
        ),
        Platform::VideoAds => (
            "Create a video campaign with a responsive video ad built from a YouTube video and a logo image.",
            video_schema(),
        ),
        Platform::SocialAds => (
            "Create a social feed campaign with a single-image link ad.",
            social_schema(),
        ),
    };
    CapabilityDescriptor {
        name: capability_name(platform),
        description: description.to_string(),
        trigger_policy: format!(
            "Call only when the user explicitly asks to create a {} campaign and has given every required field. \
             Ask for anything missing instead of guessing, and never call it for general questions.",
            platform
        ),
        schema,
        platform: Some(platform),
    }
}

/// Runs one platform's provisioning pipeline.
pub struct CreateCampaign {
    descriptor: CapabilityDescriptor,
    pipeline: Arc<Pipeline>,
}

impl CreateCampaign {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            descriptor: descriptor(pipeline.platform()),
            pipeline,
        }
    }
}

#[async_trait]
impl Capability for CreateCampaign {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn invoke(
        &self,
        args: &Value,
        credentials: &PlatformCredentials,
    ) -> Result<Value, CapabilityError> {
        let platform = self.pipeline.platform();
        let ctx = credentials
            .for_platform(platform)
            .filter(|ctx| !ctx.credential.is_blank())
            .ok_or(CapabilityError::NotConnected(platform))?;

        let spec = spec_from_args(platform, args)?;
        let result = self.pipeline.run(&spec, ctx).await?;

        if !result.success {
            return Err(CapabilityError::StepFailed {
                summary: result.summary.clone(),
                created: result.handles.iter().map(|h| h.id.clone()).collect(),
            });
        }

        info!(run_id = %result.run_id, %platform, "Campaign created from conversation");
        let resources: Map<String, Value> = result
            .handles
            .iter()
            .map(|h| (h.role.key().to_string(), json!(h.id)))
            .collect();
        Ok(json!({
            "success": true,
            "message": result.summary,
            "runId": result.run_id,
            "fingerprint": result.fingerprint,
            "resources": resources,
        }))
    }
}

/// Reports which platforms the conversation can provision on.
pub struct ListConnectedPlatforms {
    descriptor: CapabilityDescriptor,
}

impl Default for ListConnectedPlatforms {
    fn default() -> Self {
        Self {
            descriptor: CapabilityDescriptor {
                name: "list_connected_platforms",
                description: "List the advertising platforms connected in this conversation.".to_string(),
                trigger_policy: "Call first when the user wants to advertise but has not said where, \
                                 or before creating a campaign on a platform whose connection is unknown."
                    .to_string(),
                schema: InputSchema::new(),
                platform: None,
            },
        }
    }
}

#[async_trait]
impl Capability for ListConnectedPlatforms {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn invoke(
        &self,
        _args: &Value,
        credentials: &PlatformCredentials,
    ) -> Result<Value, CapabilityError> {
        let connected: Vec<&str> = credentials
            .connected()
            .iter()
            .map(|p| p.display_name())
            .collect();
        let available: Vec<&str> = Platform::ALL.iter().map(|p| p.display_name()).collect();
        Ok(json!({ "connected": connected, "available": available }))
    }
}

/// Registry with `list_connected_platforms` and one creation capability per
/// pipeline.
pub fn campaign_registry(pipelines: impl IntoIterator<Item = Arc<Pipeline>>) -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    registry.register(Arc::new(ListConnectedPlatforms::default()));
    for pipeline in pipelines {
        registry.register(Arc::new(CreateCampaign::new(pipeline)));
    }
    registry
}
