//! Video-Ads adapter.
//!
//! Builds the six-resource graph of a responsive video ad: budget, campaign,
//! ad group, a hosted video asset, an uploaded logo image asset and the ad
//! that references both.

use async_trait::async_trait;
use serde_json::{json, Value};

use adrelay_core::validation::youtube_video_id;
use adrelay_core::{
    AdapterError, ChannelType, ConfigurationError, Creative, ExecutionContext, Platform,
    StepRole, VideoCreative,
};

use crate::adapter::{unsupported, AdapterResult, AdapterSession, PlatformAdapter, StepRequest};
use crate::ads_api::{self, BatchMutateClient, DirectMutate};
use crate::config::{AdsApiConfig, HttpSettings};
use crate::creative::ImageFetcher;
use crate::search::{budget_body, text_assets};
use crate::vocab;

pub struct VideoAdsAdapter {
    config: AdsApiConfig,
    client: reqwest::Client,
    fetcher: ImageFetcher,
    timeout_ms: u64,
}

impl VideoAdsAdapter {
    pub fn new(config: AdsApiConfig, http: &HttpSettings) -> Result<Self, ConfigurationError> {
        let client = http.build_client()?;
        Ok(Self {
            config,
            fetcher: ImageFetcher::new(client.clone(), http),
            client,
            timeout_ms: http.timeout().as_millis() as u64,
        })
    }
}

impl PlatformAdapter for VideoAdsAdapter {
    fn platform(&self) -> Platform {
        Platform::VideoAds
    }

    fn open_session(
        &self,
        ctx: &ExecutionContext,
    ) -> Result<Box<dyn AdapterSession>, ConfigurationError> {
        let (direct, batch) = ads_api::open(
            Platform::VideoAds,
            &self.client,
            &self.config,
            ctx,
            self.timeout_ms,
        )?;
        Ok(Box::new(VideoAdsSession {
            direct,
            batch,
            fetcher: self.fetcher.clone(),
        }))
    }
}

struct VideoAdsSession {
    direct: DirectMutate,
    batch: BatchMutateClient,
    fetcher: ImageFetcher,
}

fn creative<'a>(req: &'a StepRequest<'_>) -> Result<&'a VideoCreative, AdapterError> {
    match &req.spec.creative {
        Creative::VideoAds(c) => Ok(c),
        other => Err(unsupported(other.platform(), "video ad creative")),
    }
}

fn bidding(channel: ChannelType) -> (&'static str, Value) {
    match channel {
        ChannelType::Video => ("targetCpm", json!({})),
        _ => ("maximizeConversions", json!({})),
    }
}

impl VideoAdsSession {
    async fn create_video_asset(&mut self, req: &StepRequest<'_>) -> AdapterResult {
        let creative = creative(req)?;
        let video_id = youtube_video_id(&creative.video_url).ok_or_else(|| {
            AdapterError::CreativeFetch {
                url: creative.video_url.clone(),
                message: "not a YouTube video reference".to_string(),
            }
        })?;
        let asset = json!({
            "name": format!("{} Video {}", req.spec.name, video_id),
            "type": "YOUTUBE_VIDEO",
            "youtubeVideoAsset": { "youtubeVideoId": video_id },
        });
        self.batch.create("assetOperation", asset).await
    }

    async fn create_image_asset(&mut self, req: &StepRequest<'_>) -> AdapterResult {
        let creative = creative(req)?;
        let image = self.fetcher.fetch(&creative.logo_image_url).await?;
        let asset = json!({
            "name": format!("{} Logo", req.spec.name),
            "type": "IMAGE",
            "imageAsset": {
                "data": image.to_base64(),
                "mimeType": image.mime.ads_mime_type(),
                "fileSize": image.bytes.len().to_string(),
            },
        });
        self.batch.create("assetOperation", asset).await
    }
}

#[async_trait]
impl AdapterSession for VideoAdsSession {
    fn platform(&self) -> Platform {
        Platform::VideoAds
    }

    async fn create_budget(&mut self, req: &StepRequest<'_>) -> AdapterResult {
        self.direct.create("campaignBudgets", budget_body(req)).await
    }

    async fn create_campaign(&mut self, req: &StepRequest<'_>) -> AdapterResult {
        let budget = req.parent(StepRole::Budget)?;
        let spec = req.spec;
        let (strategy, strategy_body) = bidding(spec.channel_type);

        let mut campaign = json!({
            "name": spec.name,
            "status": vocab::ads_status(spec.status),
            "advertisingChannelType": vocab::ads_channel(spec.channel_type).unwrap_or("DEMAND_GEN"),
            "campaignBudget": budget,
            "startDate": vocab::ads_date(req.window.start),
            "endDate": vocab::ads_date(req.window.end),
        });
        campaign[strategy] = strategy_body;
        self.batch.create("campaignOperation", campaign).await
    }

    async fn create_ad_group(&mut self, req: &StepRequest<'_>) -> AdapterResult {
        let campaign = req.parent(StepRole::Campaign)?;
        let mut ad_group = json!({
            "name": format!("{} Ad Group", req.spec.name),
            "campaign": campaign,
            "status": "ENABLED",
        });
        if req.spec.channel_type == ChannelType::Video {
            ad_group["type"] = json!("VIDEO_RESPONSIVE");
        }
        self.batch.create("adGroupOperation", ad_group).await
    }

    async fn create_asset(&mut self, slot: StepRole, req: &StepRequest<'_>) -> AdapterResult {
        match slot {
            StepRole::VideoAsset => self.create_video_asset(req).await,
            StepRole::ImageAsset => self.create_image_asset(req).await,
            _ => Err(unsupported(Platform::VideoAds, "create_asset")),
        }
    }

    async fn create_ad(&mut self, req: &StepRequest<'_>) -> AdapterResult {
        let ad_group = req.parent(StepRole::AdGroup)?;
        let video = req.parent(StepRole::VideoAsset)?;
        let logo = req.parent(StepRole::ImageAsset)?;
        let creative = creative(req)?;

        let mut responsive = json!({
            "headlines": text_assets(&creative.headlines),
            "longHeadlines": text_assets(&creative.long_headlines),
            "descriptions": text_assets(&creative.descriptions),
            "videos": [{ "asset": video }],
            "logoImages": [{ "asset": logo }],
            "businessName": { "text": creative.business_name.trim() },
        });
        if creative.call_to_action.is_some() {
            responsive["callToActions"] = json!([{
                "text": vocab::call_to_action(creative.call_to_action.as_deref())
            }]);
        }

        let ad_field = match req.spec.channel_type {
            ChannelType::Video => "videoResponsiveAd",
            _ => "demandGenVideoResponsiveAd",
        };
        let mut ad = json!({
            "name": format!("{} Ad", req.spec.name),
            "finalUrls": [creative.final_url],
        });
        ad[ad_field] = responsive;

        let ad_group_ad = json!({
            "adGroup": ad_group,
            "status": "ENABLED",
            "ad": ad,
        });
        self.batch.create("adGroupAdOperation", ad_group_ad).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ads_api::tests::{mock_token, test_config};
    use adrelay_core::{CampaignSpec, CampaignWindow, Credential, ResourceHandle};
    use chrono::NaiveDate;
    use mockito::{Matcher, Server};

    fn spec(logo_url: String) -> CampaignSpec {
        CampaignSpec::builder()
            .name("Launch film")
            .daily_budget(2_000)
            .dates("2030-06-01", "2030-06-30")
            .creative(Creative::VideoAds(VideoCreative {
                headlines: vec!["One".into(), "Two".into(), "Three".into()],
                long_headlines: vec!["A longer headline".into()],
                descriptions: vec!["First".into(), "Second".into()],
                video_url: "https://youtu.be/dQw4w9WgXcQ".into(),
                logo_image_url: logo_url,
                business_name: "Example Co".into(),
                final_url: "https://example.com".into(),
                call_to_action: None,
            }))
            .build()
            .unwrap()
    }

    fn window() -> CampaignWindow {
        CampaignWindow {
            start: NaiveDate::from_ymd_opt(2030, 6, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2030, 6, 30).unwrap(),
        }
    }

    fn session(server: &mockito::ServerGuard) -> Box<dyn AdapterSession> {
        let http = HttpSettings {
            retry_base_delay_ms: 1,
            ..Default::default()
        };
        let adapter = VideoAdsAdapter::new(test_config(server), &http).unwrap();
        let ctx = ExecutionContext::new("1234567890", Credential::new("refresh-secret"));
        adapter.open_session(&ctx).unwrap()
    }

    #[tokio::test]
    async fn test_video_asset_uses_extracted_id() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server, 1).await;
        let mutate = server
            .mock("POST", "/v17/customers/1234567890/googleAds:mutate")
            .match_body(Matcher::PartialJson(json!({
                "mutateOperations": [{ "assetOperation": { "create": {
                    "type": "YOUTUBE_VIDEO",
                    "youtubeVideoAsset": { "youtubeVideoId": "dQw4w9WgXcQ" }
                } } }]
            })))
            .with_status(200)
            .with_body(r#"{"mutateOperationResponses":[{"assetResult":{"resourceName":"customers/1234567890/assets/10"}}]}"#)
            .create_async()
            .await;

        let spec = spec("https://cdn.example.com/logo.png".into());
        let mut session = session(&server);
        let response = session
            .create_asset(StepRole::VideoAsset, &StepRequest::new(&spec, window()))
            .await
            .unwrap();
        assert_eq!(
            response.resource_id.as_deref(),
            Some("customers/1234567890/assets/10")
        );
        mutate.assert_async().await;
    }

    #[tokio::test]
    async fn test_image_asset_embeds_fetched_logo() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server, 1).await;
        let _logo = server
            .mock("GET", "/logo.png")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body("png")
            .create_async()
            .await;
        let mutate = server
            .mock("POST", "/v17/customers/1234567890/googleAds:mutate")
            .match_body(Matcher::PartialJson(json!({
                "mutateOperations": [{ "assetOperation": { "create": {
                    "type": "IMAGE",
                    "imageAsset": { "data": "cG5n", "mimeType": "IMAGE_PNG" }
                } } }]
            })))
            .with_status(200)
            .with_body(r#"{"mutateOperationResponses":[{"assetResult":{"resourceName":"customers/1234567890/assets/11"}}]}"#)
            .create_async()
            .await;

        let spec = spec(format!("{}/logo.png", server.url()));
        let mut session = session(&server);
        session
            .create_asset(StepRole::ImageAsset, &StepRequest::new(&spec, window()))
            .await
            .unwrap();
        mutate.assert_async().await;
    }

    #[tokio::test]
    async fn test_ad_requires_asset_parents() {
        let server = Server::new_async().await;
        let spec = spec("https://cdn.example.com/logo.png".into());
        let req = StepRequest::new(&spec, window())
            .with_parent(ResourceHandle::new(StepRole::AdGroup, "customers/1/adGroups/3"))
            .with_parent(ResourceHandle::new(StepRole::VideoAsset, "customers/1/assets/10"));

        let err = session(&server).create_ad(&req).await.unwrap_err();
        assert!(matches!(
            err,
            AdapterError::MissingParent(StepRole::ImageAsset)
        ));
    }
}
