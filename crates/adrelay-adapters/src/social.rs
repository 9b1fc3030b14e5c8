//! Social-Ads adapter.
//!
//! The graph API has no standalone budget: the daily budget rides on the ad
//! set (the ad group). The image is uploaded first, then wrapped in a
//! creative that the ad references.

use async_trait::async_trait;
use serde_json::json;

use adrelay_core::{
    AdapterError, ConfigurationError, Creative, ExecutionContext, Platform, SocialCreative,
    StepRole,
};

use crate::adapter::{
    unsupported, AdapterResponse, AdapterResult, AdapterSession, PlatformAdapter, StepRequest,
};
use crate::config::{HttpSettings, SocialApiConfig};
use crate::creative::ImageFetcher;
use crate::graph::{created_id, image_hash, GraphClient};
use crate::vocab;

pub struct SocialAdsAdapter {
    config: SocialApiConfig,
    client: reqwest::Client,
    fetcher: ImageFetcher,
    timeout_ms: u64,
}

impl SocialAdsAdapter {
    pub fn new(config: SocialApiConfig, http: &HttpSettings) -> Result<Self, ConfigurationError> {
        let client = http.build_client()?;
        Ok(Self {
            config,
            fetcher: ImageFetcher::new(client.clone(), http),
            client,
            timeout_ms: http.timeout().as_millis() as u64,
        })
    }
}

impl PlatformAdapter for SocialAdsAdapter {
    fn platform(&self) -> Platform {
        Platform::SocialAds
    }

    fn open_session(
        &self,
        ctx: &ExecutionContext,
    ) -> Result<Box<dyn AdapterSession>, ConfigurationError> {
        Ok(Box::new(SocialAdsSession {
            graph: GraphClient::new(self.client.clone(), &self.config, ctx, self.timeout_ms),
            fetcher: self.fetcher.clone(),
        }))
    }
}

struct SocialAdsSession {
    graph: GraphClient,
    fetcher: ImageFetcher,
}

fn creative<'a>(req: &'a StepRequest<'_>) -> Result<&'a SocialCreative, AdapterError> {
    match &req.spec.creative {
        Creative::SocialAds(c) => Ok(c),
        other => Err(unsupported(other.platform(), "social ad creative")),
    }
}

impl SocialAdsSession {
    async fn upload_image(&mut self, req: &StepRequest<'_>) -> AdapterResult {
        let creative = creative(req)?;
        let image = self.fetcher.fetch(&creative.image_url).await?;
        let body = json!({
            "bytes": image.to_base64(),
            "name": format!("{}.{}", req.spec.name, image.mime.extension()),
        });
        let raw = self.graph.create("adimages", &body).await?;
        Ok(AdapterResponse::new(image_hash(&raw), raw))
    }

    async fn create_creative(&mut self, req: &StepRequest<'_>) -> AdapterResult {
        let image_hash = req.parent(StepRole::ImageAsset)?;
        let creative = creative(req)?;

        let mut link_data = json!({
            "image_hash": image_hash,
            "link": creative.link_url,
            "message": creative.primary_text,
            "name": creative.headline,
            "call_to_action": {
                "type": vocab::call_to_action(creative.call_to_action.as_deref()),
                "value": { "link": creative.link_url },
            },
        });
        if let Some(description) = creative.description.as_deref().filter(|d| !d.is_empty()) {
            link_data["description"] = json!(description);
        }

        let body = json!({
            "name": format!("{} Creative", req.spec.name),
            "object_story_spec": {
                "page_id": creative.page_id,
                "link_data": link_data,
            },
        });
        self.post("adcreatives", body).await
    }

    async fn post(&self, edge: &str, body: serde_json::Value) -> AdapterResult {
        let raw = self.graph.create(edge, &body).await?;
        Ok(AdapterResponse::new(created_id(&raw), raw))
    }
}

#[async_trait]
impl AdapterSession for SocialAdsSession {
    fn platform(&self) -> Platform {
        Platform::SocialAds
    }

    async fn create_campaign(&mut self, req: &StepRequest<'_>) -> AdapterResult {
        let body = json!({
            "name": req.spec.name,
            "objective": "OUTCOME_TRAFFIC",
            "status": vocab::social_status(req.spec.status),
            "special_ad_categories": [],
        });
        self.post("campaigns", body).await
    }

    async fn create_ad_group(&mut self, req: &StepRequest<'_>) -> AdapterResult {
        let campaign = req.parent(StepRole::Campaign)?;
        let creative = creative(req)?;
        let countries: Vec<String> = creative
            .countries
            .iter()
            .map(|c| c.to_ascii_uppercase())
            .collect();

        let body = json!({
            "name": format!("{} Ad Set", req.spec.name),
            "campaign_id": campaign,
            "daily_budget": req.spec.daily_budget,
            "billing_event": "IMPRESSIONS",
            "optimization_goal": "LINK_CLICKS",
            "bid_strategy": "LOWEST_COST_WITHOUT_CAP",
            "pacing_type": [vocab::social_pacing(req.spec.delivery_method)],
            "targeting": { "geo_locations": { "countries": countries } },
            "start_time": vocab::social_start_time(req.window.start),
            "end_time": vocab::social_end_time(req.window.end),
            "status": vocab::social_status(req.spec.status),
        });
        self.post("adsets", body).await
    }

    async fn create_asset(&mut self, slot: StepRole, req: &StepRequest<'_>) -> AdapterResult {
        match slot {
            StepRole::ImageAsset => self.upload_image(req).await,
            StepRole::Creative => self.create_creative(req).await,
            _ => Err(unsupported(Platform::SocialAds, "create_asset")),
        }
    }

    async fn create_ad(&mut self, req: &StepRequest<'_>) -> AdapterResult {
        let ad_set = req.parent(StepRole::AdGroup)?;
        let creative_id = req.parent(StepRole::Creative)?;
        let body = json!({
            "name": format!("{} Ad", req.spec.name),
            "adset_id": ad_set,
            "creative": { "creative_id": creative_id },
            "status": vocab::social_status(req.spec.status),
        });
        self.post("ads", body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adrelay_core::{CampaignSpec, CampaignWindow, Credential, ResourceHandle};
    use chrono::NaiveDate;
    use mockito::{Matcher, Server, ServerGuard};

    fn spec(image_url: String) -> CampaignSpec {
        CampaignSpec::builder()
            .name("Social spring")
            .daily_budget(1_000)
            .dates("2030-03-02", "2030-03-05")
            .creative(Creative::SocialAds(SocialCreative {
                page_id: "1029384756".into(),
                primary_text: "Spring is here".into(),
                headline: "New arrivals".into(),
                description: None,
                image_url,
                link_url: "https://example.com".into(),
                call_to_action: Some("Shop now".into()),
                countries: vec!["us".into(), "CA".into()],
            }))
            .build()
            .unwrap()
    }

    fn window() -> CampaignWindow {
        CampaignWindow {
            start: NaiveDate::from_ymd_opt(2030, 3, 2).unwrap(),
            end: NaiveDate::from_ymd_opt(2030, 3, 5).unwrap(),
        }
    }

    fn session(server: &ServerGuard) -> Box<dyn AdapterSession> {
        let config = SocialApiConfig {
            graph_url: server.url(),
            api_version: "v19.0".into(),
        };
        let http = HttpSettings {
            retry_base_delay_ms: 1,
            ..Default::default()
        };
        let ctx = ExecutionContext::new("act_9988776655", Credential::new("EAAB"));
        SocialAdsAdapter::new(config, &http)
            .unwrap()
            .open_session(&ctx)
            .unwrap()
    }

    #[tokio::test]
    async fn test_budget_is_unsupported() {
        let server = Server::new_async().await;
        let spec = spec("https://cdn.example.com/a.png".into());
        let err = session(&server)
            .create_budget(&StepRequest::new(&spec, window()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AdapterError::Unsupported {
                platform: Platform::SocialAds,
                operation: "create_budget"
            }
        ));
    }

    #[tokio::test]
    async fn test_ad_set_carries_budget_and_targeting() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v19.0/act_9988776655/adsets")
            .match_body(Matcher::PartialJson(json!({
                "campaign_id": "120001",
                "daily_budget": 1000,
                "targeting": { "geo_locations": { "countries": ["US", "CA"] } },
                "start_time": "2030-03-02T00:00:00+0000",
                "status": "PAUSED"
            })))
            .with_status(200)
            .with_body(r#"{"id":"120002"}"#)
            .create_async()
            .await;

        let spec = spec("https://cdn.example.com/a.png".into());
        let req = StepRequest::new(&spec, window())
            .with_parent(ResourceHandle::new(StepRole::Campaign, "120001"));
        let response = session(&server).create_ad_group(&req).await.unwrap();
        assert_eq!(response.resource_id.as_deref(), Some("120002"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_image_upload_returns_hash() {
        let mut server = Server::new_async().await;
        let _image = server
            .mock("GET", "/hero.jpg")
            .with_status(200)
            .with_body("jpeg")
            .create_async()
            .await;
        let upload = server
            .mock("POST", "/v19.0/act_9988776655/adimages")
            .match_body(Matcher::PartialJson(json!({ "bytes": "anBlZw==" })))
            .with_status(200)
            .with_body(r#"{"images":{"Social spring.jpg":{"hash":"f00dbabe"}}}"#)
            .create_async()
            .await;

        let spec = spec(format!("{}/hero.jpg", server.url()));
        let response = session(&server)
            .create_asset(StepRole::ImageAsset, &StepRequest::new(&spec, window()))
            .await
            .unwrap();
        assert_eq!(response.resource_id.as_deref(), Some("f00dbabe"));
        upload.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejection_surfaces_user_message() {
        let mut server = Server::new_async().await;
        let _campaigns = server
            .mock("POST", "/v19.0/act_9988776655/campaigns")
            .with_status(400)
            .with_body(r#"{"error":{"message":"Invalid parameter","code":100,"error_user_msg":"Campaign objective is invalid."}}"#)
            .create_async()
            .await;

        let spec = spec("https://cdn.example.com/a.png".into());
        let err = session(&server)
            .create_campaign(&StepRequest::new(&spec, window()))
            .await
            .unwrap_err();
        match err {
            AdapterError::Rejected { message, detail, .. } => {
                assert_eq!(message, "Campaign objective is invalid.");
                assert_eq!(detail.unwrap()["code"], 100);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
