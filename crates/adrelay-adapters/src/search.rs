//! Search-Ads adapter: budget, campaign, ad group, responsive search ad.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use adrelay_core::{
    AdapterError, ConfigurationError, Creative, ExecutionContext, Platform, SearchCreative,
};

use crate::adapter::{AdapterResult, AdapterSession, PlatformAdapter, StepRequest};
use crate::ads_api::{self, BatchMutateClient, DirectMutate};
use crate::config::{AdsApiConfig, HttpSettings};
use crate::vocab;

pub struct SearchAdsAdapter {
    config: AdsApiConfig,
    client: reqwest::Client,
    timeout_ms: u64,
}

impl SearchAdsAdapter {
    pub fn new(config: AdsApiConfig, http: &HttpSettings) -> Result<Self, ConfigurationError> {
        Ok(Self {
            config,
            client: http.build_client()?,
            timeout_ms: http.timeout().as_millis() as u64,
        })
    }
}

impl PlatformAdapter for SearchAdsAdapter {
    fn platform(&self) -> Platform {
        Platform::SearchAds
    }

    fn open_session(
        &self,
        ctx: &ExecutionContext,
    ) -> Result<Box<dyn AdapterSession>, ConfigurationError> {
        let (direct, batch) = ads_api::open(
            Platform::SearchAds,
            &self.client,
            &self.config,
            ctx,
            self.timeout_ms,
        )?;
        Ok(Box::new(SearchAdsSession { direct, batch }))
    }
}

struct SearchAdsSession {
    direct: DirectMutate,
    batch: BatchMutateClient,
}

fn creative<'a>(req: &'a StepRequest<'_>) -> Result<&'a SearchCreative, AdapterError> {
    match &req.spec.creative {
        Creative::SearchAds(c) => Ok(c),
        other => Err(AdapterError::Unsupported {
            platform: other.platform(),
            operation: "search ad creative",
        }),
    }
}

/// `[{"text": ..}]` list of the non-blank entries.
pub(crate) fn text_assets(texts: &[String]) -> Value {
    Value::Array(
        texts
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(|t| json!({ "text": t }))
            .collect(),
    )
}

/// Budget names must be unique per account; a millisecond suffix keeps
/// repeated runs of one spec from colliding.
pub(crate) fn budget_name(campaign: &str) -> String {
    format!("{} Budget #{}", campaign, Utc::now().timestamp_millis())
}

pub(crate) fn budget_body(req: &StepRequest<'_>) -> Value {
    json!({
        "name": budget_name(&req.spec.name),
        "amountMicros": vocab::budget_micros(req.spec.daily_budget).to_string(),
        "deliveryMethod": vocab::ads_delivery(req.spec.delivery_method),
        "explicitlyShared": false,
    })
}

#[async_trait]
impl AdapterSession for SearchAdsSession {
    fn platform(&self) -> Platform {
        Platform::SearchAds
    }

    async fn create_budget(&mut self, req: &StepRequest<'_>) -> AdapterResult {
        self.direct.create("campaignBudgets", budget_body(req)).await
    }

    async fn create_campaign(&mut self, req: &StepRequest<'_>) -> AdapterResult {
        let budget = req.parent(adrelay_core::StepRole::Budget)?;
        let spec = req.spec;
        let campaign = json!({
            "name": spec.name,
            "status": vocab::ads_status(spec.status),
            "advertisingChannelType": vocab::ads_channel(spec.channel_type).unwrap_or("SEARCH"),
            "campaignBudget": budget,
            "startDate": vocab::ads_date(req.window.start),
            "endDate": vocab::ads_date(req.window.end),
            "manualCpc": {},
            "networkSettings": {
                "targetGoogleSearch": true,
                "targetSearchNetwork": true,
                "targetContentNetwork": false,
            },
        });
        self.batch.create("campaignOperation", campaign).await
    }

    async fn create_ad_group(&mut self, req: &StepRequest<'_>) -> AdapterResult {
        let campaign = req.parent(adrelay_core::StepRole::Campaign)?;
        let ad_group = json!({
            "name": format!("{} Ad Group", req.spec.name),
            "campaign": campaign,
            "status": "ENABLED",
            "type": "SEARCH_STANDARD",
        });
        self.batch.create("adGroupOperation", ad_group).await
    }

    async fn create_ad(&mut self, req: &StepRequest<'_>) -> AdapterResult {
        let ad_group = req.parent(adrelay_core::StepRole::AdGroup)?;
        let creative = creative(req)?;

        let mut rsa = json!({
            "headlines": text_assets(&creative.headlines),
            "descriptions": text_assets(&creative.descriptions),
        });
        if let Some(path1) = creative.path1.as_deref().filter(|p| !p.is_empty()) {
            rsa["path1"] = json!(path1);
        }
        if let Some(path2) = creative.path2.as_deref().filter(|p| !p.is_empty()) {
            rsa["path2"] = json!(path2);
        }

        let ad = json!({
            "adGroup": ad_group,
            "status": "ENABLED",
            "ad": {
                "finalUrls": [creative.final_url],
                "responsiveSearchAd": rsa,
            },
        });
        self.batch.create("adGroupAdOperation", ad).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ads_api::tests::{mock_token, test_config};
    use adrelay_core::{validate, CampaignSpec, Credential, ResourceHandle, StepRole};
    use chrono::NaiveDate;
    use mockito::{Matcher, Server};

    fn spec() -> CampaignSpec {
        CampaignSpec::builder()
            .name("Spring search")
            .daily_budget(1_500)
            .dates("2030-05-01", "2030-05-31")
            .creative(Creative::SearchAds(SearchCreative {
                headlines: vec!["Fast".into(), "Cheap".into(), "Good".into()],
                descriptions: vec!["Pick three".into(), "Really".into()],
                final_url: "https://example.com".into(),
                path1: Some("deals".into()),
                path2: None,
            }))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_budget_then_ad_group_bodies() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server, 2).await;
        let budget = server
            .mock("POST", "/v17/customers/1234567890/campaignBudgets:mutate")
            .match_body(Matcher::PartialJson(json!({
                "operations": [{ "create": { "amountMicros": "15000000", "deliveryMethod": "STANDARD" } }]
            })))
            .with_status(200)
            .with_body(r#"{"results":[{"resourceName":"customers/1234567890/campaignBudgets/1"}]}"#)
            .create_async()
            .await;
        let ad_group = server
            .mock("POST", "/v17/customers/1234567890/googleAds:mutate")
            .match_body(Matcher::PartialJson(json!({
                "mutateOperations": [{ "adGroupOperation": { "create": {
                    "campaign": "customers/1234567890/campaigns/2",
                    "type": "SEARCH_STANDARD"
                } } }]
            })))
            .with_status(200)
            .with_body(r#"{"mutateOperationResponses":[{"adGroupResult":{"resourceName":"customers/1234567890/adGroups/3"}}]}"#)
            .create_async()
            .await;

        let adapter =
            SearchAdsAdapter::new(test_config(&server), &HttpSettings::default()).unwrap();
        let ctx = ExecutionContext::new("1234567890", Credential::new("refresh-secret"));
        let mut session = adapter.open_session(&ctx).unwrap();

        let spec = spec();
        let today = NaiveDate::from_ymd_opt(2030, 4, 1).unwrap();
        let window = validate(&spec, &ctx, today).unwrap();

        let req = StepRequest::new(&spec, window);
        let created = session.create_budget(&req).await.unwrap();
        assert_eq!(
            created.resource_id.as_deref(),
            Some("customers/1234567890/campaignBudgets/1")
        );

        let req = StepRequest::new(&spec, window).with_parent(ResourceHandle::new(
            StepRole::Campaign,
            "customers/1234567890/campaigns/2",
        ));
        let created = session.create_ad_group(&req).await.unwrap();
        assert_eq!(
            created.resource_id.as_deref(),
            Some("customers/1234567890/adGroups/3")
        );

        budget.assert_async().await;
        ad_group.assert_async().await;
    }

    #[test]
    fn test_missing_secret_fails_open() {
        let adapter = SearchAdsAdapter::new(AdsApiConfig::default(), &HttpSettings::default())
            .unwrap();
        let ctx = ExecutionContext::new("1234567890", Credential::new("t"));
        let err = adapter.open_session(&ctx).err().unwrap();
        assert!(matches!(
            err,
            ConfigurationError::MissingSecret {
                key: "developer_token",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_search_has_no_asset_step() {
        let server = Server::new_async().await;
        let adapter =
            SearchAdsAdapter::new(test_config(&server), &HttpSettings::default()).unwrap();
        let ctx = ExecutionContext::new("1234567890", Credential::new("refresh-secret"));
        let mut session = adapter.open_session(&ctx).unwrap();
        let spec = spec();
        let day = NaiveDate::from_ymd_opt(2030, 5, 1).unwrap();
        let req = StepRequest::new(&spec, adrelay_core::CampaignWindow { start: day, end: day });
        let err = session
            .create_asset(StepRole::ImageAsset, &req)
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Unsupported { .. }));
    }

    #[test]
    fn test_text_assets_skip_blanks() {
        let assets = text_assets(&["A".into(), "  ".into(), " B ".into()]);
        assert_eq!(assets, json!([{ "text": "A" }, { "text": "B" }]));
    }
}
