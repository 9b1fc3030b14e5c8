//! Direct provisioning endpoint.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

use adrelay_core::{
    CampaignSpec, CampaignStatus, ChannelType, Creative, DeliveryMethod, ExecutionContext,
    Platform, ValidationError, ValidationRule,
};

use crate::api::error::ApiError;
use crate::state::AppState;

/// Request to provision one campaign.
#[derive(Debug, Deserialize)]
pub struct ProvisionRequest {
    /// `accountId`, `credential` and optional `managerId`.
    #[serde(flatten)]
    pub context: ExecutionContext,

    pub campaign: CampaignInput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignInput {
    #[serde(default)]
    pub name: String,
    /// Minor currency units.
    #[serde(default)]
    pub daily_budget: i64,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    pub channel_type: Option<ChannelType>,
    pub status: Option<CampaignStatus>,
    pub delivery_method: Option<DeliveryMethod>,

    /// Platform creative fields.
    #[serde(flatten)]
    pub creative: Map<String, Value>,
}

impl CampaignInput {
    fn into_spec(self, platform: Platform) -> Result<CampaignSpec, ApiError> {
        let fields = Value::Object(self.creative);
        let creative = match platform {
            Platform::SearchAds => serde_json::from_value(fields).map(Creative::SearchAds),
            Platform::VideoAds => serde_json::from_value(fields).map(Creative::VideoAds),
            Platform::SocialAds => serde_json::from_value(fields).map(Creative::SocialAds),
        }
        .map_err(|e| {
            ValidationError::new(
                ValidationRule::Creative,
                format!("Invalid {} creative: {}", platform, e),
            )
        })
        .map_err(adrelay_core::ProvisionError::from)?;

        let mut builder = CampaignSpec::builder()
            .name(self.name)
            .daily_budget(self.daily_budget)
            .dates(self.start_date, self.end_date)
            .status(self.status.unwrap_or_default())
            .delivery(self.delivery_method.unwrap_or_default())
            .creative(creative);
        if let Some(channel) = self.channel_type {
            builder = builder.channel(channel);
        }
        Ok(builder.build()?)
    }
}

/// Provision a campaign on the platform named in the path.
pub async fn create_campaign(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    body: Result<Json<ProvisionRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let platform = Platform::from_slug(&slug)
        .ok_or_else(|| ApiError::not_found(format!("Unknown platform `{}`", slug)))?;
    let pipeline = state.pipeline(platform).ok_or_else(|| {
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            format!("{} is not enabled on this node", platform),
        )
    })?;

    let Json(req) = body?;
    let spec = req.campaign.into_spec(platform)?;
    let result = pipeline.run(&spec, &req.context).await?;

    if !result.success {
        return Err(ApiError::failed_run(&result));
    }

    info!(run_id = %result.run_id, %platform, "Campaign provisioned over HTTP");
    let mut body = json!({
        "success": true,
        "runId": result.run_id,
        "fingerprint": result.fingerprint,
        "message": result.summary,
    });
    for handle in &result.handles {
        body[handle.role.key()] = json!({ "id": handle.id });
    }
    Ok(Json(body))
}
