//! Campaign provisioning engine.
//!
//! One engine serves every platform; the [`StepTable`] decides what it
//! creates. A run validates, opens an adapter session, then walks the table
//! strictly in order and stops at the first failed step. Resources created
//! before a failure stay on the platform and are reported in the result.

use std::sync::Arc;
use std::time::Duration;

use adrelay_adapters::{AdapterSession, PlatformAdapter, StepRequest};
use adrelay_core::{
    validate, AdapterError, CampaignSpec, CampaignWindow, ExecutionContext, PipelineResult,
    Platform, Result, StepRecord, StepResult, StepRole, ValidationError, ValidationRule,
};
use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use crate::executor::StepExecutor;
use crate::steps::{StepDef, StepTable};

/// Provisioning pipeline bound to one platform adapter.
pub struct Pipeline {
    adapter: Arc<dyn PlatformAdapter>,
    table: StepTable,
    executor: StepExecutor,
}

impl Pipeline {
    pub fn new(adapter: Arc<dyn PlatformAdapter>) -> Self {
        let table = StepTable::for_platform(adapter.platform());
        Self {
            adapter,
            table,
            executor: StepExecutor::default(),
        }
    }

    /// Bound every step by `timeout` instead of the default derived from
    /// [`HttpSettings`](adrelay_adapters::HttpSettings).
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.executor = StepExecutor::new(timeout);
        self
    }

    pub fn platform(&self) -> Platform {
        self.table.platform
    }

    pub fn table(&self) -> &StepTable {
        &self.table
    }

    /// Provision `spec` using today's UTC date for the start-date rule.
    pub async fn run(&self, spec: &CampaignSpec, ctx: &ExecutionContext) -> Result<PipelineResult> {
        self.run_at(spec, ctx, Utc::now().date_naive()).await
    }

    /// Provision `spec`.
    ///
    /// Returns `Err` only for failures detected before any network call
    /// (validation, configuration). A run that fails at a resource step
    /// returns `Ok` with `success == false`, the failed step and every
    /// handle created before it; use [`PipelineResult::into_result`] to turn
    /// that into an error.
    pub async fn run_at(
        &self,
        spec: &CampaignSpec,
        ctx: &ExecutionContext,
        today: NaiveDate,
    ) -> Result<PipelineResult> {
        let platform = self.platform();

        if spec.platform() != platform {
            return Err(ValidationError::new(
                ValidationRule::Creative,
                format!(
                    "A {} creative cannot be provisioned on {}",
                    spec.platform(),
                    platform
                ),
            )
            .into());
        }

        let window = validate(spec, ctx, today).map_err(|e| {
            warn!(%platform, rule = ?e.rule, error = %e, "Validation rejected campaign");
            e
        })?;

        let mut session = self.adapter.open_session(ctx)?;
        let mut result = PipelineResult::new(platform, spec.fingerprint());

        info!(
            run_id = %result.run_id,
            %platform,
            account = %ctx.customer_id(),
            fingerprint = %result.fingerprint,
            campaign = %spec.name,
            "Provisioning started"
        );

        for step in self.table.steps {
            let record = self
                .run_step(step, spec, window, &result, session.as_mut())
                .await;
            let failed = !record.result.is_success();
            result.record(record);

            if failed {
                result.finish_failed();
                warn!(
                    run_id = %result.run_id,
                    %platform,
                    step = %step.role,
                    created = result.handles.len(),
                    "Provisioning failed; created resources were left in place"
                );
                return Ok(result);
            }
        }

        result.finish_done(&spec.name);
        info!(
            run_id = %result.run_id,
            %platform,
            resources = result.handles.len(),
            "Provisioning complete"
        );
        Ok(result)
    }

    async fn run_step(
        &self,
        step: &StepDef,
        spec: &CampaignSpec,
        window: CampaignWindow,
        so_far: &PipelineResult,
        session: &mut dyn AdapterSession,
    ) -> StepRecord {
        match resolve_parents(step, spec, window, so_far) {
            Ok(req) => self.executor.execute(step.role, &req, session).await,
            Err(missing) => StepRecord {
                role: step.role,
                state: step.state(),
                result: StepResult::from(AdapterError::MissingParent(missing)),
                started_at: Utc::now(),
                duration_ms: 0,
            },
        }
    }
}

fn resolve_parents<'a>(
    step: &StepDef,
    spec: &'a CampaignSpec,
    window: CampaignWindow,
    so_far: &PipelineResult,
) -> std::result::Result<StepRequest<'a>, StepRole> {
    let mut req = StepRequest::new(spec, window);
    for parent in step.parents {
        let handle = so_far.handle(*parent).ok_or(*parent)?;
        req = req.with_parent(handle.clone());
    }
    Ok(req)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use adrelay_adapters::{AdapterResponse, AdapterResult};
    use adrelay_core::{
        ConfigurationError, Creative, Credential, FailureKind, PipelineState, ProvisionError,
        SocialCreative, VideoCreative,
    };
    use async_trait::async_trait;
    use serde_json::json;

    #[derive(Default, Clone)]
    struct Script {
        fail_at: Option<StepRole>,
        no_id_at: Option<StepRole>,
        missing_config: bool,
    }

    struct RecordingAdapter {
        platform: Platform,
        script: Script,
        calls: Arc<Mutex<Vec<StepRole>>>,
        ids: Arc<AtomicUsize>,
    }

    impl RecordingAdapter {
        fn new(platform: Platform, script: Script) -> Arc<Self> {
            Arc::new(Self {
                platform,
                script,
                calls: Arc::new(Mutex::new(Vec::new())),
                ids: Arc::new(AtomicUsize::new(0)),
            })
        }

        fn calls(&self) -> Vec<StepRole> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl PlatformAdapter for RecordingAdapter {
        fn platform(&self) -> Platform {
            self.platform
        }

        fn open_session(
            &self,
            _ctx: &ExecutionContext,
        ) -> std::result::Result<Box<dyn AdapterSession>, ConfigurationError> {
            if self.script.missing_config {
                return Err(ConfigurationError::MissingSecret {
                    platform: self.platform,
                    key: "developer_token",
                });
            }
            Ok(Box::new(RecordingSession {
                platform: self.platform,
                script: self.script.clone(),
                calls: self.calls.clone(),
                ids: self.ids.clone(),
            }))
        }
    }

    struct RecordingSession {
        platform: Platform,
        script: Script,
        calls: Arc<Mutex<Vec<StepRole>>>,
        ids: Arc<AtomicUsize>,
    }

    impl RecordingSession {
        fn call(&self, role: StepRole) -> AdapterResult {
            self.calls.lock().unwrap().push(role);
            if self.script.fail_at == Some(role) {
                return Err(AdapterError::Transport("connection reset by peer".into()));
            }
            if self.script.no_id_at == Some(role) {
                return Ok(AdapterResponse::new(None, json!({})));
            }
            let n = self.ids.fetch_add(1, Ordering::SeqCst);
            Ok(AdapterResponse::new(
                Some(format!("{}/{}", role.key(), n)),
                json!({}),
            ))
        }
    }

    #[async_trait]
    impl AdapterSession for RecordingSession {
        fn platform(&self) -> Platform {
            self.platform
        }

        async fn create_budget(&mut self, _req: &StepRequest<'_>) -> AdapterResult {
            self.call(StepRole::Budget)
        }

        async fn create_campaign(&mut self, _req: &StepRequest<'_>) -> AdapterResult {
            self.call(StepRole::Campaign)
        }

        async fn create_ad_group(&mut self, _req: &StepRequest<'_>) -> AdapterResult {
            self.call(StepRole::AdGroup)
        }

        async fn create_asset(&mut self, slot: StepRole, _req: &StepRequest<'_>) -> AdapterResult {
            self.call(slot)
        }

        async fn create_ad(&mut self, req: &StepRequest<'_>) -> AdapterResult {
            // Parents resolved by the engine are visible to the adapter.
            req.parent(StepRole::AdGroup)?;
            self.call(StepRole::Ad)
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 3, 1).unwrap()
    }

    fn video_creative() -> VideoCreative {
        VideoCreative {
            headlines: vec!["Shop now".into(), "New season".into(), "Free returns".into()],
            long_headlines: vec!["Everything you need for spring".into()],
            descriptions: vec!["Fresh styles weekly".into(), "Order by noon".into()],
            video_url: "https://youtu.be/dQw4w9WgXcQ".into(),
            logo_image_url: "https://cdn.example.com/logo.png".into(),
            business_name: "Example Co".into(),
            final_url: "https://example.com/spring".into(),
            call_to_action: None,
        }
    }

    fn video_spec(creative: VideoCreative) -> CampaignSpec {
        CampaignSpec::builder()
            .name("Spring video")
            .daily_budget(2_500)
            .dates("2030-03-01", "2030-03-31")
            .creative(Creative::VideoAds(creative))
            .build()
            .unwrap()
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext::new("123-456-7890", Credential::new("refresh-token"))
    }

    fn roles(result: &PipelineResult) -> Vec<StepRole> {
        result.handles.iter().map(|h| h.role).collect()
    }

    #[tokio::test]
    async fn test_video_run_creates_six_resources_in_order() {
        let adapter = RecordingAdapter::new(Platform::VideoAds, Script::default());
        let pipeline = Pipeline::new(adapter.clone());

        let result = pipeline
            .run_at(&video_spec(video_creative()), &ctx(), today())
            .await
            .unwrap();

        let expected = vec![
            StepRole::Budget,
            StepRole::Campaign,
            StepRole::AdGroup,
            StepRole::VideoAsset,
            StepRole::ImageAsset,
            StepRole::Ad,
        ];
        assert!(result.success);
        assert_eq!(result.final_state, PipelineState::Done);
        assert_eq!(result.handles.len(), 6);
        assert_eq!(roles(&result), expected);
        assert_eq!(adapter.calls(), expected);
    }

    #[tokio::test]
    async fn test_two_headlines_make_no_calls() {
        let adapter = RecordingAdapter::new(Platform::VideoAds, Script::default());
        let pipeline = Pipeline::new(adapter.clone());
        let mut creative = video_creative();
        creative.headlines.truncate(2);

        let err = pipeline
            .run_at(&video_spec(creative), &ctx(), today())
            .await
            .unwrap_err();

        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "At least 3 headlines are required");
        assert!(adapter.calls().is_empty());
    }

    #[tokio::test]
    async fn test_asset_transport_error_keeps_earlier_handles() {
        let adapter = RecordingAdapter::new(
            Platform::VideoAds,
            Script {
                fail_at: Some(StepRole::VideoAsset),
                ..Default::default()
            },
        );
        let pipeline = Pipeline::new(adapter.clone());

        let result = pipeline
            .run_at(&video_spec(video_creative()), &ctx(), today())
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.final_state, PipelineState::Failed);
        assert_eq!(
            roles(&result),
            vec![StepRole::Budget, StepRole::Campaign, StepRole::AdGroup]
        );
        assert_eq!(result.failed_step().map(|s| s.role), Some(StepRole::VideoAsset));
        assert_eq!(result.failure_kind(), Some(FailureKind::Adapter));
        assert_eq!(adapter.calls().last(), Some(&StepRole::VideoAsset));
        assert!(!adapter.calls().contains(&StepRole::Ad));
        assert!(matches!(
            result.into_result(),
            Err(ProvisionError::Adapter {
                role: StepRole::VideoAsset,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_end_before_start_makes_no_calls() {
        let adapter = RecordingAdapter::new(Platform::VideoAds, Script::default());
        let pipeline = Pipeline::new(adapter.clone());
        let mut spec = video_spec(video_creative());
        spec.start_date = "2030-03-20".into();
        spec.end_date = "2030-03-19".into();

        let err = pipeline.run_at(&spec, &ctx(), today()).await.unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::Validation(ValidationError {
                rule: ValidationRule::DateRange,
                ..
            })
        ));
        assert!(adapter.calls().is_empty());
    }

    #[tokio::test]
    async fn test_past_start_date_rejected() {
        let adapter = RecordingAdapter::new(Platform::VideoAds, Script::default());
        let pipeline = Pipeline::new(adapter.clone());
        let mut spec = video_spec(video_creative());
        spec.start_date = "2030-02-01".into();

        let err = pipeline.run_at(&spec, &ctx(), today()).await.unwrap_err();
        assert_eq!(err.to_string(), "Start date cannot be in the past");
        assert!(adapter.calls().is_empty());
    }

    #[tokio::test]
    async fn test_success_without_id_stops_run() {
        let adapter = RecordingAdapter::new(
            Platform::VideoAds,
            Script {
                no_id_at: Some(StepRole::Campaign),
                ..Default::default()
            },
        );
        let pipeline = Pipeline::new(adapter.clone());

        let result = pipeline
            .run_at(&video_spec(video_creative()), &ctx(), today())
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.failure_kind(), Some(FailureKind::Integrity));
        assert_eq!(roles(&result), vec![StepRole::Budget]);
        assert_eq!(adapter.calls(), vec![StepRole::Budget, StepRole::Campaign]);
        assert!(matches!(
            result.error(),
            Some(ProvisionError::Integrity {
                role: StepRole::Campaign,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_same_spec_twice_creates_two_resource_sets() {
        let adapter = RecordingAdapter::new(Platform::VideoAds, Script::default());
        let pipeline = Pipeline::new(adapter.clone());
        let spec = video_spec(video_creative());

        let first = pipeline.run_at(&spec, &ctx(), today()).await.unwrap();
        let second = pipeline.run_at(&spec, &ctx(), today()).await.unwrap();

        assert!(first.success && second.success);
        assert_ne!(first.run_id, second.run_id);
        assert_eq!(first.fingerprint, second.fingerprint);
        assert!(first
            .handles
            .iter()
            .all(|h| second.handles.iter().all(|other| other.id != h.id)));
        assert_eq!(adapter.calls().len(), 12);
    }

    #[tokio::test]
    async fn test_foreign_creative_rejected() {
        let adapter = RecordingAdapter::new(Platform::SearchAds, Script::default());
        let pipeline = Pipeline::new(adapter.clone());

        let err = pipeline
            .run_at(&video_spec(video_creative()), &ctx(), today())
            .await
            .unwrap_err();
        assert!(err.is_client_error());
        assert!(adapter.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_secret_aborts_before_network() {
        let adapter = RecordingAdapter::new(
            Platform::VideoAds,
            Script {
                missing_config: true,
                ..Default::default()
            },
        );
        let pipeline = Pipeline::new(adapter.clone());

        let err = pipeline
            .run_at(&video_spec(video_creative()), &ctx(), today())
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Configuration(_)));
        assert!(adapter.calls().is_empty());
    }

    #[tokio::test]
    async fn test_social_run_order() {
        let adapter = RecordingAdapter::new(Platform::SocialAds, Script::default());
        let pipeline = Pipeline::new(adapter.clone());
        let spec = CampaignSpec::builder()
            .name("Social spring")
            .daily_budget(1_000)
            .dates("2030-03-02", "2030-03-05")
            .creative(Creative::SocialAds(SocialCreative {
                page_id: "1029384756".into(),
                primary_text: "Spring is here".into(),
                headline: "New arrivals".into(),
                description: None,
                image_url: "https://cdn.example.com/hero.jpg".into(),
                link_url: "https://example.com".into(),
                call_to_action: None,
                countries: vec!["US".into()],
            }))
            .build()
            .unwrap();
        let ctx = ExecutionContext::new("act_9988776655", Credential::new("EAAB"));

        let result = pipeline.run_at(&spec, &ctx, today()).await.unwrap();
        assert!(result.success);
        assert_eq!(
            adapter.calls(),
            vec![
                StepRole::Campaign,
                StepRole::AdGroup,
                StepRole::ImageAsset,
                StepRole::Creative,
                StepRole::Ad
            ]
        );
    }
}
