//! Application state.

use std::collections::HashMap;
use std::sync::Arc;

use adrelay_adapters::{PlatformAdapter, SearchAdsAdapter, SocialAdsAdapter, VideoAdsAdapter};
use adrelay_core::Platform;
use adrelay_dispatch::{campaign_registry, CapabilityRegistry, ChatModel, IntentRouter, OpenAiChatModel};
use adrelay_pipeline::Pipeline;
use tracing::{info, warn};

use crate::config::AppConfig;

/// Shared application state. Holds no per-request data.
#[derive(Clone)]
pub struct AppState {
    /// One pipeline per platform.
    pub pipelines: Arc<HashMap<Platform, Arc<Pipeline>>>,

    /// Capabilities exposed to the conversational surface.
    pub registry: Arc<CapabilityRegistry>,

    /// Absent when no model endpoint is configured.
    pub router: Option<Arc<IntentRouter>>,
}

impl AppState {
    pub fn new(
        pipelines: Vec<Arc<Pipeline>>,
        model: Option<Arc<dyn ChatModel>>,
        max_rounds: usize,
    ) -> Self {
        let registry = Arc::new(campaign_registry(pipelines.iter().cloned()));
        let router = model.map(|model| {
            Arc::new(IntentRouter::new(model, registry.clone()).with_max_rounds(max_rounds))
        });
        let pipelines = pipelines
            .into_iter()
            .map(|p| (p.platform(), p))
            .collect();

        Self {
            pipelines: Arc::new(pipelines),
            registry,
            router,
        }
    }

    /// Build adapters, pipelines and the router from configuration.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let adapters: Vec<Arc<dyn PlatformAdapter>> = vec![
            Arc::new(SearchAdsAdapter::new(config.search_ads.clone(), &config.http)?),
            Arc::new(VideoAdsAdapter::new(config.video_ads.clone(), &config.http)?),
            Arc::new(SocialAdsAdapter::new(config.social_ads.clone(), &config.http)?),
        ];
        let step_timeout = config.http.step_timeout();
        let pipelines = adapters
            .into_iter()
            .map(|adapter| Arc::new(Pipeline::new(adapter).with_step_timeout(step_timeout)))
            .collect();

        let model: Option<Arc<dyn ChatModel>> = match config.model.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => {
                info!(model = %config.model.model, "Conversational endpoint enabled");
                Some(Arc::new(OpenAiChatModel::new(config.model.clone())?))
            }
            _ => {
                warn!("No model API key configured; /api/v1/chat is disabled");
                None
            }
        };

        Ok(Self::new(pipelines, model, config.model.max_rounds))
    }

    pub fn pipeline(&self, platform: Platform) -> Option<&Arc<Pipeline>> {
        self.pipelines.get(&platform)
    }
}
