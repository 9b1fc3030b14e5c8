//! Adapter trait and per-run session.

use async_trait::async_trait;
use serde_json::Value;

use adrelay_core::{
    AdapterError, CampaignSpec, CampaignWindow, ConfigurationError, ExecutionContext, Platform,
    ResourceHandle, StepRole,
};

/// Result type of a single adapter call.
pub type AdapterResult = Result<AdapterResponse, AdapterError>;

/// What one resource step hands to the adapter.
#[derive(Debug, Clone)]
pub struct StepRequest<'a> {
    pub spec: &'a CampaignSpec,
    pub window: CampaignWindow,
    /// Handles of the declared parent steps.
    pub parents: Vec<ResourceHandle>,
}

impl<'a> StepRequest<'a> {
    pub fn new(spec: &'a CampaignSpec, window: CampaignWindow) -> Self {
        Self {
            spec,
            window,
            parents: Vec::new(),
        }
    }

    pub fn with_parent(mut self, handle: ResourceHandle) -> Self {
        self.parents.push(handle);
        self
    }

    /// Id of the parent created for `role`.
    pub fn parent(&self, role: StepRole) -> Result<&str, AdapterError> {
        self.parents
            .iter()
            .find(|h| h.role == role)
            .map(|h| h.id.as_str())
            .ok_or(AdapterError::MissingParent(role))
    }
}

/// A successful platform response.
#[derive(Debug, Clone)]
pub struct AdapterResponse {
    /// Identifier of the created resource. `None` when the platform answered
    /// 2xx without one.
    pub resource_id: Option<String>,
    /// Decoded response body.
    pub raw: Value,
}

impl AdapterResponse {
    pub fn new(resource_id: Option<String>, raw: Value) -> Self {
        Self { resource_id, raw }
    }
}

/// A platform integration shared across runs.
pub trait PlatformAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    /// Bind a session to one run's context. Performs no network I/O; fails
    /// only when a deployment secret is missing.
    fn open_session(
        &self,
        ctx: &ExecutionContext,
    ) -> Result<Box<dyn AdapterSession>, ConfigurationError>;
}

/// Resource creation calls for one run. Steps a platform lacks report
/// [`AdapterError::Unsupported`].
#[async_trait]
pub trait AdapterSession: Send {
    fn platform(&self) -> Platform;

    async fn create_budget(&mut self, _req: &StepRequest<'_>) -> AdapterResult {
        Err(unsupported(self.platform(), "create_budget"))
    }

    async fn create_campaign(&mut self, _req: &StepRequest<'_>) -> AdapterResult {
        Err(unsupported(self.platform(), "create_campaign"))
    }

    async fn create_ad_group(&mut self, _req: &StepRequest<'_>) -> AdapterResult {
        Err(unsupported(self.platform(), "create_ad_group"))
    }

    /// Create the asset filling `slot` (video, image or creative).
    async fn create_asset(&mut self, _slot: StepRole, _req: &StepRequest<'_>) -> AdapterResult {
        Err(unsupported(self.platform(), "create_asset"))
    }

    async fn create_ad(&mut self, _req: &StepRequest<'_>) -> AdapterResult {
        Err(unsupported(self.platform(), "create_ad"))
    }
}

pub(crate) fn unsupported(platform: Platform, operation: &'static str) -> AdapterError {
    AdapterError::Unsupported {
        platform,
        operation,
    }
}
