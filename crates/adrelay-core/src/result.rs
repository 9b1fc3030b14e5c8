//! Step and pipeline results.
//!
//! A [`PipelineResult`] is the outcome record of one provisioning run: every
//! step attempted, every handle created, and where the run stopped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AdapterError, ProvisionError, Result};
use crate::types::{PipelineState, Platform, ResourceKind, StepRole};

/// Platform-assigned identifier of a created resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHandle {
    /// Opaque id (resource name, numeric id or image hash).
    pub id: String,
    pub kind: ResourceKind,
    pub role: StepRole,
}

impl ResourceHandle {
    pub fn new(role: StepRole, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: role.kind(),
            role,
        }
    }
}

/// Classification of a failed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The platform rejected the call or the transport failed.
    Adapter,
    /// The call exceeded its time bound.
    Timeout,
    /// Success was reported without the expected identifier.
    Integrity,
    /// The platform has no such step.
    Unsupported,
}

/// Outcome of a single resource step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepResult {
    Success {
        handle: ResourceHandle,
    },
    Failure {
        kind: FailureKind,
        message: String,
        /// Structured platform error, when one was returned.
        platform_detail: Option<serde_json::Value>,
    },
}

impl StepResult {
    pub fn success(handle: ResourceHandle) -> Self {
        StepResult::Success { handle }
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        StepResult::Failure {
            kind: FailureKind::Integrity,
            message: message.into(),
            platform_detail: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StepResult::Success { .. })
    }

    pub fn handle(&self) -> Option<&ResourceHandle> {
        match self {
            StepResult::Success { handle } => Some(handle),
            StepResult::Failure { .. } => None,
        }
    }
}

impl From<AdapterError> for StepResult {
    fn from(err: AdapterError) -> Self {
        StepResult::Failure {
            kind: err.failure_kind(),
            platform_detail: err.platform_detail().cloned(),
            message: err.to_string(),
        }
    }
}

/// One attempted step of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub role: StepRole,
    pub state: PipelineState,
    pub result: StepResult,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Aggregated outcome of one provisioning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Unique identifier for this run.
    pub run_id: Uuid,

    pub platform: Platform,

    /// Fingerprint of the spec that was provisioned.
    pub fingerprint: String,

    /// `Done` or `Failed` once the run returns.
    pub final_state: PipelineState,

    /// Every step attempted, in execution order.
    pub steps: Vec<StepRecord>,

    /// Handles created, in creation order. On failure these are left on the
    /// platform; nothing is rolled back.
    pub handles: Vec<ResourceHandle>,

    pub success: bool,

    /// Human-readable outcome.
    pub summary: String,

    pub started_at: DateTime<Utc>,

    pub finished_at: Option<DateTime<Utc>>,
}

impl PipelineResult {
    /// Start a result for a new run.
    pub fn new(platform: Platform, fingerprint: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            platform,
            fingerprint: fingerprint.into(),
            final_state: PipelineState::Validate,
            steps: Vec::new(),
            handles: Vec::new(),
            success: false,
            summary: String::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Append a step record, collecting its handle on success.
    pub fn record(&mut self, record: StepRecord) {
        self.final_state = record.state;
        if let Some(handle) = record.result.handle() {
            self.handles.push(handle.clone());
        }
        self.steps.push(record);
    }

    /// Close the run as `Done`.
    pub fn finish_done(&mut self, campaign_name: &str) {
        self.final_state = PipelineState::Done;
        self.success = true;
        self.finished_at = Some(Utc::now());
        self.summary = format!(
            "Created {} campaign '{}' with {} resources",
            self.platform,
            campaign_name,
            self.handles.len()
        );
    }

    /// Close the run as `Failed` at the last recorded step.
    pub fn finish_failed(&mut self) {
        self.final_state = PipelineState::Failed;
        self.success = false;
        self.finished_at = Some(Utc::now());
        let (role, message) = match self.failed_step() {
            Some(record) => (record.role.to_string(), failure_message(&record.result)),
            None => ("unknown".to_string(), String::new()),
        };
        self.summary = format!(
            "{} provisioning failed at the {} step after creating {} resource(s): {}",
            self.platform,
            role,
            self.handles.len(),
            message
        );
    }

    /// Handle created for a role, if that step succeeded.
    pub fn handle(&self, role: StepRole) -> Option<&ResourceHandle> {
        self.handles.iter().find(|h| h.role == role)
    }

    pub fn failed_step(&self) -> Option<&StepRecord> {
        self.steps.iter().find(|s| !s.result.is_success())
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self.failed_step().map(|s| &s.result) {
            Some(StepResult::Failure { kind, .. }) => Some(*kind),
            _ => None,
        }
    }

    /// The failure as a provisioning error, if the run failed.
    pub fn error(&self) -> Option<ProvisionError> {
        let record = self.failed_step()?;
        match &record.result {
            StepResult::Failure {
                kind: FailureKind::Integrity,
                message,
                ..
            } => Some(ProvisionError::Integrity {
                role: record.role,
                message: message.clone(),
            }),
            StepResult::Failure {
                message,
                platform_detail,
                ..
            } => Some(ProvisionError::Adapter {
                role: record.role,
                message: message.clone(),
                detail: platform_detail.clone(),
            }),
            StepResult::Success { .. } => None,
        }
    }

    /// `Ok(self)` when every step succeeded, the step failure otherwise.
    pub fn into_result(self) -> Result<Self> {
        match self.error() {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}

fn failure_message(result: &StepResult) -> String {
    match result {
        StepResult::Failure { message, .. } => message.clone(),
        StepResult::Success { .. } => String::new(),
    }
}
