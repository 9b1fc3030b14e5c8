//! Resource step executor.
//!
//! Runs exactly one adapter call, bounded by a timeout, and turns its outcome
//! into a [`StepRecord`]. Never retries and never skips.

use std::time::{Duration, Instant};

use adrelay_adapters::{AdapterResult, AdapterSession, HttpSettings, StepRequest};
use adrelay_core::{AdapterError, ResourceHandle, StepRecord, StepResult, StepRole};
use chrono::Utc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct StepExecutor {
    timeout: Duration,
}

impl Default for StepExecutor {
    /// Step bound derived from the default HTTP settings.
    fn default() -> Self {
        Self::new(HttpSettings::default().step_timeout())
    }
}

impl StepExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute the step filling `role`.
    pub async fn execute(
        &self,
        role: StepRole,
        req: &StepRequest<'_>,
        session: &mut dyn AdapterSession,
    ) -> StepRecord {
        let started_at = Utc::now();
        let clock = Instant::now();
        let platform = session.platform();

        let outcome = match tokio::time::timeout(self.timeout, dispatch(role, req, session)).await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(AdapterError::Timeout {
                after_ms: self.timeout.as_millis() as u64,
            }),
        };

        let result = match outcome {
            Ok(response) => match response.resource_id.filter(|id| !id.trim().is_empty()) {
                Some(id) => StepResult::success(ResourceHandle::new(role, id)),
                None => StepResult::integrity(format!(
                    "{} reported success for the {} step without a resource id",
                    platform, role
                )),
            },
            Err(err) => StepResult::from(err),
        };

        let duration_ms = clock.elapsed().as_millis() as u64;
        match &result {
            StepResult::Success { handle } => {
                info!(%platform, step = %role, id = %handle.id, duration_ms, "Step succeeded");
            }
            StepResult::Failure { kind, message, .. } => {
                warn!(%platform, step = %role, ?kind, duration_ms, error = %message, "Step failed");
            }
        }

        StepRecord {
            role,
            state: role.state(),
            result,
            started_at,
            duration_ms,
        }
    }
}

async fn dispatch(
    role: StepRole,
    req: &StepRequest<'_>,
    session: &mut dyn AdapterSession,
) -> AdapterResult {
    match role {
        StepRole::Budget => session.create_budget(req).await,
        StepRole::Campaign => session.create_campaign(req).await,
        StepRole::AdGroup => session.create_ad_group(req).await,
        StepRole::VideoAsset | StepRole::ImageAsset | StepRole::Creative => {
            session.create_asset(role, req).await
        }
        StepRole::Ad => session.create_ad(req).await,
    }
}
