//! # Adrelay Core
//!
//! Shared model for multi-platform campaign provisioning.
//!
//! This crate provides:
//! - [`CampaignSpec`] - What to provision, with a platform-specific [`Creative`]
//! - [`ExecutionContext`] - Per-request account and credential values
//! - [`PipelineResult`] - Outcome record of a provisioning run
//! - [`ProvisionError`] - Error taxonomy shared by every layer
//! - [`validate`] - Fail-fast pre-flight rules

pub mod context;
pub mod error;
pub mod result;
pub mod spec;
pub mod types;
pub mod validation;

// Re-exports for convenience
pub use context::{normalize_account_id, Credential, ExecutionContext, PlatformCredentials};
pub use error::{
    AdapterError, ConfigurationError, ProvisionError, Result, ValidationError, ValidationRule,
};
pub use result::{FailureKind, PipelineResult, ResourceHandle, StepRecord, StepResult};
pub use spec::{
    CampaignSpec, CampaignSpecBuilder, Creative, SearchCreative, SocialCreative, VideoCreative,
};
pub use types::*;
pub use validation::{validate, CampaignWindow};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::context::{Credential, ExecutionContext, PlatformCredentials};
    pub use crate::error::{AdapterError, ProvisionError, Result, ValidationError};
    pub use crate::result::{PipelineResult, ResourceHandle, StepResult};
    pub use crate::spec::{CampaignSpec, Creative};
    pub use crate::types::{Platform, StepRole};
    pub use crate::validation::{validate, CampaignWindow};
}
