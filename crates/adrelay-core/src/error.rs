//! Error types for campaign provisioning.

use serde::Serialize;
use thiserror::Error;

use crate::result::FailureKind;
use crate::types::{Platform, StepRole};

/// Main error type for a provisioning request.
#[derive(Error, Debug, Clone)]
pub enum ProvisionError {
    /// A required deployment secret or setting is missing.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Input violated a pre-flight rule.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The platform rejected a call, or the call never completed.
    #[error("{role} step failed: {message}")]
    Adapter {
        role: StepRole,
        message: String,
        detail: Option<serde_json::Value>,
    },

    /// The platform reported success but the expected identifier is missing.
    #[error("Integrity error at {role} step: {message}")]
    Integrity { role: StepRole, message: String },
}

impl ProvisionError {
    /// Returns true if the caller sent input that can never succeed as-is.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ProvisionError::Validation(_))
    }

    /// Returns the structured platform detail, if any was captured.
    pub fn platform_detail(&self) -> Option<&serde_json::Value> {
        match self {
            ProvisionError::Adapter { detail, .. } => detail.as_ref(),
            _ => None,
        }
    }
}

/// A deployment-level misconfiguration. Fatal for every request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A secret the platform requires is not configured.
    #[error("Missing required setting `{key}` for {platform}")]
    MissingSecret { platform: Platform, key: &'static str },

    /// A setting is present but unusable.
    #[error("Invalid setting `{key}`: {message}")]
    Invalid { key: String, message: String },
}

/// Which pre-flight rule rejected the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationRule {
    AccountId,
    ManagerId,
    Credential,
    CampaignName,
    Budget,
    DateFormat,
    StartDateInPast,
    DateRange,
    ChannelType,
    Creative,
}

/// The first violated pre-flight rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    pub rule: ValidationRule,
    pub message: String,
}

impl ValidationError {
    pub fn new(rule: ValidationRule, message: impl Into<String>) -> Self {
        Self {
            rule,
            message: message.into(),
        }
    }
}

/// Failure reported by a platform adapter for a single call.
#[derive(Error, Debug, Clone)]
pub enum AdapterError {
    /// The platform answered with a non-success status.
    #[error("Platform rejected request ({status}): {message}")]
    Rejected {
        status: u16,
        message: String,
        detail: Option<serde_json::Value>,
    },

    /// The request never produced a response.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The call exceeded its time bound.
    #[error("Timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// A remotely hosted creative could not be downloaded.
    #[error("Could not fetch creative {url}: {message}")]
    CreativeFetch { url: String, message: String },

    /// The platform answered 2xx with a body we could not read.
    #[error("Unexpected platform response: {0}")]
    Decode(String),

    /// The platform has no such resource step.
    #[error("Operation `{operation}` is not supported by {platform}")]
    Unsupported {
        platform: Platform,
        operation: &'static str,
    },

    /// A step ran without the handle it depends on.
    #[error("Missing parent resource: {0}")]
    MissingParent(StepRole),
}

impl AdapterError {
    /// Structured platform error detail, when the platform sent one.
    pub fn platform_detail(&self) -> Option<&serde_json::Value> {
        match self {
            AdapterError::Rejected { detail, .. } => detail.as_ref(),
            _ => None,
        }
    }

    /// How this error is classified in a step result.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            AdapterError::Timeout { .. } => FailureKind::Timeout,
            AdapterError::Unsupported { .. } => FailureKind::Unsupported,
            AdapterError::MissingParent(_) => FailureKind::Integrity,
            _ => FailureKind::Adapter,
        }
    }
}

/// Convenience Result type for provisioning operations.
pub type Result<T> = std::result::Result<T, ProvisionError>;
