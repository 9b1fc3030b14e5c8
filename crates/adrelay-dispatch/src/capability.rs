//! Capability descriptors and the registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use adrelay_core::{Platform, PlatformCredentials, ProvisionError};

use crate::model::ToolDefinition;
use crate::schema::InputSchema;

/// What a capability is, when to use it, and what it accepts.
#[derive(Debug, Clone)]
pub struct CapabilityDescriptor {
    pub name: &'static str,
    pub description: String,
    /// Natural-language rule telling the model when the capability applies.
    pub trigger_policy: String,
    pub schema: InputSchema,
    /// Pipeline the capability runs, if any.
    pub platform: Option<Platform>,
}

impl CapabilityDescriptor {
    pub fn to_tool_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.to_string(),
            description: format!("{} {}", self.description, self.trigger_policy),
            parameters: self.schema.to_json_schema(),
        }
    }

    pub fn summary(&self) -> CapabilitySummary {
        CapabilitySummary {
            name: self.name,
            description: self.description.clone(),
            trigger_policy: self.trigger_policy.clone(),
            platform: self.platform,
            input_schema: self.schema.to_json_schema(),
        }
    }
}

/// Serializable view of a descriptor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitySummary {
    pub name: &'static str,
    pub description: String,
    pub trigger_policy: String,
    pub platform: Option<Platform>,
    pub input_schema: Value,
}

#[derive(Error, Debug)]
pub enum CapabilityError {
    /// The conversation carries no credential for the platform.
    #[error("{0} is not connected; connect the account before creating campaigns")]
    NotConnected(Platform),

    /// Arguments passed the schema but could not form a campaign.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Validation or configuration stopped the run before any resource was
    /// created.
    #[error(transparent)]
    Provision(#[from] ProvisionError),

    /// A resource step failed after others were created.
    #[error("{summary}")]
    StepFailed {
        summary: String,
        created: Vec<String>,
    },
}

/// A named operation the router may invoke.
#[async_trait]
pub trait Capability: Send + Sync {
    fn descriptor(&self) -> &CapabilityDescriptor;

    /// Run with schema-validated `args`. Credentials come from `credentials`
    /// only.
    async fn invoke(
        &self,
        args: &Value,
        credentials: &PlatformCredentials,
    ) -> Result<Value, CapabilityError>;
}

/// Explicit name → capability table.
#[derive(Default, Clone)]
pub struct CapabilityRegistry {
    capabilities: Vec<Arc<dyn Capability>>,
    by_name: HashMap<&'static str, usize>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a capability. A later registration under the same name replaces
    /// the earlier one.
    pub fn register(&mut self, capability: Arc<dyn Capability>) {
        let name = capability.descriptor().name;
        match self.by_name.get(name) {
            Some(&index) => self.capabilities[index] = capability,
            None => {
                self.by_name.insert(name, self.capabilities.len());
                self.capabilities.push(capability);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Capability>> {
        self.by_name.get(name).map(|&i| &self.capabilities[i])
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &CapabilityDescriptor> {
        self.capabilities.iter().map(|c| c.descriptor())
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.descriptors().map(|d| d.to_tool_definition()).collect()
    }

    /// One line per capability: `- name: policy`.
    pub fn policies(&self) -> String {
        self.descriptors()
            .map(|d| format!("- {}: {}", d.name, d.trigger_policy))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
