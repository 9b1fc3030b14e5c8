//! # Adrelay Dispatch
//!
//! Turns conversational requests into provisioning runs.
//!
//! - [`CapabilityRegistry`] - Named capabilities with trigger policies and
//!   typed input schemas
//! - [`IntentRouter`] - Bounded tool-calling loop over a [`ChatModel`]
//! - [`OpenAiChatModel`] - Chat-completions client with function calling

pub mod campaigns;
pub mod capability;
pub mod model;
pub mod router;
pub mod schema;

pub use campaigns::{campaign_registry, CreateCampaign, ListConnectedPlatforms};
pub use capability::{
    Capability, CapabilityDescriptor, CapabilityError, CapabilityRegistry, CapabilitySummary,
};
pub use model::{
    ChatMessage, ChatModel, ChatRole, ModelConfig, ModelError, ModelReply, OpenAiChatModel,
    ToolCall, ToolDefinition,
};
pub use router::{DispatchEvent, DispatchOutcome, IntentRouter, Invocation, DEFAULT_MAX_ROUNDS};
pub use schema::{FieldKind, InputSchema, SchemaViolation};
