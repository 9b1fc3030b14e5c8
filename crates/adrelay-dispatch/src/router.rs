//! Intent dispatch router.
//!
//! Runs one conversational turn: the model sees every capability as a tool
//! plus its trigger policy, and may call them for a bounded number of
//! rounds. Arguments are checked against the capability's schema before
//! anything runs. Credentials are passed to capabilities out of band and
//! never enter the message history.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use adrelay_core::PlatformCredentials;

use crate::capability::{CapabilityError, CapabilityRegistry};
use crate::model::{ChatMessage, ChatModel, ChatRole, ModelError, ToolCall, ToolDefinition};

/// Model round trips allowed per turn when not configured otherwise.
pub const DEFAULT_MAX_ROUNDS: usize = 5;

/// Progress of a turn, streamed to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchEvent {
    Text {
        content: String,
    },
    CapabilityInvoked {
        name: String,
        arguments: Value,
    },
    CapabilityResult {
        name: String,
        success: bool,
        output: Value,
    },
    Done {
        rounds: usize,
    },
    Error {
        message: String,
    },
}

/// A capability that actually ran during the turn.
#[derive(Debug, Clone, Serialize)]
pub struct Invocation {
    pub name: String,
    pub arguments: Value,
    pub success: bool,
}

/// Summary of a finished turn.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub rounds: usize,
    pub invocations: Vec<Invocation>,
    pub final_text: String,
}

pub struct IntentRouter {
    model: Arc<dyn ChatModel>,
    registry: Arc<CapabilityRegistry>,
    max_rounds: usize,
}

impl IntentRouter {
    pub fn new(model: Arc<dyn ChatModel>, registry: Arc<CapabilityRegistry>) -> Self {
        Self {
            model,
            registry,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn system_prompt(&self) -> String {
        format!(
            "You help advertisers launch campaigns on their connected ad platforms.\n\
             Call a capability only when the user's request matches its policy:\n\
             {}\n\
             Never invent argument values. If a required value is missing, ask the user for it.\n\
             Never ask for, repeat or guess account credentials.",
            self.registry.policies()
        )
    }

    /// Run one turn over `history`.
    ///
    /// Caller-supplied system messages are replaced by the router's own
    /// prompt. Events are best-effort: a dropped receiver does not stop the
    /// turn.
    pub async fn dispatch(
        &self,
        history: &[ChatMessage],
        credentials: &PlatformCredentials,
        events: &mpsc::Sender<DispatchEvent>,
    ) -> Result<DispatchOutcome, ModelError> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(self.system_prompt()));
        messages.extend(
            history
                .iter()
                .filter(|m| m.role != ChatRole::System)
                .cloned(),
        );

        let tools = self.registry.tool_definitions();
        let mut invoked: HashMap<(String, String), String> = HashMap::new();
        let mut invocations = Vec::new();
        let mut final_text = String::new();
        let mut rounds = 0;

        for round in 0..self.max_rounds {
            let allow_tools = round + 1 < self.max_rounds;
            let offered: &[ToolDefinition] = if allow_tools { &tools } else { &[] };

            let reply = match self.model.complete(&messages, offered).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(round, error = %e, "Model call failed");
                    emit(events, DispatchEvent::Error { message: e.to_string() }).await;
                    return Err(e);
                }
            };
            rounds += 1;

            if reply.tool_calls.is_empty() || !allow_tools {
                final_text = reply.content;
                break;
            }

            debug!(round, calls = reply.tool_calls.len(), "Model requested capabilities");
            if !reply.content.trim().is_empty() {
                emit(events, DispatchEvent::Text { content: reply.content.clone() }).await;
            }
            messages.push(ChatMessage::assistant(reply.content, reply.tool_calls.clone()));

            for call in &reply.tool_calls {
                let key = (call.name.clone(), call.arguments.to_string());
                let content = match invoked.get(&key) {
                    Some(previous) => {
                        debug!(capability = %call.name, "Skipping repeated invocation");
                        json!({
                            "error": "Already invoked with identical arguments this turn",
                            "previousResult": previous,
                        })
                        .to_string()
                    }
                    None => {
                        let (output, ran) = self
                            .handle_call(call, credentials, events, &mut invocations)
                            .await;
                        let content = output.to_string();
                        if ran {
                            invoked.insert(key, content.clone());
                        }
                        content
                    }
                };
                messages.push(ChatMessage::tool(call.id.clone(), content));
            }
        }

        if !final_text.trim().is_empty() {
            emit(events, DispatchEvent::Text { content: final_text.clone() }).await;
        }
        emit(events, DispatchEvent::Done { rounds }).await;

        info!(rounds, invocations = invocations.len(), "Dispatch turn finished");
        Ok(DispatchOutcome {
            rounds,
            invocations,
            final_text,
        })
    }

    /// Validate and run one tool call. Returns the tool output and whether
    /// the capability handler ran.
    async fn handle_call(
        &self,
        call: &ToolCall,
        credentials: &PlatformCredentials,
        events: &mpsc::Sender<DispatchEvent>,
        invocations: &mut Vec<Invocation>,
    ) -> (Value, bool) {
        let Some(capability) = self.registry.get(&call.name) else {
            warn!(capability = %call.name, "Model named an unknown capability");
            let output = json!({ "error": format!("Unknown capability `{}`", call.name) });
            emit_result(events, &call.name, false, &output).await;
            return (output, false);
        };

        if let Err(violation) = capability.descriptor().schema.validate(&call.arguments) {
            warn!(capability = %call.name, field = %violation.field, "Rejected capability arguments");
            let output = json!({ "error": violation.to_string() });
            emit_result(events, &call.name, false, &output).await;
            return (output, false);
        }

        info!(capability = %call.name, "Invoking capability");
        emit(
            events,
            DispatchEvent::CapabilityInvoked {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            },
        )
        .await;

        let (output, success) = match capability.invoke(&call.arguments, credentials).await {
            Ok(output) => (output, true),
            Err(e) => {
                warn!(capability = %call.name, error = %e, "Capability failed");
                (error_output(&e), false)
            }
        };
        emit_result(events, &call.name, success, &output).await;
        invocations.push(Invocation {
            name: call.name.clone(),
            arguments: call.arguments.clone(),
            success,
        });
        (output, true)
    }
}

fn error_output(err: &CapabilityError) -> Value {
    match err {
        CapabilityError::StepFailed { summary, created } => json!({
            "error": summary,
            "created": created,
        }),
        other => json!({ "error": other.to_string() }),
    }
}

async fn emit(events: &mpsc::Sender<DispatchEvent>, event: DispatchEvent) {
    let _ = events.send(event).await;
}

async fn emit_result(events: &mpsc::Sender<DispatchEvent>, name: &str, success: bool, output: &Value) {
    emit(
        events,
        DispatchEvent::CapabilityResult {
            name: name.to_string(),
            success,
            output: output.clone(),
        },
    )
    .await;
}
