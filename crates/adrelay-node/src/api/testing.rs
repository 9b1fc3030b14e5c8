//! Stub adapter and scripted model for handler tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use adrelay_adapters::{AdapterResponse, AdapterResult, AdapterSession, PlatformAdapter, StepRequest};
use adrelay_core::{AdapterError, ConfigurationError, ExecutionContext, Platform, StepRole};
use adrelay_dispatch::{ChatMessage, ChatModel, ModelError, ModelReply, ToolDefinition};

/// Hands out sequential ids; fails at `fail_at` with a transport error.
pub(crate) struct StubAdapter {
    platform: Platform,
    fail_at: Option<StepRole>,
    calls: Arc<AtomicUsize>,
}

impl StubAdapter {
    pub(crate) fn new(platform: Platform, fail_at: Option<StepRole>) -> Arc<Self> {
        Arc::new(Self {
            platform,
            fail_at,
            calls: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PlatformAdapter for StubAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn open_session(
        &self,
        _ctx: &ExecutionContext,
    ) -> Result<Box<dyn AdapterSession>, ConfigurationError> {
        Ok(Box::new(StubSession {
            platform: self.platform,
            fail_at: self.fail_at,
            calls: self.calls.clone(),
        }))
    }
}

struct StubSession {
    platform: Platform,
    fail_at: Option<StepRole>,
    calls: Arc<AtomicUsize>,
}

impl StubSession {
    fn call(&self, role: StepRole) -> AdapterResult {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_at == Some(role) {
            return Err(AdapterError::Transport("connection reset".into()));
        }
        Ok(AdapterResponse::new(
            Some(format!("{}/{}", role.key(), n)),
            json!({}),
        ))
    }
}

#[async_trait]
impl AdapterSession for StubSession {
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
    async fn create_ad(&mut self, _req: &StepRequest<'_>) -> AdapterResult {
        self.call(StepRole::Ad)
    }
}

/// Replays replies in order, then answers with plain text.
pub(crate) struct ScriptedModel {
    replies: Mutex<VecDeque<ModelReply>>,
    requests: tokio::sync::Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    pub(crate) fn new(replies: Vec<ModelReply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: tokio::sync::Mutex::new(Vec::new()),
        })
    }

    /// Every request the model received, as JSON text.
    pub(crate) async fn rendered_requests(&self) -> String {
        serde_json::to_string(&*self.requests.lock().await).unwrap()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolDefinition],
    ) -> Result<ModelReply, ModelError> {
        self.requests.lock().await.push(messages.to_vec());
        let next = self.replies.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| ModelReply {
            content: "Done.".into(),
            ..Default::default()
        }))
    }
}
