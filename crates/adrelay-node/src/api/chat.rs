//! Conversational endpoint.
//!
//! Streams dispatch events as Server-Sent Events. The `context` carries
//! platform credentials to capabilities and is never shown to the model.

use std::convert::Infallible;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::Stream;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tracing::{error, info};

use adrelay_core::PlatformCredentials;
use adrelay_dispatch::{ChatMessage, DispatchEvent};

use crate::api::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub context: PlatformCredentials,
}

fn event_name(event: &DispatchEvent) -> &'static str {
    match event {
        DispatchEvent::Text { .. } => "text",
        DispatchEvent::CapabilityInvoked { .. } => "capability_invoked",
        DispatchEvent::CapabilityResult { .. } => "capability_result",
        DispatchEvent::Done { .. } => "done",
        DispatchEvent::Error { .. } => "error",
    }
}

pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let Json(req) = body?;
    let router = state.router.clone().ok_or_else(|| {
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "No language model is configured on this node",
        )
    })?;
    if req.messages.is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "messages must not be empty"));
    }

    info!(
        messages = req.messages.len(),
        connected = ?req.context.connected(),
        "Chat turn started"
    );

    let (tx, rx) = mpsc::channel(32);
    tokio::spawn(async move {
        if let Err(e) = router.dispatch(&req.messages, &req.context, &tx).await {
            error!(error = %e, "Chat turn aborted");
        }
    });

    let stream = ReceiverStream::new(rx).map(|event| {
        let payload = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Ok(Event::default().event(event_name(&event)).data(payload))
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
