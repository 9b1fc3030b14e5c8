//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub platforms: Vec<&'static str>,
    pub chat: bool,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut platforms: Vec<&'static str> = state.pipelines.keys().map(|p| p.slug()).collect();
    platforms.sort_unstable();
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        platforms,
        chat: state.router.is_some(),
    })
}
