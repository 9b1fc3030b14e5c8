//! Capability listing.

use axum::{extract::State, Json};

use adrelay_dispatch::CapabilitySummary;

use crate::state::AppState;

/// Every registered capability with its trigger policy and JSON schema.
pub async fn list_capabilities(State(state): State<AppState>) -> Json<Vec<CapabilitySummary>> {
    Json(state.registry.descriptors().map(|d| d.summary()).collect())
}
