//! JSON error responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use adrelay_core::{PipelineResult, ProvisionError};

/// Error returned by every handler as a single JSON object with an
/// `error` message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// A run that stopped at a resource step. Lists what it left behind.
    pub fn failed_run(result: &PipelineResult) -> Self {
        let mut err = match result.error() {
            Some(e) => Self::from(e),
            None => Self::new(StatusCode::INTERNAL_SERVER_ERROR, result.summary.clone()),
        };
        let created: Vec<Value> = result
            .handles
            .iter()
            .map(|h| json!({ "role": h.role.key(), "id": h.id }))
            .collect();
        err.body["created"] = json!(created);
        err.body["failedStep"] = json!(result.failed_step().map(|s| s.role.key()));
        err.body["runId"] = json!(result.run_id);
        err.body["message"] = json!(result.summary);
        err
    }
}

impl From<ProvisionError> for ApiError {
    fn from(err: ProvisionError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let mut body = json!({ "error": err.to_string() });
        match &err {
            ProvisionError::Validation(v) => body["rule"] = json!(v.rule),
            ProvisionError::Adapter {
                detail: Some(detail),
                ..
            } => body["detail"] = detail.clone(),
            _ => {}
        }
        Self { status, body }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let status = match rejection {
            JsonRejection::MissingJsonContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::BAD_REQUEST,
        };
        Self::new(status, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
