//! Shared HTTP plumbing for the platform transports.

use reqwest::Response;
use serde_json::Value;

use adrelay_core::AdapterError;

pub(crate) fn transport_error(err: reqwest::Error, timeout_ms: u64) -> AdapterError {
    if err.is_timeout() {
        AdapterError::Timeout {
            after_ms: timeout_ms,
        }
    } else {
        AdapterError::Transport(err.to_string())
    }
}

/// Read a response body, turning non-2xx statuses into
/// [`AdapterError::Rejected`] using `extract` to find the deepest message.
pub(crate) async fn read_json(
    response: Response,
    timeout_ms: u64,
    extract: fn(&Value) -> Option<String>,
) -> Result<Value, AdapterError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| transport_error(e, timeout_ms))?;

    if !status.is_success() {
        return Err(rejection(status.as_u16(), &text, extract));
    }

    serde_json::from_str(&text).map_err(|e| AdapterError::Decode(e.to_string()))
}

pub(crate) fn rejection(
    status: u16,
    body: &str,
    extract: fn(&Value) -> Option<String>,
) -> AdapterError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .and_then(extract)
        .unwrap_or_else(|| fallback_message(status, body));
    let detail = parsed.and_then(|v| v.get("error").cloned());
    AdapterError::Rejected {
        status,
        message,
        detail,
    }
}

fn fallback_message(status: u16, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {}", status)
    } else {
        body.chars().take(500).collect()
    }
}

pub(crate) fn str_at(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
