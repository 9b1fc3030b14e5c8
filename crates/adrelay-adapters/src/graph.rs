//! Social graph API transport.

use serde_json::Value;
use tracing::debug;

use adrelay_core::{AdapterError, Credential, ExecutionContext};

use crate::config::SocialApiConfig;
use crate::transport::{read_json, str_at, transport_error};

/// Deepest human-readable message of a graph API error body.
pub fn graph_error_message(body: &Value) -> Option<String> {
    str_at(body, "/error/error_user_msg").or_else(|| str_at(body, "/error/message"))
}

/// Session-bound client posting to one ad account's edges.
pub struct GraphClient {
    client: reqwest::Client,
    base_url: String,
    api_version: String,
    account_id: String,
    access_token: Credential,
    timeout_ms: u64,
}

impl GraphClient {
    pub fn new(
        client: reqwest::Client,
        config: &SocialApiConfig,
        ctx: &ExecutionContext,
        timeout_ms: u64,
    ) -> Self {
        Self {
            client,
            base_url: config.graph_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            account_id: ctx.customer_id(),
            access_token: ctx.credential.clone(),
            timeout_ms,
        }
    }

    fn edge_url(&self, edge: &str) -> String {
        format!(
            "{}/{}/act_{}/{}",
            self.base_url, self.api_version, self.account_id, edge
        )
    }

    /// POST `body` to `act_{id}/{edge}` and return the decoded response.
    pub async fn create(&self, edge: &str, body: &Value) -> Result<Value, AdapterError> {
        let url = self.edge_url(edge);
        debug!(url = %url, "Graph API create");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.access_token.expose())
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout_ms))?;
        read_json(response, self.timeout_ms, graph_error_message).await
    }
}

/// The `id` field most graph edges return.
pub fn created_id(raw: &Value) -> Option<String> {
    match raw.get("id") {
        Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Image hash from an `adimages` response (`{"images": {"<name>": {"hash"}}}`).
pub fn image_hash(raw: &Value) -> Option<String> {
    raw.get("images")
        .and_then(Value::as_object)
        .and_then(|images| images.values().next())
        .and_then(|image| str_at(image, "/hash"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpSettings;
    use mockito::Server;
    use serde_json::json;

    #[tokio::test]
    async fn test_posts_to_account_edge_with_bearer() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v19.0/act_55501/campaigns")
            .match_header("authorization", "Bearer EAAB-token")
            .with_status(200)
            .with_body(r#"{"id":"120200000001"}"#)
            .create_async()
            .await;

        let config = SocialApiConfig {
            graph_url: server.url(),
            api_version: "v19.0".into(),
        };
        let ctx = ExecutionContext::new("act_55501", Credential::new("EAAB-token"));
        let client = GraphClient::new(
            HttpSettings::default().build_client().unwrap(),
            &config,
            &ctx,
            30_000,
        );

        let raw = client.create("campaigns", &json!({"name": "x"})).await.unwrap();
        assert_eq!(created_id(&raw).as_deref(), Some("120200000001"));
        mock.assert_async().await;
    }

    #[test]
    fn test_user_message_preferred() {
        let body = json!({"error": {
            "message": "Invalid parameter",
            "error_user_msg": "The daily budget is below the minimum of $1.00."
        }});
        assert_eq!(
            graph_error_message(&body).as_deref(),
            Some("The daily budget is below the minimum of $1.00.")
        );
    }

    #[test]
    fn test_image_hash_extraction() {
        let raw = json!({"images": {"logo.png": {"hash": "abc123", "url": "https://x"}}});
        assert_eq!(image_hash(&raw).as_deref(), Some("abc123"));
        assert_eq!(image_hash(&json!({"images": {}})), None);
    }
}
