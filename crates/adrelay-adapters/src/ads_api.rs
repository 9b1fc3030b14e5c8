//! Mutate-style ads API transport, shared by the search and video adapters.
//!
//! Two call paths exist. [`DirectMutate`] exchanges the caller's refresh
//! credential for a fresh access token before every call and posts to a
//! resource's own `:mutate` endpoint. [`BatchMutateClient`] posts to the
//! combined `googleAds:mutate` endpoint and keeps its token for the session.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use adrelay_core::{AdapterError, Credential, ExecutionContext, Platform};

use crate::adapter::{AdapterResponse, AdapterResult};
use crate::config::{AdsApiConfig, AdsApiSecrets};
use crate::transport::{read_json, rejection, str_at, transport_error};

/// Deepest human-readable message of an ads API error body.
pub fn ads_error_message(body: &Value) -> Option<String> {
    str_at(body, "/error/details/0/errors/0/message").or_else(|| str_at(body, "/error/message"))
}

fn oauth_error_message(body: &Value) -> Option<String> {
    str_at(body, "/error_description")
        .or_else(|| str_at(body, "/error"))
        .map(|m| format!("Token exchange failed: {}", m))
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Refresh-token exchange against the OAuth token endpoint.
#[derive(Clone)]
pub struct TokenExchange {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    timeout_ms: u64,
}

impl TokenExchange {
    pub async fn exchange(&self, refresh: &Credential) -> Result<String, AdapterError> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh.expose()),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout_ms))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| transport_error(e, self.timeout_ms))?;
        if !status.is_success() {
            return Err(rejection(status.as_u16(), &text, oauth_error_message));
        }

        let token: TokenResponse =
            serde_json::from_str(&text).map_err(|e| AdapterError::Decode(e.to_string()))?;
        Ok(token.access_token)
    }
}

/// Everything needed to address one customer account.
#[derive(Clone)]
pub struct AdsEndpoint {
    client: reqwest::Client,
    base_url: String,
    api_version: String,
    developer_token: String,
    customer_id: String,
    login_customer_id: Option<String>,
    refresh: Credential,
    exchange: TokenExchange,
    timeout_ms: u64,
}

impl AdsEndpoint {
    pub(crate) fn new(
        client: reqwest::Client,
        config: &AdsApiConfig,
        secrets: AdsApiSecrets,
        ctx: &ExecutionContext,
        timeout_ms: u64,
    ) -> Self {
        let exchange = TokenExchange {
            client: client.clone(),
            token_url: config.token_url.clone(),
            client_id: secrets.client_id,
            client_secret: secrets.client_secret,
            timeout_ms,
        };
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            developer_token: secrets.developer_token,
            customer_id: ctx.customer_id(),
            login_customer_id: ctx.manager_customer_id(),
            refresh: ctx.credential.clone(),
            exchange,
            timeout_ms,
        }
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    /// `customers/{id}/{collection}/{temp}`-style resource name prefix.
    pub fn resource_prefix(&self, collection: &str) -> String {
        format!("customers/{}/{}", self.customer_id, collection)
    }

    fn url(&self, suffix: &str) -> String {
        format!(
            "{}/{}/customers/{}/{}",
            self.base_url, self.api_version, self.customer_id, suffix
        )
    }

    async fn post(&self, token: &str, suffix: &str, body: &Value) -> Result<Value, AdapterError> {
        let url = self.url(suffix);
        debug!(url = %url, "Ads API mutate");

        let mut request = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header("developer-token", &self.developer_token)
            .json(body);
        if let Some(login) = &self.login_customer_id {
            request = request.header("login-customer-id", login);
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout_ms))?;
        read_json(response, self.timeout_ms, ads_error_message).await
    }
}

/// Single-resource mutate with a just-in-time token.
#[derive(Clone)]
pub struct DirectMutate {
    endpoint: AdsEndpoint,
}

impl DirectMutate {
    pub fn new(endpoint: AdsEndpoint) -> Self {
        Self { endpoint }
    }

    /// Create one `resource` (e.g. `campaignBudgets`) from `create`.
    pub async fn create(&self, resource: &str, create: Value) -> AdapterResult {
        let token = self.endpoint.exchange.exchange(&self.endpoint.refresh).await?;
        let body = json!({ "operations": [{ "create": create }] });
        let raw = self
            .endpoint
            .post(&token, &format!("{}:mutate", resource), &body)
            .await?;
        let id = str_at(&raw, "/results/0/resourceName");
        Ok(AdapterResponse::new(id, raw))
    }
}

/// Combined mutate bound to one session; exchanges its token once.
pub struct BatchMutateClient {
    endpoint: AdsEndpoint,
    token: Option<String>,
}

impl BatchMutateClient {
    pub fn new(endpoint: AdsEndpoint) -> Self {
        Self {
            endpoint,
            token: None,
        }
    }

    async fn token(&mut self) -> Result<String, AdapterError> {
        if let Some(token) = &self.token {
            return Ok(token.clone());
        }
        let token = self.endpoint.exchange.exchange(&self.endpoint.refresh).await?;
        self.token = Some(token.clone());
        Ok(token)
    }

    /// Run one `{operation}` (e.g. `campaignOperation`) creating `create`.
    pub async fn create(&mut self, operation: &str, create: Value) -> AdapterResult {
        let token = self.token().await?;
        let body = json!({ "mutateOperations": [{ (operation): { "create": create } }] });
        let raw = self.endpoint.post(&token, "googleAds:mutate", &body).await?;
        let id = raw
            .pointer("/mutateOperationResponses/0")
            .and_then(Value::as_object)
            .and_then(|results| results.values().next())
            .and_then(|result| str_at(result, "/resourceName"));
        Ok(AdapterResponse::new(id, raw))
    }
}

/// Open both transports for a run.
pub(crate) fn open(
    platform: Platform,
    client: &reqwest::Client,
    config: &AdsApiConfig,
    ctx: &ExecutionContext,
    timeout_ms: u64,
) -> Result<(DirectMutate, BatchMutateClient), adrelay_core::ConfigurationError> {
    let secrets = config.secrets(platform)?;
    let endpoint = AdsEndpoint::new(client.clone(), config, secrets, ctx, timeout_ms);
    Ok((
        DirectMutate::new(endpoint.clone()),
        BatchMutateClient::new(endpoint),
    ))
}
