//! Per-request execution context.
//!
//! An [`ExecutionContext`] is created at request entry, passed by reference
//! through every capability and adapter call, and dropped at request exit.
//! Nothing here is stored process-wide.

use std::fmt;

use serde::Deserialize;

use crate::types::Platform;

/// Caller-supplied bearer credential.
///
/// `Debug` is redacted and there is no `Serialize` impl, so the secret
/// cannot end up in logs, responses or model prompts by accident.
#[derive(Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Raw secret, for building an Authorization header or token exchange.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Account and credential values authorizing one pipeline run.
///
/// Missing fields deserialize as blank so validation reports them by rule.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    /// Advertiser account the resources are created in.
    #[serde(default)]
    pub account_id: String,

    /// Manager / parent account the caller authenticates through.
    #[serde(default)]
    pub manager_id: Option<String>,

    #[serde(default)]
    pub credential: Credential,
}

impl ExecutionContext {
    pub fn new(account_id: impl Into<String>, credential: Credential) -> Self {
        Self {
            account_id: account_id.into(),
            manager_id: None,
            credential,
        }
    }

    pub fn with_manager(mut self, manager_id: impl Into<String>) -> Self {
        self.manager_id = Some(manager_id.into());
        self
    }

    /// Account id with separators and the `act_` prefix stripped.
    pub fn customer_id(&self) -> String {
        normalize_account_id(&self.account_id)
    }

    pub fn manager_customer_id(&self) -> Option<String> {
        self.manager_id
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .map(normalize_account_id)
    }
}

/// Strip the `act_` prefix, dashes and whitespace from an account id.
pub fn normalize_account_id(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix("act_").unwrap_or(trimmed);
    trimmed
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect()
}

/// Side-channel credentials of a conversation, one context per platform.
/// Never forwarded to the language model.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformCredentials {
    #[serde(default)]
    pub search_ads: Option<ExecutionContext>,
    #[serde(default)]
    pub video_ads: Option<ExecutionContext>,
    #[serde(default)]
    pub social_ads: Option<ExecutionContext>,
}

impl PlatformCredentials {
    pub fn for_platform(&self, platform: Platform) -> Option<&ExecutionContext> {
        match platform {
            Platform::SearchAds => self.search_ads.as_ref(),
            Platform::VideoAds => self.video_ads.as_ref(),
            Platform::SocialAds => self.social_ads.as_ref(),
        }
    }

    /// Platforms with a non-blank credential.
    pub fn connected(&self) -> Vec<Platform> {
        Platform::ALL
            .into_iter()
            .filter(|p| {
                self.for_platform(*p)
                    .is_some_and(|ctx| !ctx.credential.is_blank())
            })
            .collect()
    }
}
