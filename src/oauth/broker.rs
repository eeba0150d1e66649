//! Installation access tokens.
//!
//! Trades a freshly signed App JWT plus an installation id for a token
//! scoped to that installation's repositories.

use super::signer::{sign, AppCredential};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;

/// Installation access token as returned by GitHub.
#[derive(Clone, Deserialize)]
pub struct InstallationToken {
    pub token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for InstallationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallationToken")
            .field("token", &"***")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Mints installation tokens. Nothing is cached: every call re-signs and
/// re-exchanges.
#[derive(Clone)]
pub struct InstallationTokenBroker {
    http: Client,
    api_url: String,
    credential: AppCredential,
}

impl InstallationTokenBroker {
    pub fn new(http: Client, api_url: impl Into<String>, credential: AppCredential) -> Self {
        Self {
            http,
            api_url: api_url.into(),
            credential,
        }
    }

    /// `POST /app/installations/{id}/access_tokens`, single attempt.
    pub async fn get_installation_token(&self, installation_id: u64) -> Result<InstallationToken> {
        let assertion = sign(&self.credential, Utc::now())?;
        let url = format!(
            "{}/app/installations/{}/access_tokens",
            self.api_url, installation_id
        );

        tracing::debug!(installation_id, "Requesting installation token");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&assertion.token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                installation_id,
                status = status.as_u16(),
                "GitHub rejected installation token request"
            );
            return Err(Error::UpstreamAuth {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|source| Error::Decode {
            context: "installation token response",
            source,
        })
    }
}
