//! OAuth token exchange logic.
//!
//! Handles exchanging authorization codes for user access tokens.

use crate::error::{Error, Result};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;

/// User-to-server access token issued for one authorization code.
#[derive(Clone, PartialEq, Eq)]
pub struct UserAccessToken {
    pub token: String,
    pub scope: Option<String>,
    pub token_type: Option<String>,
}

impl fmt::Debug for UserAccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserAccessToken")
            .field("token", &"***")
            .field("scope", &self.scope)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// GitHub token endpoint response.
///
/// GitHub answers `200 OK` even for bad codes, with `error` fields instead of
/// an `access_token`, so every field is optional.
#[derive(Deserialize, Debug, Default)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Exchanges authorization codes at `{web_url}/login/oauth/access_token`.
#[derive(Clone)]
pub struct TokenExchangeClient {
    http: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl TokenExchangeClient {
    pub fn new(
        http: Client,
        web_url: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url: format!("{}/login/oauth/access_token", web_url),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
        }
    }

    /// Exchange an authorization code for a user access token.
    ///
    /// Exactly one request. Never retried: the code is single-use, so a
    /// second attempt could only fail.
    pub async fn exchange_code(&self, code: &str) -> Result<UserAccessToken> {
        let form = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        tracing::debug!("Exchanging authorization code for token at {}", self.token_url);

        let response = self
            .http
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // Non-JSON or error bodies carry no token; they all collapse into
        // AuthExchange below.
        let token_response: TokenResponse = serde_json::from_str(&body).unwrap_or_default();

        match token_response.access_token.filter(|t| !t.is_empty()) {
            Some(token) => {
                tracing::debug!(
                    scope = ?token_response.scope,
                    "Token exchange successful"
                );
                Ok(UserAccessToken {
                    token,
                    scope: token_response.scope,
                    token_type: token_response.token_type,
                })
            }
            None => {
                tracing::warn!(
                    status = status.as_u16(),
                    error = ?token_response.error,
                    "Token endpoint returned no access token"
                );
                Err(Error::AuthExchange {
                    error: token_response.error,
                    description: token_response.error_description,
                })
            }
        }
    }
}
