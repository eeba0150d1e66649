//! Login flow orchestration.
//!
//! ```text
//! Start ─login─▶ AwaitingProviderCallback ─callback─▶ CodeExchanged
//!                                                       │
//!               single_step ◀───────────────────────────┤
//!                    │                                  │ two_step
//!                    │                                  ▼
//!                    │                    AwaitingInstallationCallback
//!                    │                                  │ post_install
//!                    │                                  ▼
//!                    │                        InstallationLinked
//!                    ▼                                  │
//!                Completed ◀────────────────────────────┘
//! ```
//!
//! Every transition is driven by an inbound request. Any error ends the flow
//! in `Failed`; the browser has to start over at `/auth/login`.

use super::broker::InstallationTokenBroker;
use super::correlation::CorrelationStore;
use super::exchange::{TokenExchangeClient, UserAccessToken};
use super::provider;
use crate::config::{AppConfig, FlowMode};
use crate::error::{Error, Result};
use crate::github::GitHubClient;
use reqwest::Client;
use std::fmt;
use uuid::Uuid;

/// Position of one login in the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStage {
    Start,
    AwaitingProviderCallback,
    CodeExchanged,
    AwaitingInstallationCallback,
    InstallationLinked,
    Completed,
    Failed,
}

impl fmt::Display for FlowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowStage::Start => "start",
            FlowStage::AwaitingProviderCallback => "awaiting_provider_callback",
            FlowStage::CodeExchanged => "code_exchanged",
            FlowStage::AwaitingInstallationCallback => "awaiting_installation_callback",
            FlowStage::InstallationLinked => "installation_linked",
            FlowStage::Completed => "completed",
            FlowStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What the correlation store holds for an in-flight `state`.
#[derive(Debug, Clone)]
pub enum PendingFlow {
    /// Issued by `/auth/login`, waiting for GitHub's callback.
    AwaitingProviderCallback,
    /// Two-step only: user token parked until GitHub's post-install redirect.
    AwaitingInstallationCallback(UserAccessToken),
}

impl PendingFlow {
    pub fn stage(&self) -> FlowStage {
        match self {
            PendingFlow::AwaitingProviderCallback => FlowStage::AwaitingProviderCallback,
            PendingFlow::AwaitingInstallationCallback(_) => FlowStage::AwaitingInstallationCallback,
        }
    }
}

/// Redirect produced by `begin_login`.
#[derive(Debug, Clone)]
pub struct LoginRedirect {
    pub url: String,
    pub state: String,
}

/// Redirect-side settings the flow needs, copied out of `AppConfig`.
#[derive(Debug, Clone)]
pub struct FlowOptions {
    pub mode: FlowMode,
    pub client_id: String,
    pub scope: String,
    pub web_url: String,
    pub app_slug: String,
    pub frontend_url: String,
    pub callback_url: String,
    pub post_install_url: String,
}

/// Sequences login → code exchange → (installation) → frontend redirect.
pub struct AuthFlow {
    options: FlowOptions,
    exchange: TokenExchangeClient,
    broker: InstallationTokenBroker,
    github: GitHubClient,
    correlations: CorrelationStore<PendingFlow>,
}

impl AuthFlow {
    pub fn new(
        options: FlowOptions,
        exchange: TokenExchangeClient,
        broker: InstallationTokenBroker,
        github: GitHubClient,
        correlations: CorrelationStore<PendingFlow>,
    ) -> Self {
        Self {
            options,
            exchange,
            broker,
            github,
            correlations,
        }
    }

    /// Wire every collaborator from configuration, sharing one HTTP client.
    pub fn from_config(config: &AppConfig, http: Client) -> Self {
        let settings = &config.settings;
        let callback_url = format!("{}/auth/callback", settings.server.public_url);
        let post_install_url = format!("{}/auth/post_install", settings.server.public_url);

        let options = FlowOptions {
            mode: settings.flow.mode,
            client_id: config.oauth.client_id.clone(),
            scope: settings.github.scope.clone(),
            web_url: settings.github.web_url.clone(),
            app_slug: settings.github.app_slug.clone(),
            frontend_url: settings.flow.frontend_url.clone(),
            callback_url: callback_url.clone(),
            post_install_url,
        };
        let exchange = TokenExchangeClient::new(
            http.clone(),
            &settings.github.web_url,
            config.oauth.client_id.clone(),
            config.oauth.client_secret.clone(),
            callback_url,
        );
        let broker = InstallationTokenBroker::new(
            http.clone(),
            settings.github.api_url.clone(),
            config.app.clone(),
        );
        let github = GitHubClient::new(http, settings.github.api_url.clone());
        let correlations = CorrelationStore::new(
            settings.flow.state_ttl_seconds,
            settings.flow.state_max_entries,
        );

        Self::new(options, exchange, broker, github, correlations)
    }

    pub fn mode(&self) -> FlowMode {
        self.options.mode
    }

    /// Handle to the correlation store (for the cleanup task).
    pub fn correlations(&self) -> CorrelationStore<PendingFlow> {
        self.correlations.clone()
    }

    /// Start: issue a fresh `state` and build GitHub's authorization URL.
    pub fn begin_login(&self) -> LoginRedirect {
        let state = Uuid::new_v4().to_string();
        self.correlations
            .insert(&state, PendingFlow::AwaitingProviderCallback);

        log_transition(&state, FlowStage::Start, FlowStage::AwaitingProviderCallback);

        let url = provider::build_auth_url(
            &self.options.web_url,
            &self.options.client_id,
            &self.options.callback_url,
            &self.options.scope,
            &state,
        );
        LoginRedirect { url, state }
    }

    /// GitHub's OAuth callback. Returns where to send the browser next.
    pub async fn complete_callback(&self, code: &str, state: &str) -> Result<String> {
        let result = self.callback_inner(code, state).await;
        if let Err(e) = &result {
            log_failure(state, FlowStage::AwaitingProviderCallback, e);
        }
        result
    }

    /// GitHub's post-install redirect (two-step only). Returns the final
    /// frontend URL.
    pub async fn complete_installation(
        &self,
        state: &str,
        installation_id: Option<u64>,
        setup_action: Option<&str>,
    ) -> Result<String> {
        let result = self
            .installation_inner(state, installation_id, setup_action)
            .await;
        if let Err(e) = &result {
            log_failure(state, FlowStage::AwaitingInstallationCallback, e);
        }
        result
    }

    async fn callback_inner(&self, code: &str, state: &str) -> Result<String> {
        // Consume the state before exchanging, so a replayed callback is
        // rejected without a second exchange of the same code.
        match self.correlations.take(state)? {
            PendingFlow::AwaitingProviderCallback => {}
            other => {
                tracing::debug!(state = %state, stage = %other.stage(), "State presented at the wrong stage");
                return Err(Error::MissingCorrelation);
            }
        }

        let user_token = self.exchange.exchange_code(code).await?;
        log_transition(state, FlowStage::AwaitingProviderCallback, FlowStage::CodeExchanged);

        match self.options.mode {
            FlowMode::SingleStep => {
                let installations = self.github.user_installations(&user_token.token).await?;
                let installation = installations
                    .installations
                    .first()
                    .ok_or(Error::NoInstallation)?;

                let token = self.broker.get_installation_token(installation.id).await?;
                log_transition(state, FlowStage::CodeExchanged, FlowStage::Completed);
                tracing::info!(installation_id = installation.id, "Login completed");

                Ok(provider::build_frontend_url(
                    &self.options.frontend_url,
                    &[("token", token.token.as_str())],
                ))
            }
            FlowMode::TwoStep => {
                self.correlations
                    .insert(state, PendingFlow::AwaitingInstallationCallback(user_token));
                log_transition(
                    state,
                    FlowStage::CodeExchanged,
                    FlowStage::AwaitingInstallationCallback,
                );

                Ok(provider::build_install_url(
                    &self.options.web_url,
                    &self.options.app_slug,
                    state,
                    &self.options.post_install_url,
                ))
            }
        }
    }

    async fn installation_inner(
        &self,
        state: &str,
        installation_id: Option<u64>,
        setup_action: Option<&str>,
    ) -> Result<String> {
        let user_token = match self.correlations.take(state)? {
            PendingFlow::AwaitingInstallationCallback(token) => token,
            other => {
                tracing::debug!(state = %state, stage = %other.stage(), "State presented at the wrong stage");
                return Err(Error::MissingCorrelation);
            }
        };

        // setup_action=request arrives without an id while an owner approves
        let installation_id = installation_id.ok_or_else(|| {
            tracing::info!(setup_action = ?setup_action, "Post-install redirect without installation id");
            Error::NoInstallation
        })?;

        // The id comes from the browser; only mint for installations the
        // user can actually see.
        let installations = self.github.user_installations(&user_token.token).await?;
        if !installations
            .installations
            .iter()
            .any(|installation| installation.id == installation_id)
        {
            tracing::warn!(installation_id, "Installation not accessible to user");
            return Err(Error::NoInstallation);
        }
        log_transition(
            state,
            FlowStage::AwaitingInstallationCallback,
            FlowStage::InstallationLinked,
        );

        let token = self.broker.get_installation_token(installation_id).await?;
        log_transition(state, FlowStage::InstallationLinked, FlowStage::Completed);
        tracing::info!(installation_id, setup_action = ?setup_action, "Login completed");

        Ok(provider::build_frontend_url(
            &self.options.frontend_url,
            &[
                ("user_token", user_token.token.as_str()),
                ("installation_token", token.token.as_str()),
            ],
        ))
    }
}

fn log_transition(state: &str, from: FlowStage, to: FlowStage) {
    tracing::debug!(state = %state, from = %from, to = %to, "Flow transition");
}

fn log_failure(state: &str, from: FlowStage, error: &Error) {
    tracing::debug!(state = %state, from = %from, "Failed flow state");
    tracing::error!(
        from = %from,
        to = %FlowStage::Failed,
        error = %error,
        "Auth flow failed"
    );
}
