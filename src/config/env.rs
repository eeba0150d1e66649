use super::{load_settings, FlowMode, Settings};
use crate::error::ConfigError;
use crate::oauth::AppCredential;
use std::fmt;
use std::str::FromStr;

/// OAuth client credentials of the GitHub App
#[derive(Clone)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthClient")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

/// Everything the service needs, built once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub settings: Settings,
    pub oauth: OAuthClient,
    pub app: AppCredential,
}

impl AppConfig {
    /// Build from process environment.
    ///
    /// Required: `GITHUB_CLIENT_ID`, `GITHUB_CLIENT_SECRET`, `GITHUB_APP_ID`,
    /// `GITHUB_PRIVATE_KEY`. `COMMIT_VIEWER_CONFIG` optionally names a TOML
    /// settings file; the remaining variables override individual settings.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut settings = match var("COMMIT_VIEWER_CONFIG") {
            Some(path) => load_settings(&path)?,
            None => Settings::default(),
        };
        apply_overrides(&mut settings, &var)?;

        let client_id = var("GITHUB_CLIENT_ID").ok_or(ConfigError::Missing("GITHUB_CLIENT_ID"))?;
        let client_secret =
            var("GITHUB_CLIENT_SECRET").ok_or(ConfigError::Missing("GITHUB_CLIENT_SECRET"))?;
        let app_id = var("GITHUB_APP_ID").ok_or(ConfigError::Missing("GITHUB_APP_ID"))?;
        let private_key =
            var("GITHUB_PRIVATE_KEY").ok_or(ConfigError::Missing("GITHUB_PRIVATE_KEY"))?;

        // Keys pasted into .env files usually carry literal "\n" sequences
        let private_key = private_key.replace("\\n", "\n");
        let app = AppCredential::from_pem(app_id, &private_key)?;

        Ok(Self {
            settings,
            oauth: OAuthClient {
                client_id,
                client_secret,
            },
            app,
        })
    }
}

fn apply_overrides<F>(settings: &mut Settings, var: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = var("BIND_ADDR") {
        settings.server.bind_addr = v;
    }
    if let Some(v) = var("PUBLIC_URL") {
        settings.server.public_url = v;
    }
    if let Some(v) = var("FRONTEND_URL") {
        settings.flow.frontend_url = v;
    }
    if let Some(v) = var("GITHUB_OAUTH_SCOPE") {
        settings.github.scope = v;
    }
    if let Some(v) = var("GITHUB_APP_SLUG") {
        settings.github.app_slug = v;
    }
    if let Some(v) = var("GITHUB_API_URL") {
        settings.github.api_url = v;
    }
    if let Some(v) = var("GITHUB_WEB_URL") {
        settings.github.web_url = v;
    }
    if let Some(v) = var("GITHUB_DEFAULT_BRANCH") {
        settings.github.default_branch = v;
    }
    if let Some(v) = var("AUTH_FLOW_MODE") {
        settings.flow.mode = FlowMode::from_str(&v).map_err(|reason| ConfigError::Invalid {
            var: "AUTH_FLOW_MODE",
            reason,
        })?;
    }
    if let Some(v) = var("STATE_TTL_SECONDS") {
        settings.flow.state_ttl_seconds = parse_positive("STATE_TTL_SECONDS", &v)?;
    }
    if let Some(v) = var("STATE_MAX_ENTRIES") {
        settings.flow.state_max_entries = parse_positive("STATE_MAX_ENTRIES", &v)?;
    }

    settings.server.public_url = trim_slash(&settings.server.public_url);
    settings.github.web_url = trim_slash(&settings.github.web_url);
    settings.github.api_url = trim_slash(&settings.github.api_url);

    Ok(())
}

fn parse_positive<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
    T::Err: fmt::Display,
{
    let parsed = value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })?;
    if parsed <= T::default() {
        return Err(ConfigError::Invalid {
            var,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(parsed)
}

fn trim_slash(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
