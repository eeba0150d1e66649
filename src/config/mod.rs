pub mod env;
pub use env::AppConfig;

use crate::error::ConfigError;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Non-secret service settings (TOML file, then environment overrides)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub github: GitHubSettings,
    #[serde(default)]
    pub flow: FlowSettings,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Externally reachable base URL of this service (used in redirect URIs)
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_public_url() -> String {
    "http://localhost:8000".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            public_url: default_public_url(),
        }
    }
}

/// GitHub endpoints and App identity
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubSettings {
    #[serde(default = "default_web_url")]
    pub web_url: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_app_slug")]
    pub app_slug: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default = "default_branch")]
    pub default_branch: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_web_url() -> String {
    "https://github.com".to_string()
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_app_slug() -> String {
    "git-commit-viewer".to_string()
}

fn default_scope() -> String {
    "repo read:user".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_user_agent() -> String {
    "commit-viewer/0.1".to_string()
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            web_url: default_web_url(),
            api_url: default_api_url(),
            app_slug: default_app_slug(),
            scope: default_scope(),
            default_branch: default_branch(),
            user_agent: default_user_agent(),
        }
    }
}

/// Which redirect topology the auth flow uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowMode {
    /// Callback exchanges the code and mints an installation token for the
    /// user's first installation in the same request.
    SingleStep,
    /// Callback parks the user token and sends the browser through the App
    /// installation page; the token is minted on `post_install`.
    TwoStep,
}

impl FromStr for FlowMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "single_step" | "single" => Ok(FlowMode::SingleStep),
            "two_step" | "two" => Ok(FlowMode::TwoStep),
            other => Err(format!(
                "unknown flow mode '{}' (expected single_step or two_step)",
                other
            )),
        }
    }
}

impl fmt::Display for FlowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowMode::SingleStep => write!(f, "single_step"),
            FlowMode::TwoStep => write!(f, "two_step"),
        }
    }
}

/// Auth flow behaviour and correlation store limits
#[derive(Debug, Clone, Deserialize)]
pub struct FlowSettings {
    #[serde(default = "default_mode")]
    pub mode: FlowMode,
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
    /// How long an issued `state` stays valid (seconds)
    #[serde(default = "default_state_ttl")]
    pub state_ttl_seconds: i64,
    /// Upper bound on in-flight `state` entries
    #[serde(default = "default_state_max_entries")]
    pub state_max_entries: usize,
    /// How often expired entries are swept (seconds)
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
}

fn default_mode() -> FlowMode {
    FlowMode::TwoStep
}

fn default_frontend_url() -> String {
    "http://localhost:5173".to_string()
}

fn default_state_ttl() -> i64 {
    600
}

fn default_state_max_entries() -> usize {
    10_000
}

fn default_cleanup_interval() -> u64 {
    60
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            frontend_url: default_frontend_url(),
            state_ttl_seconds: default_state_ttl(),
            state_max_entries: default_state_max_entries(),
            cleanup_interval_seconds: default_cleanup_interval(),
        }
    }
}

/// Load settings from a TOML file
pub fn load_settings(path: &str) -> Result<Settings, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_string(),
        source,
    })?;
    let settings: Settings = toml::from_str(&contents)?;
    Ok(settings)
}
