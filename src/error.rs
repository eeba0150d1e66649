//! Error types for the auth flow and the GitHub proxy.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures raised while acquiring tokens or calling GitHub.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed credentials/settings.
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// The token endpoint answered without an access token.
    ///
    /// Expired, invalid, already-used codes and bad client credentials all
    /// land here; GitHub does not reliably tell them apart.
    #[error("Could not fetch user access token{}", describe_exchange_error(.error, .description))]
    AuthExchange {
        error: Option<String>,
        description: Option<String>,
    },

    /// GitHub refused the App JWT when minting an installation token.
    #[error("GitHub error {status}: {body}")]
    UpstreamAuth { status: u16, body: String },

    /// Non-2xx from a GitHub REST call.
    #[error("GitHub API error: {status} {body}")]
    Upstream {
        status: u16,
        content_type: Option<String>,
        body: String,
    },

    /// `state` was never issued, already used, or expired.
    #[error("Unknown or expired OAuth state")]
    MissingCorrelation,

    /// The user has no installation of the App.
    #[error("No installations found for user")]
    NoInstallation,

    /// Transport-level failure talking to GitHub.
    #[error("Failed to reach GitHub: {0}")]
    Http(#[from] reqwest::Error),

    /// GitHub answered 2xx with a body we could not read.
    #[error("Failed to parse {context}: {source}")]
    Decode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

fn describe_exchange_error(error: &Option<String>, description: &Option<String>) -> String {
    match (error, description) {
        (Some(e), Some(d)) => format!(" ({}: {})", e, d),
        (Some(e), None) => format!(" ({})", e),
        (None, Some(d)) => format!(" ({})", d),
        (None, None) => String::new(),
    }
}

/// Startup configuration errors. Fatal: the binary refuses to start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required but not set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("GitHub App private key is malformed: {0}")]
    PrivateKey(String),

    #[error("Failed to sign GitHub App JWT: {0}")]
    Signing(String),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}
