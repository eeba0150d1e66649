// Errors shared by every layer
pub mod error;

// Settings and startup configuration
pub mod config;

// Token extraction for proxy requests
pub mod auth;

// GitHub REST client
pub mod github;

// OAuth / GitHub App token acquisition
pub mod oauth;

// HTTP API
pub mod api;

pub use error::{ConfigError, Error, Result};
