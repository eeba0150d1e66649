//! Redirect endpoints of the login flow.
//!
//! Every failure here ends in a JSON `{error}` body rather than a redirect,
//! so the browser lands on a dead end instead of bouncing in a loop.

use super::{query_params, AppError, AppState};
use crate::error::Error;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// OAuth callback query parameters
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Post-install redirect query parameters
#[derive(Debug, Deserialize)]
pub struct PostInstallQuery {
    state: Option<String>,
    installation_id: Option<u64>,
    setup_action: Option<String>,
}

/// 302 Found to `location`
fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// GET /auth/login
///
/// Redirects the browser to GitHub's authorization page with a fresh `state`.
pub async fn login(State(state): State<Arc<AppState>>) -> Response {
    let redirect = state.flow.begin_login();
    debug!(state = %redirect.state, "Issued OAuth state");
    info!("Redirecting to GitHub authorization");
    found(redirect.url)
}

/// GET /auth/callback?code&state
///
/// Exchanges the code, then either redirects to the App installation page
/// (two-step) or straight to the frontend with a token (single-step).
pub async fn callback(
    State(state): State<Arc<AppState>>,
    query: Result<Query<CallbackQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    debug!("OAuth callback received");
    let query = query_params(query)?;

    if let Some(error) = query.error {
        let description = query
            .error_description
            .unwrap_or_else(|| "Unknown error".to_string());
        warn!(error = %error, description = %description, "GitHub authorization failed");
        return Err(AppError::BadRequest(format!(
            "OAuth authorization failed: {} - {}",
            error, description
        )));
    }

    let csrf_state = query.state.ok_or(AppError::Flow(Error::MissingCorrelation))?;
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing 'code' parameter".to_string()))?;

    let location = state
        .flow
        .complete_callback(&code, &csrf_state)
        .await
        .map_err(AppError::Flow)?;

    Ok(found(location))
}

/// GET /auth/post_install?state&installation_id&setup_action
///
/// Second leg of the two-step flow: mints the installation token and hands
/// both tokens to the frontend.
pub async fn post_install(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PostInstallQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let query = query_params(query)?;
    debug!(
        installation_id = ?query.installation_id,
        setup_action = ?query.setup_action,
        "Post-install redirect received"
    );

    let csrf_state = query.state.ok_or(AppError::Flow(Error::MissingCorrelation))?;

    let location = state
        .flow
        .complete_installation(
            &csrf_state,
            query.installation_id,
            query.setup_action.as_deref(),
        )
        .await
        .map_err(AppError::Flow)?;

    Ok(found(location))
}
