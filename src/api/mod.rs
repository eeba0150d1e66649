// HTTP API: auth flow redirects and GitHub proxy endpoints

pub mod auth_flow;
pub mod proxy;

pub use proxy::{paginate, RepoPage};

use crate::error::{ConfigError, Error};
use crate::github::GitHubClient;
use crate::oauth::AuthFlow;
use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Query},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Application error types for HTTP endpoints
pub enum AppError {
    BadRequest(String),
    Unauthorized(String),
    /// Failure inside the login flow: always a JSON dead end, never a redirect
    Flow(Error),
    /// Failure in a proxy call: GitHub's status and body go back untouched
    Proxy(Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Flow(err) => (flow_status(&err), err.to_string()),
            AppError::Proxy(Error::Upstream {
                status,
                content_type,
                body,
            }) => {
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                let mut response = (status, Body::from(body)).into_response();
                if let Some(value) = content_type.and_then(|ct| HeaderValue::from_str(&ct).ok()) {
                    response.headers_mut().insert(header::CONTENT_TYPE, value);
                }
                return response;
            }
            AppError::Proxy(err) => (StatusCode::BAD_GATEWAY, err.to_string()),
        };

        let body = Json(ErrorResponse {
            error: error_message,
        });

        (status, body).into_response()
    }
}

/// Unwrap query parameters, turning a deserialization failure into a JSON
/// 400 instead of axum's plain-text rejection.
pub(crate) fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

fn flow_status(err: &Error) -> StatusCode {
    match err {
        Error::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        Error::AuthExchange { .. } | Error::MissingCorrelation => StatusCode::BAD_REQUEST,
        Error::NoInstallation => StatusCode::NOT_FOUND,
        Error::UpstreamAuth { .. }
        | Error::Upstream { .. }
        | Error::Http(_)
        | Error::Decode { .. } => StatusCode::BAD_GATEWAY,
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub flow: Arc<AuthFlow>,
    pub github: GitHubClient,
    pub default_branch: String,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/login", get(auth_flow::login))
        .route("/auth/callback", get(auth_flow::callback))
        .route("/auth/post_install", get(auth_flow::post_install))
        .route("/auth/repos", get(proxy::repos))
        .route("/auth/branches", get(proxy::branches))
        .route("/auth/commits", get(proxy::commits))
        .route("/auth/user", get(proxy::user))
        .with_state(Arc::new(state))
}

/// CORS layer admitting the browser client's origin
pub fn cors_layer(frontend_url: &str) -> Result<CorsLayer, ConfigError> {
    let origin = frontend_origin(frontend_url);
    let origin = HeaderValue::from_str(&origin).map_err(|e| ConfigError::Invalid {
        var: "FRONTEND_URL",
        reason: e.to_string(),
    })?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true))
}

/// `scheme://host[:port]` part of a URL
fn frontend_origin(url: &str) -> String {
    let (scheme, rest) = url.split_once("://").unwrap_or(("http", url));
    let host = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    format!("{}://{}", scheme, host)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
