// Shared helpers for integration tests: a fake GitHub and app wiring.
#![allow(dead_code)]

use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, Request, StatusCode},
    response::{IntoResponse, Json, Response},
    routing,
    Form, Router,
};
use commit_viewer::api::{create_router, AppState};
use commit_viewer::config::AppConfig;
use commit_viewer::github::{http_client, GitHubClient};
use commit_viewer::oauth::{AppClaims, AuthFlow};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const PRIVATE_KEY: &str = include_str!("../fixtures/app_private_key.pem");
pub const PUBLIC_KEY: &str = include_str!("../fixtures/app_public_key.pem");

pub const CLIENT_ID: &str = "Iv1.testclient";
pub const CLIENT_SECRET: &str = "test_secret";
pub const APP_ID: &str = "4242";
pub const FRONTEND_URL: &str = "http://localhost:5173";

/// Observable state of the fake GitHub
#[derive(Default)]
pub struct FakeState {
    /// Codes GitHub would accept; each is removed on first exchange
    codes: Mutex<HashSet<String>>,
    installations: Mutex<Vec<u64>>,
    pub exchanges: AtomicUsize,
    pub token_mints: AtomicUsize,
}

pub struct FakeGitHub {
    pub url: String,
    pub state: Arc<FakeState>,
}

impl FakeGitHub {
    /// Start on an ephemeral port with one installation (id 42)
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());
        state.installations.lock().unwrap().push(42);

        let app = Router::new()
            .route("/login/oauth/access_token", routing::post(access_token))
            .route("/user/installations", routing::get(user_installations))
            .route(
                "/app/installations/:id/access_tokens",
                routing::post(installation_token),
            )
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            state,
        }
    }

    /// Simulate the user consenting: GitHub issues a one-time code
    pub fn issue_code(&self, code: &str) {
        self.state.codes.lock().unwrap().insert(code.to_string());
    }

    pub fn set_installations(&self, ids: &[u64]) {
        *self.state.installations.lock().unwrap() = ids.to_vec();
    }

    pub fn exchanges(&self) -> usize {
        self.state.exchanges.load(Ordering::SeqCst)
    }

    pub fn token_mints(&self) -> usize {
        self.state.token_mints.load(Ordering::SeqCst)
    }
}

async fn access_token(
    State(state): State<Arc<FakeState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    state.exchanges.fetch_add(1, Ordering::SeqCst);

    let client_ok = form.get("client_id").map(String::as_str) == Some(CLIENT_ID)
        && form.get("client_secret").map(String::as_str) == Some(CLIENT_SECRET);
    if !client_ok {
        return Json(json!({
            "error": "incorrect_client_credentials",
            "error_description": "The client_id and/or client_secret passed are incorrect."
        }));
    }

    let code = form.get("code").cloned().unwrap_or_default();
    if state.codes.lock().unwrap().remove(&code) {
        Json(json!({
            "access_token": format!("gho_{}", code),
            "token_type": "bearer",
            "scope": "repo,read:user"
        }))
    } else {
        // GitHub answers 200 for bad codes
        Json(json!({
            "error": "bad_verification_code",
            "error_description": "The code passed is incorrect or expired."
        }))
    }
}

async fn user_installations(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("Bearer gho_"))
        .unwrap_or(false);
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Bad credentials" })),
        )
            .into_response();
    }

    let ids = state.installations.lock().unwrap().clone();
    let installations: Vec<_> = ids
        .iter()
        .map(|id| json!({ "id": id, "app_id": 4242, "target_type": "User" }))
        .collect();
    Json(json!({ "total_count": ids.len(), "installations": installations })).into_response()
}

async fn installation_token(
    State(state): State<Arc<FakeState>>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> Response {
    state.token_mints.fetch_add(1, Ordering::SeqCst);

    let jwt = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default();

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_issuer(&[APP_ID]);
    let key = DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).unwrap();

    match decode::<AppClaims>(jwt, &key, &validation) {
        Ok(data) if data.claims.exp - data.claims.iat <= 660 => (
            StatusCode::CREATED,
            Json(json!({
                "token": format!("ghs_{}", id),
                "expires_at": "2030-01-01T00:00:00Z",
                "permissions": { "contents": "read", "metadata": "read" }
            })),
        )
            .into_response(),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "A JSON web token could not be decoded" })),
        )
            .into_response(),
    }
}

/// Configuration pointing every GitHub URL at `github_url`
pub fn test_config(github_url: &str, mode: &str) -> AppConfig {
    let mut vars: HashMap<&str, String> = HashMap::new();
    vars.insert("GITHUB_CLIENT_ID", CLIENT_ID.to_string());
    vars.insert("GITHUB_CLIENT_SECRET", CLIENT_SECRET.to_string());
    vars.insert("GITHUB_APP_ID", APP_ID.to_string());
    vars.insert("GITHUB_PRIVATE_KEY", PRIVATE_KEY.to_string());
    vars.insert("GITHUB_WEB_URL", github_url.to_string());
    vars.insert("GITHUB_API_URL", github_url.to_string());
    vars.insert("FRONTEND_URL", FRONTEND_URL.to_string());
    vars.insert("AUTH_FLOW_MODE", mode.to_string());

    AppConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

/// Full router wired against `github_url`
pub fn create_test_app(github_url: &str, mode: &str) -> Router {
    let config = test_config(github_url, mode);
    let http = http_client(&config.settings.github.user_agent).unwrap();

    let state = AppState {
        flow: Arc::new(AuthFlow::from_config(&config, http.clone())),
        github: GitHubClient::new(http, config.settings.github.api_url.clone()),
        default_branch: config.settings.github.default_branch.clone(),
    };
    create_router(state)
}

pub async fn get(app: &Router, uri: &str) -> Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub fn location(response: &Response) -> String {
    response
        .headers()
        .get("location")
        .expect("redirect without Location header")
        .to_str()
        .unwrap()
        .to_string()
}

/// Value of a query parameter in a redirect URL (no percent-decoding)
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
