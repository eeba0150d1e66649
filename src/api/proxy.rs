//! Read-through GitHub endpoints for the browser client.
//!
//! Each handler makes exactly one upstream GET. Only the repository listing is
//! reshaped; everything else is returned as GitHub sent it.

use super::{query_params, AppError, AppState};
use crate::auth::resolve_token;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::HeaderMap,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

fn default_page() -> usize {
    1
}

fn default_per_page() -> usize {
    6
}

/// GET /auth/repos query parameters
#[derive(Debug, Deserialize)]
pub struct ReposQuery {
    token: Option<String>,
    #[serde(default = "default_page")]
    page: usize,
    #[serde(default = "default_per_page")]
    per_page: usize,
}

/// GET /auth/branches query parameters
#[derive(Debug, Deserialize)]
pub struct BranchesQuery {
    token: Option<String>,
    owner: String,
    repo: String,
}

/// GET /auth/commits query parameters
#[derive(Debug, Deserialize)]
pub struct CommitsQuery {
    token: Option<String>,
    owner: String,
    repo: String,
    branch: Option<String>,
}

/// GET /auth/user query parameters
#[derive(Debug, Deserialize)]
pub struct UserQuery {
    token: Option<String>,
}

/// One page of repositories plus counts over the whole fetched set
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RepoPage {
    pub repos: Vec<Value>,
    pub total: usize,
    pub public: usize,
    pub private: usize,
    pub current_page: usize,
    pub total_pages: usize,
}

/// Page through an already-fetched repository list.
///
/// Pagination is local: the input is a single upstream page, so the counts
/// are only complete while the installation has at most 100 repositories.
/// `page` and `per_page` below 1 are treated as 1.
pub fn paginate(repos: Vec<Value>, page: usize, per_page: usize) -> RepoPage {
    let page = page.max(1);
    let per_page = per_page.max(1);
    let total = repos.len();
    let public = repos.iter().filter(|repo| !is_private(repo)).count();
    let total_pages = total.div_ceil(per_page);

    let start = (page - 1).saturating_mul(per_page).min(total);
    let end = start.saturating_add(per_page).min(total);
    let repos = repos.into_iter().skip(start).take(end - start).collect();

    RepoPage {
        repos,
        total,
        public,
        private: total - public,
        current_page: page,
        total_pages,
    }
}

fn is_private(repo: &Value) -> bool {
    repo.get("private").and_then(Value::as_bool).unwrap_or(false)
}

fn token(query_token: Option<&str>, headers: &HeaderMap) -> Result<String, AppError> {
    resolve_token(query_token, headers).map_err(|e| AppError::Unauthorized(e.to_string()))
}

/// GET /auth/repos?token&page&per_page
pub async fn repos(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ReposQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Result<Json<RepoPage>, AppError> {
    let query = query_params(query)?;
    if query.page < 1 || query.per_page < 1 {
        return Err(AppError::BadRequest(
            "'page' and 'per_page' must be at least 1".to_string(),
        ));
    }
    let token = token(query.token.as_deref(), &headers)?;

    let list = state
        .github
        .installation_repositories(&token)
        .await
        .map_err(AppError::Proxy)?;

    debug!(
        fetched = list.repositories.len(),
        total_count = list.total_count,
        page = query.page,
        per_page = query.per_page,
        "Paginating repositories"
    );

    Ok(Json(paginate(list.repositories, query.page, query.per_page)))
}

/// GET /auth/branches?token&owner&repo
pub async fn branches(
    State(state): State<Arc<AppState>>,
    query: Result<Query<BranchesQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let query = query_params(query)?;
    let token = token(query.token.as_deref(), &headers)?;
    let branches = state
        .github
        .branches(&token, &query.owner, &query.repo)
        .await
        .map_err(AppError::Proxy)?;
    Ok(Json(branches))
}

/// GET /auth/commits?token&owner&repo&branch
///
/// `branch` defaults to the configured default branch.
pub async fn commits(
    State(state): State<Arc<AppState>>,
    query: Result<Query<CommitsQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let query = query_params(query)?;
    let token = token(query.token.as_deref(), &headers)?;
    let branch = query
        .branch
        .as_deref()
        .filter(|b| !b.is_empty())
        .unwrap_or(state.default_branch.as_str());

    let commits = state
        .github
        .commits(&token, &query.owner, &query.repo, branch)
        .await
        .map_err(AppError::Proxy)?;
    Ok(Json(commits))
}

/// GET /auth/user?token
pub async fn user(
    State(state): State<Arc<AppState>>,
    query: Result<Query<UserQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let query = query_params(query)?;
    let token = token(query.token.as_deref(), &headers)?;
    let user = state.github.user(&token).await.map_err(AppError::Proxy)?;
    Ok(Json(user))
}
