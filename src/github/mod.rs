use crate::error::{ConfigError, Error, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Largest page GitHub serves in one call.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Build the shared HTTP client (GitHub requires a User-Agent).
pub fn http_client(user_agent: &str) -> std::result::Result<Client, ConfigError> {
    Client::builder()
        .user_agent(user_agent)
        .build()
        .map_err(ConfigError::HttpClient)
}

/// One App installation visible to the user.
#[derive(Debug, Clone, Deserialize)]
pub struct Installation {
    pub id: u64,
}

/// `GET /user/installations` body.
#[derive(Debug, Deserialize)]
pub struct InstallationList {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub installations: Vec<Installation>,
}

/// `GET /installation/repositories` body. Repositories stay raw JSON so they
/// reach the browser unreshaped.
#[derive(Debug, Deserialize)]
pub struct RepositoryList {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub repositories: Vec<Value>,
}

/// HTTP client for the GitHub REST API.
///
/// Stateless apart from the connection pool; the caller's token is passed per
/// call and sent as a Bearer token.
#[derive(Clone)]
pub struct GitHubClient {
    http_client: Client,
    base_url: String,
}

impl GitHubClient {
    pub fn new(http_client: Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
        }
    }

    /// Installations of this App the user token can see.
    pub async fn user_installations(&self, token: &str) -> Result<InstallationList> {
        self.get_json("/user/installations", &[], token, "installations response")
            .await
    }

    /// Repositories granted to an installation token, one page of up to
    /// `MAX_PAGE_SIZE`.
    pub async fn installation_repositories(&self, token: &str) -> Result<RepositoryList> {
        let per_page = MAX_PAGE_SIZE.to_string();
        self.get_json(
            "/installation/repositories",
            &[("per_page", per_page.as_str())],
            token,
            "repositories response",
        )
        .await
    }

    pub async fn branches(&self, token: &str, owner: &str, repo: &str) -> Result<Value> {
        let path = format!("/repos/{}/{}/branches", segment(owner), segment(repo));
        self.get_json(&path, &[], token, "branches response").await
    }

    pub async fn commits(&self, token: &str, owner: &str, repo: &str, branch: &str) -> Result<Value> {
        let path = format!("/repos/{}/{}/commits", segment(owner), segment(repo));
        self.get_json(&path, &[("sha", branch)], token, "commits response")
            .await
    }

    /// Profile of the token's user.
    pub async fn user(&self, token: &str) -> Result<Value> {
        self.get_json("/user", &[], token, "user response").await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        token: &str,
        context: &'static str,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http_client
            .get(&url)
            .query(query)
            .bearer_auth(token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;

        let body = check_response_status(response).await?;
        serde_json::from_str(&body).map_err(|source| Error::Decode { context, source })
    }
}

/// Return the body of a 2xx response; anything else becomes
/// `Error::Upstream` carrying GitHub's status, content type and raw body.
async fn check_response_status(response: Response) -> Result<String> {
    let status = response.status();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().await?;

    if !status.is_success() {
        tracing::debug!(status = status.as_u16(), "GitHub API returned an error");
        return Err(Error::Upstream {
            status: status.as_u16(),
            content_type,
            body,
        });
    }
    Ok(body)
}

fn segment(value: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn client(server: &Server) -> GitHubClient {
        GitHubClient::new(http_client("commit-viewer-test").unwrap(), server.url())
    }

    #[tokio::test]
    async fn test_user_installations() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/user/installations")
            .match_header("authorization", "Bearer gho_user")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"total_count":1,"installations":[{"id":321,"app_id":5,"target_type":"User"}]}"#)
            .create_async()
            .await;

        let list = client(&server).user_installations("gho_user").await.unwrap();
        assert_eq!(list.total_count, 1);
        assert_eq!(list.installations[0].id, 321);
    }

    #[tokio::test]
    async fn test_installation_repositories_requests_full_page() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/installation/repositories")
            .match_query(Matcher::UrlEncoded("per_page".into(), "100".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"total_count":2,"repositories":[{"id":1,"private":false},{"id":2,"private":true}]}"#)
            .create_async()
            .await;

        let list = client(&server)
            .installation_repositories("ghs_inst")
            .await
            .unwrap();
        assert_eq!(list.repositories.len(), 2);
        assert_eq!(list.repositories[1]["private"], true);
    }

    #[tokio::test]
    async fn test_commits_passes_branch_as_sha() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/repos/octo/hello/commits")
            .match_query(Matcher::UrlEncoded("sha".into(), "develop".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"sha":"abc123","commit":{"message":"init"}}]"#)
            .create_async()
            .await;

        let commits = client(&server)
            .commits("tok", "octo", "hello", "develop")
            .await
            .unwrap();
        assert_eq!(commits[0]["sha"], "abc123");
    }

    #[tokio::test]
    async fn test_branches_and_user_pass_through() {
        let mut server = Server::new_async().await;
        let _branches = server
            .mock("GET", "/repos/octo/hello/branches")
            .with_status(200)
            .with_body(r#"[{"name":"main","protected":false}]"#)
            .create_async()
            .await;
        let _user = server
            .mock("GET", "/user")
            .with_status(200)
            .with_body(r#"{"login":"octocat","id":1}"#)
            .create_async()
            .await;

        let gh = client(&server);
        let branches = gh.branches("tok", "octo", "hello").await.unwrap();
        assert_eq!(branches[0]["name"], "main");
        let user = gh.user("tok").await.unwrap();
        assert_eq!(user["login"], "octocat");
    }

    #[tokio::test]
    async fn test_non_success_is_upstream_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/user")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message": "Bad credentials"}"#)
            .create_async()
            .await;

        let err = client(&server).user("expired_token").await.unwrap_err();
        match err {
            Error::Upstream {
                status,
                content_type,
                body,
            } => {
                assert_eq!(status, 401);
                assert_eq!(content_type.as_deref(), Some("application/json"));
                assert_eq!(body, r#"{"message": "Bad credentials"}"#);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
