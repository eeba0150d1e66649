//! GitHub URLs the browser is redirected to.

/// Build the OAuth authorization URL (`{web_url}/login/oauth/authorize`).
pub fn build_auth_url(
    web_url: &str,
    client_id: &str,
    redirect_uri: &str,
    scope: &str,
    state: &str,
) -> String {
    format!(
        "{}/login/oauth/authorize?client_id={}&redirect_uri={}&scope={}&state={}&response_type=code",
        web_url,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(scope),
        urlencoding::encode(state)
    )
}

/// Build the App installation URL. GitHub hands `state` back on the
/// post-install redirect.
pub fn build_install_url(web_url: &str, app_slug: &str, state: &str, redirect_url: &str) -> String {
    format!(
        "{}/apps/{}/installations/new?state={}&redirect_url={}",
        web_url,
        urlencoding::encode(app_slug),
        urlencoding::encode(state),
        urlencoding::encode(redirect_url)
    )
}

/// Append query parameters to the frontend URL.
pub fn build_frontend_url(frontend_url: &str, params: &[(&str, &str)]) -> String {
    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    if query.is_empty() {
        return frontend_url.to_string();
    }
    let separator = if frontend_url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", frontend_url, separator, query)
}
