use axum::http::HeaderMap;

#[cfg(test)]
mod tests;

/// Resolve the GitHub token a proxy request should be made with.
///
/// The `token` query parameter wins (that is what the browser client sends);
/// otherwise an `Authorization: Bearer <token>` header is accepted.
pub fn resolve_token(query_token: Option<&str>, headers: &HeaderMap) -> Result<String, TokenError> {
    match query_token {
        Some(token) if token.trim().is_empty() => Err(TokenError::Empty),
        Some(token) => Ok(token.trim().to_string()),
        None => extract_bearer_token(headers),
    }
}

/// Extract bearer token from HTTP Authorization header
///
/// Expected format: "Authorization: Bearer <token>"
/// Returns the token string if present and valid.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, TokenError> {
    // Get Authorization header
    let auth_header = headers
        .get("authorization")
        .ok_or(TokenError::Missing)?
        .to_str()
        .map_err(|_| TokenError::InvalidFormat)?;

    // Parse "Bearer <token>" format
    parse_bearer_token(auth_header)
}

/// Parse bearer token from Authorization header value
///
/// GitHub's own `token <value>` scheme is accepted as well.
fn parse_bearer_token(header_value: &str) -> Result<String, TokenError> {
    let parts: Vec<&str> = header_value.splitn(2, ' ').collect();

    if parts.len() != 2 {
        return Err(TokenError::InvalidFormat);
    }

    let scheme = parts[0].to_lowercase();
    if scheme != "bearer" && scheme != "token" {
        return Err(TokenError::InvalidFormat);
    }

    let token = parts[1].trim();

    if token.is_empty() {
        return Err(TokenError::Empty);
    }

    Ok(token.to_string())
}

/// Token extraction errors
#[derive(Debug, PartialEq, Clone)]
pub enum TokenError {
    /// Neither a `token` parameter nor an Authorization header
    Missing,
    /// Invalid format (not "Bearer <token>")
    InvalidFormat,
    /// Token is empty string
    Empty,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Missing => write!(f, "GitHub token not provided"),
            TokenError::InvalidFormat => write!(f, "Invalid authorization token format"),
            TokenError::Empty => write!(f, "GitHub token is empty"),
        }
    }
}

impl std::error::Error for TokenError {}
