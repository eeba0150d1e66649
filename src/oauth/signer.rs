//! GitHub App JWT signing.
//!
//! The App authenticates as itself (not as any user) with a short-lived RS256
//! JWT whose issuer is the App ID.

use crate::error::ConfigError;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Backdating applied to `iat` to tolerate clock skew with GitHub.
pub const CLOCK_SKEW_SECONDS: i64 = 60;

/// Lifetime of a signed assertion. GitHub rejects anything above ten minutes.
pub const ASSERTION_TTL_SECONDS: i64 = 600;

/// GitHub App identity: App ID plus the parsed RSA signing key.
#[derive(Clone)]
pub struct AppCredential {
    app_id: String,
    key: Arc<EncodingKey>,
}

impl AppCredential {
    /// Parse a PEM private key (PKCS#1 or PKCS#8).
    pub fn from_pem(app_id: impl Into<String>, pem: &str) -> Result<Self, ConfigError> {
        if pem.trim().is_empty() {
            return Err(ConfigError::PrivateKey("key is empty".to_string()));
        }
        let key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| ConfigError::PrivateKey(e.to_string()))?;
        Ok(Self {
            app_id: app_id.into(),
            key: Arc::new(key),
        })
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }
}

impl fmt::Debug for AppCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppCredential")
            .field("app_id", &self.app_id)
            .field("key", &"***")
            .finish()
    }
}

/// JWT claims for GitHub App authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppClaims {
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// Issuer (App ID)
    pub iss: String,
}

/// Encoded JWT together with the claims it carries.
#[derive(Clone)]
pub struct SignedAssertion {
    pub token: String,
    pub claims: AppClaims,
}

impl fmt::Debug for SignedAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedAssertion")
            .field("claims", &self.claims)
            .finish_non_exhaustive()
    }
}

/// Sign a fresh App JWT valid from `now - 60s` to `now + 600s`.
pub fn sign(credential: &AppCredential, now: DateTime<Utc>) -> Result<SignedAssertion, ConfigError> {
    let claims = AppClaims {
        iat: (now - Duration::seconds(CLOCK_SKEW_SECONDS)).timestamp(),
        exp: (now + Duration::seconds(ASSERTION_TTL_SECONDS)).timestamp(),
        iss: credential.app_id.clone(),
    };

    let token = encode(&Header::new(Algorithm::RS256), &claims, &credential.key)
        .map_err(|e| ConfigError::Signing(e.to_string()))?;

    Ok(SignedAssertion { token, claims })
}
