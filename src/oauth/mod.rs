//! GitHub OAuth and App token acquisition.
//!
//! Implements the login flow:
//! 1. Browser hits GET /auth/login → redirect to GitHub with a fresh `state`
//! 2. User authorizes on GitHub
//! 3. GitHub redirects to /auth/callback with `code` and `state`
//! 4. Exchange code for a user access token
//! 5. Single-step: mint an installation token for the user's first
//!    installation and redirect to the frontend.
//!    Two-step: park the user token under `state`, send the browser through
//!    the App installation page, and mint the token on /auth/post_install.

mod broker;
mod correlation;
mod exchange;
mod flow;
mod provider;
mod signer;

pub use broker::{InstallationToken, InstallationTokenBroker};
pub use correlation::{run_correlation_cleanup, CorrelationStore};
pub use exchange::{TokenExchangeClient, UserAccessToken};
pub use flow::{AuthFlow, FlowOptions, FlowStage, LoginRedirect, PendingFlow};
pub use provider::{build_auth_url, build_frontend_url, build_install_url};
pub use signer::{sign, AppClaims, AppCredential, SignedAssertion, ASSERTION_TTL_SECONDS, CLOCK_SKEW_SECONDS};
