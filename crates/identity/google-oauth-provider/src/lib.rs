//! Google sign-in for axum applications.
//!
//! [`GoogleOAuthProvider`] registers a Google [`oauth_consumer::Blueprint`]
//! under `/login` on the host and reacts to its signals: a completed
//! authorization fetches the user's profile, a provider-reported error becomes
//! an [`OAuthError`]. Everything about the handshake itself is left to the
//! blueprint.

mod config;
mod error;
mod provider;
mod userinfo;


pub use config::OAuthConfig;
pub use error::{OAuthError, OAuthResult};
pub use provider::{GoogleOAuthProvider, LOGIN_URL_PREFIX, USER_INFO_PATH};
pub use userinfo::GoogleUserInfo;

// Re-export the consumer types hosts need alongside the provider
pub use oauth_consumer::{BlueprintConfig, BlueprintHost, HostApp, OAuthToken};
