//! Access tokens handed to signal receivers and provider sessions.

use chrono::{DateTime, Duration, Utc};
use oauth2::TokenResponse;
use oauth2::basic::{BasicTokenResponse, BasicTokenType};
use serde::{Deserialize, Serialize};

/// Token obtained from the provider's token endpoint
#[derive(Clone, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub refresh_token: Option<String>,
    pub scope: Vec<String>,
}

impl OAuthToken {
    /// A bare bearer token with no expiry or refresh information
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: "bearer".to_string(),
            expires_at: None,
            refresh_token: None,
            scope: Vec::new(),
        }
    }

    pub fn from_response(response: &BasicTokenResponse) -> Self {
        let expires_at = response
            .expires_in()
            .and_then(|ttl| Duration::from_std(ttl).ok())
            .map(|ttl| Utc::now() + ttl);

        Self {
            access_token: response.access_token().secret().clone(),
            token_type: match response.token_type() {
                BasicTokenType::Bearer => "bearer".to_string(),
                BasicTokenType::Mac => "mac".to_string(),
                BasicTokenType::Extension(other) => other.clone(),
            },
            expires_at,
            refresh_token: response.refresh_token().map(|t| t.secret().clone()),
            scope: response
                .scopes()
                .map(|scopes| scopes.iter().map(|s| s.as_str().to_string()).collect())
                .unwrap_or_default(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() > at)
    }
}

impl std::fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthToken")
            .field("access_token", &"[redacted]")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[redacted]"))
            .field("scope", &self.scope)
            .finish()
    }
}
