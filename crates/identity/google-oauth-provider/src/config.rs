//! Credentials for the Google provider.

/// Client credentials and requested scopes. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthConfig {
    client_id: String,
    client_secret: String,
    scope: Vec<String>,
}

impl OAuthConfig {
    /// No validation is applied; empty values are accepted as-is.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        scope: Vec<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// An owned copy of the requested scopes
    pub fn scope(&self) -> Vec<String> {
        self.scope.clone()
    }
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("scope", &self.scope)
            .finish()
    }
}
