//! Preconfigured blueprint for Google sign-in.

use crate::blueprint::{Blueprint, BlueprintConfig};
use crate::error::ConsumerResult;

pub const GOOGLE_BLUEPRINT_NAME: &str = "google";
pub const GOOGLE_AUTHORIZATION_URL: &str = "https://accounts.google.com/o/oauth2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://accounts.google.com/o/oauth2/token";
pub const GOOGLE_API_BASE_URL: &str = "https://www.googleapis.com/";

/// Google endpoints with the given credentials, still open for adjustment
pub fn google_blueprint_config(
    client_id: impl Into<String>,
    client_secret: impl Into<String>,
    scope: Vec<String>,
) -> BlueprintConfig {
    BlueprintConfig::new(
        GOOGLE_BLUEPRINT_NAME,
        client_id,
        client_secret,
        GOOGLE_AUTHORIZATION_URL,
        GOOGLE_TOKEN_URL,
        GOOGLE_API_BASE_URL,
    )
    .with_scope(scope)
}

pub fn make_google_blueprint(
    client_id: impl Into<String>,
    client_secret: impl Into<String>,
    scope: Vec<String>,
) -> ConsumerResult<Blueprint> {
    Blueprint::new(google_blueprint_config(client_id, client_secret, scope))
}
