//! Google provider errors.

use oauth_consumer::ConsumerError;
use thiserror::Error;

pub type OAuthResult<T> = Result<T, OAuthError>;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("Failed to login with {blueprint}.")]
    LoginFailed { blueprint: String },

    #[error("Failed to fetch user info from {blueprint}.")]
    UserInfoFailed { blueprint: String, status: u16 },

    #[error("Failed to fetch user info from {blueprint}: {source}")]
    UserInfoRequest {
        blueprint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid user info from {blueprint}: {reason}")]
    InvalidUserInfo { blueprint: String, reason: String },

    #[error(
        "OAuth error from {blueprint}; error={error}; description={}; uri={}",
        or_unset(.description),
        or_unset(.uri)
    )]
    ProviderError {
        blueprint: String,
        error: String,
        description: Option<String>,
        uri: Option<String>,
    },

    #[error("OAuth consumer error: {0}")]
    Consumer(#[from] ConsumerError),
}

fn or_unset(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("<unset>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_blueprint() {
        let login = OAuthError::LoginFailed {
            blueprint: "google".to_string(),
        };
        assert_eq!(login.to_string(), "Failed to login with google.");

        let user_info = OAuthError::UserInfoFailed {
            blueprint: "google".to_string(),
            status: 401,
        };
        assert_eq!(user_info.to_string(), "Failed to fetch user info from google.");
    }

    #[test]
    fn test_provider_error_renders_missing_fields() {
        let error = OAuthError::ProviderError {
            blueprint: "google".to_string(),
            error: "access_denied".to_string(),
            description: None,
            uri: None,
        };
        assert_eq!(
            error.to_string(),
            "OAuth error from google; error=access_denied; description=<unset>; uri=<unset>"
        );
    }
}
