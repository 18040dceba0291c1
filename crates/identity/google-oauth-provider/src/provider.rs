//! Google sign-in wired into a host application.

use crate::config::OAuthConfig;
use crate::error::{OAuthError, OAuthResult};
use crate::userinfo::GoogleUserInfo;
use oauth_consumer::{
    AuthorizedEvent, Blueprint, BlueprintConfig, BlueprintHost, ErrorEvent, HandlerError,
    OAuthToken, google_blueprint_config,
};
use tracing::{debug, info, warn};

/// Prefix the Google blueprint's routes are mounted under
pub const LOGIN_URL_PREFIX: &str = "/login";

/// User-info path, resolved against the blueprint's API base URL
pub const USER_INFO_PATH: &str = "/oauth/v1/userinfo";

pub struct GoogleOAuthProvider {
    blueprint: Blueprint,
}

impl GoogleOAuthProvider {
    /// Build the Google blueprint from `config` and register it on `host` under
    /// [`LOGIN_URL_PREFIX`].
    pub fn new<H: BlueprintHost + ?Sized>(host: &mut H, config: &OAuthConfig) -> OAuthResult<Self> {
        Self::with_config(host, config, |blueprint_config| blueprint_config)
    }

    /// Like [`GoogleOAuthProvider::new`], letting `customize` adjust the Google
    /// blueprint configuration (redirect URI, endpoints, ...) before it is built.
    pub fn with_config<H, F>(host: &mut H, config: &OAuthConfig, customize: F) -> OAuthResult<Self>
    where
        H: BlueprintHost + ?Sized,
        F: FnOnce(BlueprintConfig) -> BlueprintConfig,
    {
        let blueprint_config = customize(google_blueprint_config(
            config.client_id(),
            config.client_secret(),
            config.scope(),
        ));
        let blueprint = Blueprint::new(blueprint_config)?;
        Ok(Self::with_blueprint(host, blueprint))
    }

    /// Same as [`GoogleOAuthProvider::new`] for an already built blueprint
    pub fn with_blueprint<H: BlueprintHost + ?Sized>(host: &mut H, blueprint: Blueprint) -> Self {
        Self::connect_handlers(&blueprint);

        host.register_blueprint(&blueprint, LOGIN_URL_PREFIX);
        info!(
            "Google sign-in available under {}{}",
            LOGIN_URL_PREFIX,
            blueprint.login_path()
        );

        Self { blueprint }
    }

    fn connect_handlers(blueprint: &Blueprint) {
        blueprint.on_authorized(|blueprint, event: AuthorizedEvent| async move {
            let user_info = Self::logged_in(&blueprint, event.token.as_ref()).await?;
            debug!(
                "Fetched {} profile for subject {}",
                blueprint.name(),
                user_info.sub.as_deref().unwrap_or("<unknown>")
            );
            Ok::<(), HandlerError>(())
        });

        blueprint.on_error(|blueprint, event: ErrorEvent| async move {
            Self::google_error(
                &blueprint,
                &event.error,
                event.error_description.as_deref(),
                event.error_uri.as_deref(),
            )?;
            Ok::<(), HandlerError>(())
        });
    }

    pub fn blueprint(&self) -> &Blueprint {
        &self.blueprint
    }

    /// Completes a sign-in: requires a token, then fetches the user's profile
    /// through the blueprint's session.
    pub async fn logged_in(
        blueprint: &Blueprint,
        token: Option<&OAuthToken>,
    ) -> OAuthResult<GoogleUserInfo> {
        let Some(token) = token else {
            warn!("{} authorization completed without a token", blueprint.name());
            return Err(OAuthError::LoginFailed {
                blueprint: blueprint.name().to_string(),
            });
        };

        let response = blueprint
            .session(token)
            .get(USER_INFO_PATH)?
            .send()
            .await
            .map_err(|source| OAuthError::UserInfoRequest {
                blueprint: blueprint.name().to_string(),
                source,
            })?;

        if !response.status().is_success() {
            warn!(
                "User info request to {} returned {}",
                blueprint.name(),
                response.status()
            );
            return Err(OAuthError::UserInfoFailed {
                blueprint: blueprint.name().to_string(),
                status: response.status().as_u16(),
            });
        }

        // Only a body that is not JSON at all is rejected
        let document: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| OAuthError::InvalidUserInfo {
                    blueprint: blueprint.name().to_string(),
                    reason: e.to_string(),
                })?;
        let user_info = GoogleUserInfo::from(document);

        info!("Signed in with {}", blueprint.name());
        Ok(user_info)
    }

    /// Reacts to an authorization error reported by Google. Always fails.
    pub fn google_error(
        blueprint: &Blueprint,
        error: &str,
        error_description: Option<&str>,
        error_uri: Option<&str>,
    ) -> OAuthResult<()> {
        Err(OAuthError::ProviderError {
            blueprint: blueprint.name().to_string(),
            error: error.to_string(),
            description: error_description.map(str::to_string),
            uri: error_uri.map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CLIENT_ID: &str = "669264709149-example.apps.googleusercontent.com";
    const CLIENT_SECRET: &str = "test-client-secret";

    /// Records registrations instead of mounting routes
    #[derive(Default)]
    struct RecordingHost {
        registrations: Vec<(String, String)>,
    }

    impl BlueprintHost for RecordingHost {
        fn register_blueprint(&mut self, blueprint: &Blueprint, url_prefix: &str) {
            self.registrations
                .push((blueprint.name().to_string(), url_prefix.to_string()));
        }
    }

    fn google_config() -> OAuthConfig {
        OAuthConfig::new(
            CLIENT_ID,
            CLIENT_SECRET,
            vec!["profile".to_string(), "email".to_string()],
        )
    }

    fn blueprint_against(mock_server: &MockServer) -> Blueprint {
        Blueprint::new(
            google_blueprint_config(CLIENT_ID, CLIENT_SECRET, vec!["profile".to_string()])
                .with_base_url(mock_server.uri()),
        )
        .unwrap()
    }

    #[test]
    fn test_registers_exactly_one_prefix() {
        let mut host = RecordingHost::default();
        let provider = GoogleOAuthProvider::new(&mut host, &google_config()).unwrap();

        assert_eq!(
            host.registrations,
            vec![("google".to_string(), "/login".to_string())]
        );
        assert_eq!(provider.blueprint().scope(), ["profile", "email"]);
    }

    #[test]
    fn test_connects_both_handlers() {
        let mut host = RecordingHost::default();
        let provider = GoogleOAuthProvider::new(&mut host, &google_config()).unwrap();

        let signals = provider.blueprint().signals();
        assert_eq!(signals.authorized.receiver_count(), 1);
        assert_eq!(signals.error.receiver_count(), 1);
    }

    #[tokio::test]
    async fn test_with_config_applies_customization() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(USER_INFO_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"sub": "42"})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut host = RecordingHost::default();
        let provider = GoogleOAuthProvider::with_config(&mut host, &google_config(), |config| {
            config.with_base_url(mock_server.uri())
        })
        .unwrap();

        assert_eq!(
            host.registrations,
            vec![("google".to_string(), "/login".to_string())]
        );
        assert_eq!(provider.blueprint().signals().authorized.receiver_count(), 1);

        let token = OAuthToken::bearer("good_token");
        let user_info = GoogleOAuthProvider::logged_in(provider.blueprint(), Some(&token))
            .await
            .unwrap();
        assert_eq!(user_info.sub.as_deref(), Some("42"));
    }

    #[test]
    fn test_with_config_reports_invalid_customization() {
        let mut host = RecordingHost::default();
        let result = GoogleOAuthProvider::with_config(&mut host, &google_config(), |config| {
            config.with_token_url("not a url")
        });

        assert!(matches!(result, Err(OAuthError::Consumer(_))));
        assert!(host.registrations.is_empty());
    }

    #[test]
    fn test_empty_credentials_still_register() {
        let mut host = RecordingHost::default();
        let config = OAuthConfig::new("", "", Vec::new());

        assert!(GoogleOAuthProvider::new(&mut host, &config).is_ok());
        assert_eq!(host.registrations.len(), 1);
    }

    #[tokio::test]
    async fn test_logged_in_without_token_fails() {
        let mock_server = MockServer::start().await;
        let blueprint = blueprint_against(&mock_server);

        let result = GoogleOAuthProvider::logged_in(&blueprint, None).await;

        let error = result.unwrap_err();
        assert!(matches!(error, OAuthError::LoginFailed { .. }));
        assert_eq!(error.to_string(), "Failed to login with google.");
        assert!(mock_server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_logged_in_with_rejected_user_info_fails() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(USER_INFO_PATH))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&mock_server)
            .await;
        let blueprint = blueprint_against(&mock_server);

        let token = OAuthToken::bearer("expired_token");
        let result = GoogleOAuthProvider::logged_in(&blueprint, Some(&token)).await;

        match result {
            Err(OAuthError::UserInfoFailed { blueprint, status }) => {
                assert_eq!(blueprint, "google");
                assert_eq!(status, 401);
            }
            other => panic!("Expected UserInfoFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_logged_in_returns_profile() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(USER_INFO_PATH))
            .and(header("Authorization", "Bearer good_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "12345",
                "email": "test@example.com",
                "verified_email": true,
                "name": "Test User"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;
        let blueprint = blueprint_against(&mock_server);

        let token = OAuthToken::bearer("good_token");
        let user_info = GoogleOAuthProvider::logged_in(&blueprint, Some(&token))
            .await
            .unwrap();

        assert_eq!(user_info.sub.as_deref(), Some("12345"));
        assert_eq!(user_info.email.as_deref(), Some("test@example.com"));
    }

    #[tokio::test]
    async fn test_logged_in_accepts_profile_without_identifier() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(USER_INFO_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"email": "a@b.c"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;
        let blueprint = blueprint_against(&mock_server);

        let token = OAuthToken::bearer("good_token");
        let user_info = GoogleOAuthProvider::logged_in(&blueprint, Some(&token))
            .await
            .unwrap();

        assert_eq!(user_info.sub, None);
        assert_eq!(user_info.email.as_deref(), Some("a@b.c"));
    }

    #[tokio::test]
    async fn test_logged_in_with_malformed_user_info_fails() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(USER_INFO_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;
        let blueprint = blueprint_against(&mock_server);

        let token = OAuthToken::bearer("good_token");
        let result = GoogleOAuthProvider::logged_in(&blueprint, Some(&token)).await;

        assert!(matches!(result, Err(OAuthError::InvalidUserInfo { .. })));
    }

    #[test]
    fn test_google_error_always_fails() {
        let mut host = RecordingHost::default();
        let provider = GoogleOAuthProvider::new(&mut host, &google_config()).unwrap();

        let error = GoogleOAuthProvider::google_error(
            provider.blueprint(),
            "access_denied",
            Some("The user denied access"),
            Some("https://developers.google.com/identity/errors"),
        )
        .unwrap_err();

        let message = error.to_string();
        assert!(message.contains("google"));
        assert!(message.contains("error=access_denied"));
        assert!(message.contains("description=The user denied access"));
        assert!(message.contains("uri=https://developers.google.com/identity/errors"));
    }
}
