//! Blueprints: a provider's login routes, credentials and signals, ready to be
//! registered on a host application.

use crate::error::{ConsumerError, ConsumerResult};
use crate::session::OAuthSession;
use crate::signals::{AuthorizedEvent, ErrorEvent, HandlerError, Signals};
use crate::state::{
    AuthorizationStateStore, DEFAULT_MAX_PENDING, InMemoryStateStore, PendingAuthorization,
};
use crate::token::OAuthToken;
use axum::extract::{OriginalUri, Query, State};
use axum::http::{HeaderMap, header};
use axum::response::Redirect;
use axum::routing::get;
use axum::Router;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope, TokenUrl,
};
use reqwest::Client;
use serde::Deserialize;
use std::borrow::Cow;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

type ConsumerClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Everything needed to build a [`Blueprint`]
#[derive(Clone)]
pub struct BlueprintConfig {
    pub name: String,
    pub client_id: String,
    pub client_secret: String,
    pub authorization_url: String,
    pub token_url: String,
    /// Base URL relative session paths are resolved against
    pub base_url: String,
    pub scope: Vec<String>,
    /// Fixed redirect URI. When unset it is derived from the login request.
    pub redirect_uri: Option<String>,
    /// Where the browser goes once the callback has been handled
    pub redirect_to: String,
    pub authorization_params: HashMap<String, String>,
    pub use_pkce: bool,
    pub state_ttl_seconds: u64,
    /// Cap on pending authorizations held by the default in-memory store
    pub max_pending_authorizations: usize,
    pub http_timeout_seconds: u64,
}

impl BlueprintConfig {
    pub fn new(
        name: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        authorization_url: impl Into<String>,
        token_url: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authorization_url: authorization_url.into(),
            token_url: token_url.into(),
            base_url: base_url.into(),
            scope: Vec::new(),
            redirect_uri: None,
            redirect_to: "/".to_string(),
            authorization_params: HashMap::new(),
            use_pkce: true,
            state_ttl_seconds: 600, // 10 minutes
            max_pending_authorizations: DEFAULT_MAX_PENDING,
            http_timeout_seconds: 30,
        }
    }

    pub fn with_scope(mut self, scope: Vec<String>) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_authorization_url(mut self, url: impl Into<String>) -> Self {
        self.authorization_url = url.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    pub fn with_redirect_to(mut self, path: impl Into<String>) -> Self {
        self.redirect_to = path.into();
        self
    }

    pub fn with_authorization_param(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.authorization_params.insert(key.into(), value.into());
        self
    }

    pub fn with_pkce(mut self, enabled: bool) -> Self {
        self.use_pkce = enabled;
        self
    }

    pub fn with_state_ttl(mut self, seconds: u64) -> Self {
        self.state_ttl_seconds = seconds;
        self
    }

    pub fn with_max_pending_authorizations(mut self, max: usize) -> Self {
        self.max_pending_authorizations = max;
        self
    }

    pub fn with_http_timeout(mut self, seconds: u64) -> Self {
        self.http_timeout_seconds = seconds;
        self
    }
}

struct BlueprintInner {
    config: BlueprintConfig,
    oauth_client: ConsumerClient,
    http_client: Client,
    base_url: Url,
    state_store: Arc<dyn AuthorizationStateStore>,
    signals: Signals,
}

/// A provider's login routes plus the signals its callback emits.
///
/// Cloning is cheap; all clones share configuration, state store and signal
/// receivers.
#[derive(Clone)]
pub struct Blueprint {
    inner: Arc<BlueprintInner>,
}

impl Blueprint {
    pub fn new(config: BlueprintConfig) -> ConsumerResult<Self> {
        let store = InMemoryStateStore::with_max_pending(config.max_pending_authorizations);
        Self::with_state_store(config, Arc::new(store))
    }

    pub fn with_state_store(
        config: BlueprintConfig,
        state_store: Arc<dyn AuthorizationStateStore>,
    ) -> ConsumerResult<Self> {
        if config.name.is_empty() || config.name.contains('/') {
            return Err(ConsumerError::ConfigError(format!(
                "Blueprint name '{}' must be a single non-empty path segment",
                config.name
            )));
        }

        let oauth_client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(AuthUrl::new(config.authorization_url.clone())?)
            .set_token_uri(TokenUrl::new(config.token_url.clone())?);

        // The token endpoint must not be followed through redirects
        let http_client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(config.http_timeout_seconds))
            .build()?;

        let base_url = Url::parse(&config.base_url)?;

        Ok(Self {
            inner: Arc::new(BlueprintInner {
                config,
                oauth_client,
                http_client,
                base_url,
                state_store,
                signals: Signals::default(),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn scope(&self) -> &[String] {
        &self.inner.config.scope
    }

    pub fn signals(&self) -> &Signals {
        &self.inner.signals
    }

    /// Connect a receiver to the authorized signal
    pub fn on_authorized<F, Fut>(&self, receiver: F)
    where
        F: Fn(Blueprint, AuthorizedEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.inner.signals.authorized.connect(receiver);
    }

    /// Connect a receiver to the error signal
    pub fn on_error<F, Fut>(&self, receiver: F)
    where
        F: Fn(Blueprint, ErrorEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.inner.signals.error.connect(receiver);
    }

    /// Provider session authenticated with `token`
    pub fn session(&self, token: &OAuthToken) -> OAuthSession {
        OAuthSession::new(
            self.inner.http_client.clone(),
            self.inner.base_url.clone(),
            token.clone(),
        )
    }

    pub fn login_path(&self) -> String {
        format!("/{}", self.name())
    }

    pub fn authorized_path(&self) -> String {
        format!("/{}/authorized", self.name())
    }

    /// Routes relative to the prefix the host registers the blueprint under
    pub fn router(&self) -> Router {
        Router::new()
            .route(&self.login_path(), get(login))
            .route(&self.authorized_path(), get(authorized))
            .with_state(self.clone())
    }

    /// The configured redirect URI, or one derived from the login request's
    /// `Host` and `X-Forwarded-Proto` headers. A derived URI that does not
    /// parse is the client's fault.
    fn redirect_uri_for(&self, headers: &HeaderMap, login_path: &str) -> ConsumerResult<String> {
        if let Some(uri) = &self.inner.config.redirect_uri {
            return Ok(uri.clone());
        }

        let host = headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("localhost");
        let scheme = headers
            .get("x-forwarded-proto")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("http");
        if scheme != "http" && scheme != "https" {
            return Err(ConsumerError::InvalidRedirectUri(format!(
                "unsupported scheme '{}'",
                scheme
            )));
        }

        let uri = format!(
            "{}://{}{}/authorized",
            scheme,
            host,
            login_path.trim_end_matches('/')
        );
        match Url::parse(&uri) {
            Ok(url) if url.host_str().is_some_and(|h| !h.is_empty()) => Ok(uri),
            Ok(_) => Err(ConsumerError::InvalidRedirectUri(format!(
                "no host in '{}'",
                uri
            ))),
            Err(e) => Err(ConsumerError::InvalidRedirectUri(format!("{}: {}", uri, e))),
        }
    }

    async fn authorization_redirect(&self, redirect_uri: String) -> ConsumerResult<Url> {
        let config = &self.inner.config;

        let mut request = self
            .inner
            .oauth_client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(config.scope.iter().cloned().map(Scope::new))
            .set_redirect_uri(Cow::Owned(RedirectUrl::new(redirect_uri.clone())?));

        for (key, value) in &config.authorization_params {
            request = request.add_extra_param(key.as_str(), value.as_str());
        }

        let pkce_verifier = if config.use_pkce {
            let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
            request = request.set_pkce_challenge(challenge);
            Some(verifier.secret().clone())
        } else {
            None
        };

        let (authorize_url, csrf_state) = request.url();

        let pending = PendingAuthorization::new(
            csrf_state.secret().clone(),
            config.name.clone(),
            redirect_uri,
            pkce_verifier,
            config.state_ttl_seconds,
        );
        self.inner.state_store.store(pending).await?;

        Ok(authorize_url)
    }

    /// Exchange the authorization code. A failed exchange yields `None`.
    async fn exchange_code(
        &self,
        code: String,
        pending: &PendingAuthorization,
    ) -> ConsumerResult<Option<OAuthToken>> {
        let mut request = self
            .inner
            .oauth_client
            .exchange_code(AuthorizationCode::new(code))
            .set_redirect_uri(Cow::Owned(RedirectUrl::new(pending.redirect_uri.clone())?));

        if let Some(verifier) = &pending.pkce_verifier {
            request = request.set_pkce_verifier(PkceCodeVerifier::new(verifier.clone()));
        }

        match request.request_async(&self.inner.http_client).await {
            Ok(response) => Ok(Some(OAuthToken::from_response(&response))),
            Err(e) => {
                warn!("Token exchange for blueprint {} failed: {}", self.name(), e);
                Ok(None)
            }
        }
    }

    fn redirect_after_callback(&self) -> Redirect {
        Redirect::to(&self.inner.config.redirect_to)
    }
}

impl std::fmt::Debug for Blueprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blueprint")
            .field("name", &self.inner.config.name)
            .field("scope", &self.inner.config.scope)
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

/// Query parameters the provider redirects back with
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
    error_uri: Option<String>,
}

async fn login(
    State(blueprint): State<Blueprint>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> ConsumerResult<Redirect> {
    let swept = blueprint.inner.state_store.cleanup_expired().await?;
    if swept > 0 {
        debug!("Dropped {} expired pending authorization(s)", swept);
    }

    let redirect_uri = blueprint.redirect_uri_for(&headers, uri.path())?;
    let authorize_url = blueprint.authorization_redirect(redirect_uri).await?;

    debug!("Redirecting to {} authorization endpoint", blueprint.name());
    Ok(Redirect::to(authorize_url.as_str()))
}

async fn authorized(
    State(blueprint): State<Blueprint>,
    Query(query): Query<CallbackQuery>,
) -> ConsumerResult<Redirect> {
    if let Some(error) = query.error {
        warn!(
            "Provider {} reported an authorization error: {}",
            blueprint.name(),
            error
        );

        let event = ErrorEvent {
            error,
            error_description: query.error_description,
            error_uri: query.error_uri,
        };
        blueprint
            .signals()
            .error
            .send(&blueprint, event)
            .await
            .map_err(ConsumerError::Handler)?;

        return Ok(blueprint.redirect_after_callback());
    }

    let state = query.state.ok_or(ConsumerError::MissingState)?;
    let pending = blueprint.inner.state_store.retrieve(&state).await?;
    if pending.blueprint != blueprint.name() {
        return Err(ConsumerError::InvalidState(pending.blueprint));
    }

    let code = query.code.ok_or(ConsumerError::MissingAuthorizationCode)?;
    let token = blueprint.exchange_code(code, &pending).await?;

    blueprint
        .signals()
        .authorized
        .send(&blueprint, AuthorizedEvent { token })
        .await
        .map_err(ConsumerError::Handler)?;

    info!("Completed {} authorization callback", blueprint.name());
    Ok(blueprint.redirect_after_callback())
}
