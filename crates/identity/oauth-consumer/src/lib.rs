//! OAuth2 consumer blueprints for axum applications.
//!
//! A [`Blueprint`] bundles a provider's client credentials, its login and
//! callback routes, and the signals fired when the provider redirects back.
//! Hosts register blueprints under a URL prefix through [`BlueprintHost`] and
//! react to the outcome by connecting receivers to the blueprint's signals.
//! The protocol mechanics (authorization URLs, CSRF state, PKCE and the code
//! exchange) are delegated to the `oauth2` crate.

mod blueprint;
mod error;
mod google;
mod host;
mod session;
mod signals;
mod state;
mod token;


pub use blueprint::{Blueprint, BlueprintConfig, CallbackQuery};
pub use error::{ConsumerError, ConsumerResult};
pub use google::{
    GOOGLE_API_BASE_URL, GOOGLE_AUTHORIZATION_URL, GOOGLE_BLUEPRINT_NAME, GOOGLE_TOKEN_URL,
    google_blueprint_config, make_google_blueprint,
};
pub use host::{BlueprintHost, HostApp};
pub use session::OAuthSession;
pub use signals::{AuthorizedEvent, ErrorEvent, HandlerError, Signal, Signals};
pub use state::{
    AuthorizationStateStore, DEFAULT_MAX_PENDING, InMemoryStateStore, PendingAuthorization,
};
pub use token::OAuthToken;
