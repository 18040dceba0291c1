//! Consumer flow error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::signals::HandlerError;

pub type ConsumerResult<T> = Result<T, ConsumerError>;

#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Missing state parameter")]
    MissingState,

    #[error("State not found or expired")]
    StateNotFound,

    #[error("State was issued for blueprint '{0}'")]
    InvalidState(String),

    #[error("Missing authorization code")]
    MissingAuthorizationCode,

    #[error("Cannot build a redirect URI from the request: {0}")]
    InvalidRedirectUri(String),

    #[error("{0}")]
    Handler(HandlerError),
}

impl ConsumerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ConsumerError::MissingState
            | ConsumerError::StateNotFound
            | ConsumerError::InvalidState(_)
            | ConsumerError::MissingAuthorizationCode
            | ConsumerError::InvalidRedirectUri(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ConsumerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("OAuth consumer request failed: {}", self);
        } else {
            warn!("Rejected OAuth callback: {}", self);
        }
        (status, self.to_string()).into_response()
    }
}
