//! Provider session bound to an access token.

use crate::error::ConsumerResult;
use crate::token::OAuthToken;
use reqwest::{Client, Method, RequestBuilder};
use url::Url;

/// Issues requests against the provider's API base URL with bearer auth
#[derive(Debug, Clone)]
pub struct OAuthSession {
    http_client: Client,
    base_url: Url,
    token: OAuthToken,
}

impl OAuthSession {
    pub(crate) fn new(http_client: Client, base_url: Url, token: OAuthToken) -> Self {
        Self {
            http_client,
            base_url,
            token,
        }
    }

    pub fn token(&self) -> &OAuthToken {
        &self.token
    }

    /// Resolve `path` against the base URL. Absolute paths replace the base path.
    pub fn url(&self, path: &str) -> ConsumerResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    pub fn request(&self, method: Method, path: &str) -> ConsumerResult<RequestBuilder> {
        Ok(self
            .http_client
            .request(method, self.url(path)?)
            .bearer_auth(&self.token.access_token))
    }

    pub fn get(&self, path: &str) -> ConsumerResult<RequestBuilder> {
        self.request(Method::GET, path)
    }
}
