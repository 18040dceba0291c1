//! Google user-info documents.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Profile returned by Google's user-info endpoint.
///
/// The v1 endpoints identify the user with `id` and flag verification with
/// `verified_email`; the OpenID Connect flavoured ones use `sub` and
/// `email_verified`. Both spellings are accepted. Every field is optional:
/// any JSON document the endpoint answers with is a valid profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoogleUserInfo {
    #[serde(alias = "id")]
    pub sub: Option<String>,
    pub email: Option<String>,
    #[serde(alias = "verified_email")]
    pub email_verified: Option<bool>,
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture: Option<String>,
    pub locale: Option<String>,
    /// Hosted G Suite domain, if any
    pub hd: Option<String>,
    #[serde(flatten)]
    pub additional_claims: HashMap<String, serde_json::Value>,
}

impl From<serde_json::Value> for GoogleUserInfo {
    /// Typed fields are extracted when they have the expected shape. Otherwise
    /// the document is kept untouched in `additional_claims`.
    fn from(document: serde_json::Value) -> Self {
        match serde_json::from_value(document.clone()) {
            Ok(info) => info,
            Err(_) => {
                let additional_claims = match document {
                    serde_json::Value::Object(map) => map.into_iter().collect(),
                    other => HashMap::from([("document".to_string(), other)]),
                };
                Self {
                    additional_claims,
                    ..Self::default()
                }
            }
        }
    }
}
