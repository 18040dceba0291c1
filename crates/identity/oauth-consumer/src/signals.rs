//! Lifecycle signals emitted by a blueprint's callback route.
//!
//! Receivers are connected once, usually when the blueprint is registered, and
//! run in connection order for every event. The first receiver that fails stops
//! dispatch and its error is surfaced to the host as the callback's response.

use crate::blueprint::Blueprint;
use crate::token::OAuthToken;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Error type receivers may fail with
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

type Receiver<E> =
    Arc<dyn Fn(Blueprint, E) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;

/// Sent after the code exchange. `token` is `None` when the exchange failed.
#[derive(Debug, Clone)]
pub struct AuthorizedEvent {
    pub token: Option<OAuthToken>,
}

/// Sent when the provider redirects back with an `error` parameter
#[derive(Debug, Clone)]
pub struct ErrorEvent {
    pub error: String,
    pub error_description: Option<String>,
    pub error_uri: Option<String>,
}

pub struct Signal<E> {
    name: &'static str,
    receivers: RwLock<Vec<Receiver<E>>>,
}

impl<E: Clone + Send + 'static> Signal<E> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            receivers: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn connect<F, Fut>(&self, receiver: F)
    where
        F: Fn(Blueprint, E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        let receiver: Receiver<E> =
            Arc::new(move |blueprint: Blueprint, event: E| receiver(blueprint, event).boxed());
        self.receivers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(receiver);
    }

    pub fn receiver_count(&self) -> usize {
        self.receivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub async fn send(&self, blueprint: &Blueprint, event: E) -> Result<(), HandlerError> {
        // Snapshot so the lock is not held across receiver awaits
        let receivers: Vec<Receiver<E>> = self
            .receivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        debug!(
            "Dispatching {} from blueprint {} to {} receiver(s)",
            self.name,
            blueprint.name(),
            receivers.len()
        );

        for receiver in receivers {
            receiver(blueprint.clone(), event.clone()).await?;
        }

        Ok(())
    }
}

/// The signals every blueprint carries
pub struct Signals {
    pub authorized: Signal<AuthorizedEvent>,
    pub error: Signal<ErrorEvent>,
}

impl Default for Signals {
    fn default() -> Self {
        Self {
            authorized: Signal::new("oauth_authorized"),
            error: Signal::new("oauth_error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::BlueprintConfig;
    use std::sync::Mutex;

    fn test_blueprint() -> Blueprint {
        Blueprint::new(BlueprintConfig::new(
            "test",
            "client",
            "secret",
            "https://example.com/auth",
            "https://example.com/token",
            "https://api.example.com/",
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_receivers_run_in_connection_order() {
        let blueprint = test_blueprint();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second"] {
            let seen = seen.clone();
            blueprint.signals().error.connect(move |_, event: ErrorEvent| {
                let seen = seen.clone();
                async move {
                    seen.lock().unwrap().push(format!("{}:{}", label, event.error));
                    Ok::<(), HandlerError>(())
                }
            });
        }

        let event = ErrorEvent {
            error: "access_denied".to_string(),
            error_description: None,
            error_uri: None,
        };
        blueprint.signals().error.send(&blueprint, event).await.unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:access_denied", "second:access_denied"]
        );
    }

    #[tokio::test]
    async fn test_failing_receiver_stops_dispatch() {
        let blueprint = test_blueprint();
        let reached = Arc::new(Mutex::new(false));

        blueprint
            .signals()
            .authorized
            .connect(|_, _| async { Err::<(), HandlerError>("nope".into()) });
        let flag = reached.clone();
        blueprint.signals().authorized.connect(move |_, _| {
            let flag = flag.clone();
            async move {
                *flag.lock().unwrap() = true;
                Ok::<(), HandlerError>(())
            }
        });

        let result = blueprint
            .signals()
            .authorized
            .send(&blueprint, AuthorizedEvent { token: None })
            .await;

        assert_eq!(result.unwrap_err().to_string(), "nope");
        assert!(!*reached.lock().unwrap());
        assert_eq!(blueprint.signals().authorized.receiver_count(), 2);
    }
}
