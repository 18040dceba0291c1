//! Pending authorization storage for CSRF protection across the provider redirect.

use crate::error::{ConsumerError, ConsumerResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// An authorization started by the login route and not yet completed by the callback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAuthorization {
    pub state: String,
    pub blueprint: String,
    pub redirect_uri: String,
    pub pkce_verifier: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingAuthorization {
    pub fn new(
        state: String,
        blueprint: String,
        redirect_uri: String,
        pkce_verifier: Option<String>,
        ttl_seconds: u64,
    ) -> Self {
        let created_at = Utc::now();
        let expires_at = created_at + Duration::seconds(ttl_seconds as i64);

        Self {
            state,
            blueprint,
            redirect_uri,
            pkce_verifier,
            created_at,
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Storage for pending authorizations, keyed by the state parameter
#[async_trait]
pub trait AuthorizationStateStore: Send + Sync {
    /// Store a new pending authorization
    async fn store(&self, pending: PendingAuthorization) -> ConsumerResult<()>;

    /// Retrieve and remove a pending authorization by its state parameter
    async fn retrieve(&self, state: &str) -> ConsumerResult<PendingAuthorization>;

    /// Drop expired entries, returning how many were removed
    async fn cleanup_expired(&self) -> ConsumerResult<usize>;
}

/// Upper bound on pending authorizations held by [`InMemoryStateStore::new`]
pub const DEFAULT_MAX_PENDING: usize = 10_000;

/// In-memory store holding at most `max_pending` entries. When full, expired
/// entries are swept first and then the oldest pending authorization is
/// evicted.
pub struct InMemoryStateStore {
    pending: Arc<RwLock<HashMap<String, PendingAuthorization>>>,
    max_pending: usize,
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::with_max_pending(DEFAULT_MAX_PENDING)
    }
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_pending(max_pending: usize) -> Self {
        Self {
            pending: Arc::new(RwLock::new(HashMap::new())),
            max_pending: max_pending.max(1),
        }
    }

    pub fn max_pending(&self) -> usize {
        self.max_pending
    }

    pub async fn len(&self) -> usize {
        self.pending.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pending.read().await.is_empty()
    }
}

#[async_trait]
impl AuthorizationStateStore for InMemoryStateStore {
    async fn store(&self, pending: PendingAuthorization) -> ConsumerResult<()> {
        let mut entries = self.pending.write().await;

        if entries.len() >= self.max_pending && !entries.contains_key(&pending.state) {
            let now = Utc::now();
            entries.retain(|_, entry| entry.expires_at >= now);

            while entries.len() >= self.max_pending {
                let Some(oldest) = entries
                    .values()
                    .min_by_key(|entry| entry.created_at)
                    .map(|entry| entry.state.clone())
                else {
                    break;
                };
                warn!("Pending authorization limit reached, evicting oldest state");
                entries.remove(&oldest);
            }
        }

        entries.insert(pending.state.clone(), pending);
        Ok(())
    }

    async fn retrieve(&self, state: &str) -> ConsumerResult<PendingAuthorization> {
        let mut entries = self.pending.write().await;

        // Single use: the entry is gone whether or not it is still valid
        let pending = entries.remove(state).ok_or(ConsumerError::StateNotFound)?;

        if pending.is_expired() {
            return Err(ConsumerError::StateNotFound);
        }

        Ok(pending)
    }

    async fn cleanup_expired(&self) -> ConsumerResult<usize> {
        let mut entries = self.pending.write().await;
        let now = Utc::now();

        let before = entries.len();
        entries.retain(|_, pending| pending.expires_at >= now);

        Ok(before - entries.len())
    }
}
