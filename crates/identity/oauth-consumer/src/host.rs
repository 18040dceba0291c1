//! Registration of blueprints on a host application.

use crate::blueprint::Blueprint;
use axum::Router;
use tracing::info;

/// Anything that can mount a blueprint's routes under a URL prefix
pub trait BlueprintHost {
    fn register_blueprint(&mut self, blueprint: &Blueprint, url_prefix: &str);
}

/// An axum application that blueprints are registered on
#[derive(Default)]
pub struct HostApp {
    router: Router,
    prefixes: Vec<String>,
}

impl HostApp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing router, e.g. one carrying the host's own pages
    pub fn with_router(router: Router) -> Self {
        Self {
            router,
            prefixes: Vec::new(),
        }
    }

    /// Prefixes registered so far, in registration order
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}

impl BlueprintHost for HostApp {
    fn register_blueprint(&mut self, blueprint: &Blueprint, url_prefix: &str) {
        let router = std::mem::take(&mut self.router);
        let prefix = url_prefix.trim_matches('/');

        // axum cannot nest at the root
        self.router = if prefix.is_empty() {
            router.merge(blueprint.router())
        } else {
            router.nest(&format!("/{}", prefix), blueprint.router())
        };

        info!("Registered blueprint {} under '/{}'", blueprint.name(), prefix);
        self.prefixes.push(url_prefix.to_string());
    }
}
