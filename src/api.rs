//! HTTP API for the intake gateway

mod handlers;
pub mod stage_handler;
mod types;

pub use handlers::create_router;
pub use types::*;

use crate::config::{Config, TransitionEndpoint, LOCAL_ENDPOINT};
use crate::invoke::{HttpTransport, InvocationAdapter, Invoker, LocalTransport, LoggingInvoker};
use crate::orchestrator::Orchestrator;
use crate::policy::LinearPolicy;
use crate::store::{SessionStore, SqliteStore};
use std::sync::Arc;

/// Orchestrator as wired for serving: trait objects on both sides
pub type SharedOrchestrator = Orchestrator<Arc<dyn SessionStore>, Arc<dyn Invoker>>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SharedOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: SharedOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Wire the store and the configured transition service together
    pub fn from_config(config: &Config, store: SqliteStore) -> Self {
        let store: Arc<dyn SessionStore> = Arc::new(store);
        Self::new(Orchestrator::new(store, build_invoker(config)))
    }
}

/// Invoker for the configured endpoint, wrapped for logging
pub fn build_invoker(config: &Config) -> Arc<dyn Invoker> {
    let inner: Arc<dyn Invoker> = match &config.transition_endpoint {
        TransitionEndpoint::Local => Arc::new(
            InvocationAdapter::new(LocalTransport::new(LinearPolicy))
                .with_max_attempts(config.invoke_max_attempts),
        ),
        TransitionEndpoint::Http(url) => Arc::new(
            InvocationAdapter::new(HttpTransport::new(
                url.clone(),
                config.qualifier.clone(),
                config.invoke_timeout,
            ))
            .with_max_attempts(config.invoke_max_attempts),
        ),
    };
    let target = match &config.transition_endpoint {
        TransitionEndpoint::Local => LOCAL_ENDPOINT,
        TransitionEndpoint::Http(url) => url.as_str(),
    };
    Arc::new(LoggingInvoker::new(inner, target))
}
