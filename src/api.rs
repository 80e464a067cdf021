//! HTTP API for InnerNote

mod handlers;
mod identity;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::db::Database;
use crate::gateway::CompletionGateway;
use crate::llm::ModelRegistry;
use crate::runtime::{DatabaseStorage, ProductionSessions, SessionManager};
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<ProductionSessions>,
    pub gateway: Arc<CompletionGateway>,
}

impl AppState {
    pub fn new(db: Database, llm_registry: Arc<ModelRegistry>, session_ttl: Duration) -> Self {
        let gateway = Arc::new(CompletionGateway::new(llm_registry));
        Self {
            sessions: Arc::new(
                SessionManager::new(gateway.clone(), DatabaseStorage::new(db))
                    .with_idle_ttl(session_ttl),
            ),
            gateway,
        }
    }
}
