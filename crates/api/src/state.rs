use std::sync::Arc;

use shelfmark_core::queue::ports::{AssignmentStore, CatalogRegistry, ContentStore, Notifier};
use shelfmark_core::queue::QueueContext;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// Cheaply cloneable: every collaborator sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Assignment persistence.
    pub store: Arc<dyn AssignmentStore>,
    /// Campaign and reader profile lookups.
    pub registry: Arc<dyn CatalogRegistry>,
    /// Artifact bytes.
    pub content: Arc<dyn ContentStore>,
    /// Reader notifications.
    pub notifier: Arc<dyn Notifier>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Borrow the collaborators for one queue operation.
    pub fn queue_context(&self) -> QueueContext<'_> {
        QueueContext {
            store: self.store.as_ref(),
            registry: self.registry.as_ref(),
            content: self.content.as_ref(),
            notifier: self.notifier.as_ref(),
            policy: self.config.access_policy,
        }
    }
}
