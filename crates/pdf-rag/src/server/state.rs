//! Application state for the RAG server

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::RagConfig;
use crate::documents::DocumentManager;
use crate::error::Result;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RagConfig,
    manager: Arc<DocumentManager>,
    ready: AtomicBool,
}

impl AppState {
    /// Build the production pipeline from `config`
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing RAG application state...");
        let manager = Arc::new(DocumentManager::from_config(&config).await?);
        Ok(Self::with_manager(config, manager))
    }

    /// Wrap an already constructed manager
    pub fn with_manager(config: RagConfig, manager: Arc<DocumentManager>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                manager,
                ready: AtomicBool::new(true),
            }),
        }
    }

    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn manager(&self) -> &Arc<DocumentManager> {
        &self.inner.manager
    }

    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
    }

    pub fn set_ready(&self, ready: bool) {
        self.inner.ready.store(ready, Ordering::SeqCst);
    }
}
