//! Adapter registry
//!
//! Built once at startup and shared read-only (behind an `Arc`) by every
//! execution in the process.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::{
    Adapter, AdapterError, GcpAdapter, GitHubAdapter, LinearAdapter, NotionAdapter, Prompt,
    SlackAdapter,
};
use crate::credentials::CredentialStore;

#[derive(Default)]
pub struct AdapterRegistry {
    adapters: BTreeMap<String, Arc<dyn Adapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter, replacing any previous one with the same name
    pub fn register(&mut self, adapter: Arc<dyn Adapter>) {
        debug!(adapter = adapter.name(), "Registering adapter");
        self.adapters.insert(adapter.name().to_string(), adapter);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters.get(name).cloned()
    }

    /// All adapters, ordered by name
    pub fn list(&self) -> Vec<Arc<dyn Adapter>> {
        self.adapters.values().cloned().collect()
    }

    pub async fn initialize(&self, name: &str) -> Result<(), AdapterError> {
        let adapter = self
            .get(name)
            .ok_or_else(|| AdapterError::NotFound(name.to_string()))?;
        info!(adapter = name, "Initializing adapter");
        adapter.initialize().await
    }

    pub async fn authenticate(
        &self,
        name: &str,
        prompt: &mut dyn Prompt,
    ) -> Result<(), AdapterError> {
        let adapter = self
            .get(name)
            .ok_or_else(|| AdapterError::NotFound(name.to_string()))?;
        if !adapter.supports_authentication() {
            return Err(AdapterError::AuthUnsupported(name.to_string()));
        }
        adapter.authenticate(prompt).await
    }
}

/// Registry with every built-in adapter, each holding a handle to `credentials`
pub fn builtin_registry(credentials: Arc<CredentialStore>) -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(SlackAdapter::new(credentials.clone())));
    registry.register(Arc::new(GitHubAdapter::new(credentials.clone())));
    registry.register(Arc::new(GcpAdapter::new(credentials.clone())));
    registry.register(Arc::new(NotionAdapter::new(credentials.clone())));
    registry.register(Arc::new(LinearAdapter::new(credentials)));
    registry
}
