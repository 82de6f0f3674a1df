use std::collections::HashMap;
use std::sync::Arc;

use super::traits::OAuthProvider;
use super::DEFAULT_PROVIDER;
use crate::error::AuthError;

/// Registry of available OAuth providers, keyed by provider ID.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn OAuthProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Register a new provider. Replaces any provider with the same ID.
    pub fn register(&mut self, provider: Arc<dyn OAuthProvider>) {
        let id = provider.id().to_string();
        self.providers.insert(id, provider);
    }

    /// Get a provider by ID.
    pub fn get(&self, id: &str) -> Option<Arc<dyn OAuthProvider>> {
        self.providers.get(id).cloned()
    }

    /// Look up `id`, or [`DEFAULT_PROVIDER`] when the caller names none.
    pub fn resolve(&self, id: Option<&str>) -> Result<Arc<dyn OAuthProvider>, AuthError> {
        let id = id.unwrap_or(DEFAULT_PROVIDER);
        self.get(id)
            .ok_or_else(|| AuthError::ProviderNotFound(id.to_string()))
    }

    /// List all registered provider IDs.
    pub fn list(&self) -> Vec<&str> {
        self.providers.keys().map(|k| k.as_str()).collect()
    }

    /// Number of registered providers.
    pub fn count(&self) -> usize {
        self.providers.len()
    }
}
