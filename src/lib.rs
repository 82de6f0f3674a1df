pub mod api;
pub mod config;
pub mod error;
pub mod providers;
pub mod store;
pub mod token;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use error::AuthError;
pub use token::TokenLifecycleManager;

use std::sync::Arc;

/// Shared application state passed to all API handlers.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn store::CredentialStore>,
    pub secrets: Arc<dyn config::SecretSource>,
    pub registry: providers::ProviderRegistry,
}

pub type SharedState = Arc<AppState>;
