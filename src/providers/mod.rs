mod highlevel;
mod registry;
mod traits;

pub use highlevel::{
    HighLevelProvider, HIGHLEVEL_AUTH_URL, HIGHLEVEL_DEFAULT_REDIRECT_URI, HIGHLEVEL_DEFAULT_SCOPES,
    HIGHLEVEL_TOKEN_URL,
};
pub use registry::ProviderRegistry;
pub use traits::{OAuthProvider, TokenSet};

use std::sync::Arc;

/// Provider used when a caller does not name one.
pub const DEFAULT_PROVIDER: &str = "highlevel";

/// Register all built-in CRM providers.
pub fn register_defaults(registry: &mut ProviderRegistry) {
    registry.register(Arc::new(HighLevelProvider::new()));
}
