use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crm_auth::config::{Config, EnvSecrets};
use crm_auth::providers::{self, ProviderRegistry};
use crm_auth::store::PgCredentialStore;
use crm_auth::{api, AppState, SharedState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crm_auth=info,tower_http=info".into()),
        )
        .init();

    // Load config
    let config = Config::from_env()?;
    info!("crm-auth v{}", env!("CARGO_PKG_VERSION"));
    info!("Listening on {}:{}", config.host, config.port);

    // Initialize components
    let store = PgCredentialStore::new(&config.database_url).await?;
    store.migrate().await?;
    info!("Database connected and migrated");

    let mut registry = ProviderRegistry::new();
    providers::register_defaults(&mut registry);
    info!("Registered {} OAuth providers", registry.count());

    let state: SharedState = Arc::new(AppState {
        config: config.clone(),
        store: Arc::new(store),
        secrets: Arc::new(EnvSecrets),
        registry,
    });

    let app = api::router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server ready");
    axum::serve(listener, app).await?;

    Ok(())
}
