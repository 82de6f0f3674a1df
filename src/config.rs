use anyhow::{Context, Result};
use std::collections::HashMap;

/// Application configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // ── Server ──────────────────────────────────────────────────────────
    pub host: String,
    pub port: u16,
    pub base_url: String,
    /// Dashboard frontend URL for post-OAuth redirects
    pub dashboard_url: String,

    // ── Database (the Supabase PostgreSQL instance) ─────────────────────
    pub database_url: String,

    // ── Service-to-service auth ─────────────────────────────────────────
    /// Shared secret request handlers present to fetch tokens.
    pub auth_service_secret: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8430".into())
                .parse()
                .context("Invalid PORT")?,
            base_url: std::env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8430".into()),
            dashboard_url: std::env::var("DASHBOARD_URL")
                .unwrap_or_else(|_| "http://localhost:5173".into()),

            database_url: std::env::var("DATABASE_URL")
                .context("DATABASE_URL is required (PostgreSQL connection string)")?,

            auth_service_secret: std::env::var("AUTH_SERVICE_SECRET")
                .context("AUTH_SERVICE_SECRET is required for service-to-service auth")?,
        })
    }

    /// Get the OAuth callback URL for a specific provider.
    pub fn callback_url(&self, provider: &str) -> String {
        format!("{}/v1/oauth/callback/{}", self.base_url, provider)
    }
}

// ── Secrets ─────────────────────────────────────────────────────────────────

/// Named secret lookup. Empty values count as absent.
pub trait SecretSource: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
}

/// Reads secrets from the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSecrets;

impl SecretSource for EnvSecrets {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }
}

/// Fixed in-memory secrets.
#[derive(Debug, Default, Clone)]
pub struct StaticSecrets {
    values: HashMap<String, String>,
}

impl StaticSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl SecretSource for StaticSecrets {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).filter(|v| !v.is_empty()).cloned()
    }
}

/// OAuth client registration used against a provider's token endpoint.
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

impl ClientCredentials {
    /// Resolve `{prefix}_CLIENT_ID`, `{prefix}_CLIENT_SECRET` and
    /// `{prefix}_REDIRECT_URI`. Returns `None` unless both id and secret are set.
    pub fn resolve(
        secrets: &dyn SecretSource,
        prefix: &str,
        fallback_redirect_uri: &str,
    ) -> Option<Self> {
        let client_id = secrets.get(&format!("{prefix}_CLIENT_ID"))?;
        let client_secret = secrets.get(&format!("{prefix}_CLIENT_SECRET"))?;
        let redirect_uri = secrets
            .get(&format!("{prefix}_REDIRECT_URI"))
            .unwrap_or_else(|| fallback_redirect_uri.to_string());

        Some(Self {
            client_id,
            client_secret,
            redirect_uri,
        })
    }
}
