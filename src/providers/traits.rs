use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ClientCredentials;
use crate::error::AuthError;

/// A set of tokens returned from an OAuth provider after code exchange or refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<u64>,
    pub scope: Option<String>,
    /// Tenant the grant is scoped to (HighLevel `locationId`).
    pub account_id: Option<String>,
}

/// Trait that every OAuth provider must implement.
///
/// Client credentials are passed per call so that a missing registration can
/// be detected before any network traffic.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Unique provider identifier, also the `provider` column value (e.g. "highlevel").
    fn id(&self) -> &str;

    /// Human-readable display name.
    fn display_name(&self) -> &str;

    /// Prefix of the `{PREFIX}_CLIENT_ID` / `_CLIENT_SECRET` / `_REDIRECT_URI` secrets.
    fn secret_prefix(&self) -> &str;

    /// Redirect URI sent on refresh when none is configured.
    fn default_redirect_uri(&self) -> &str;

    /// Scopes requested when the caller names none.
    fn default_scopes(&self) -> Vec<String> {
        Vec::new()
    }

    /// Build the URL the user is sent to in order to grant access.
    fn auth_url(&self, client_id: &str, scopes: &[String], redirect_uri: &str) -> String;

    /// Exchange an authorization code for an access token and refresh token.
    async fn exchange_code(
        &self,
        client: &ClientCredentials,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenSet, AuthError>;

    /// Mint a new access token from a refresh token.
    ///
    /// A non-2xx response must surface as [`AuthError::RefreshRejected`].
    async fn refresh_token(
        &self,
        client: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<TokenSet, AuthError>;

    /// Lifetime assumed when a token response carries no `expires_in`.
    fn token_ttl(&self) -> Duration {
        Duration::from_secs(3600) // 1 hour default
    }
}
