//! Access-token lifecycle for one (provider, account) pair.
//!
//! Refresh is lazy: a token is only refreshed by the call that finds it
//! inside the buffer. No background loop, no retries, no locking. Concurrent
//! refreshes across instances are possible and the last write wins.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use super::events::{TokenEvent, TokenEventSink, TracingEventSink};
use crate::config::{ClientCredentials, SecretSource};
use crate::error::AuthError;
use crate::providers::OAuthProvider;
use crate::store::{CredentialStore, CredentialUpsert};

/// Produces a currently valid access token, refreshing and persisting it
/// when the stored one is expired or about to expire.
pub struct TokenLifecycleManager {
    store: Arc<dyn CredentialStore>,
    provider: Arc<dyn OAuthProvider>,
    secrets: Arc<dyn SecretSource>,
    events: Arc<dyn TokenEventSink>,
    account_id: String,
}

impl TokenLifecycleManager {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        provider: Arc<dyn OAuthProvider>,
        secrets: Arc<dyn SecretSource>,
        account_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            provider,
            secrets,
            events: Arc::new(TracingEventSink),
            account_id: account_id.into(),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn TokenEventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn provider(&self) -> &str {
        self.provider.id()
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Returns a usable access token, or `None` when the integration is not
    /// authorized or the token could not be refreshed this time.
    ///
    /// Every failure is reported through the event sink only.
    pub async fn get_valid_token(&self) -> Option<String> {
        let credential = match self.store.find(self.provider(), &self.account_id).await {
            Ok(Some(credential)) => credential,
            Ok(None) => {
                self.emit(TokenEvent::NotAuthorized);
                return None;
            }
            Err(e) => {
                self.emit(TokenEvent::LookupFailed {
                    error: e.to_string(),
                });
                return None;
            }
        };

        if !credential.needs_refresh(Utc::now()) {
            self.emit(TokenEvent::Served {
                expires_at: credential.expires_at,
            });
            return Some(credential.access_token);
        }

        self.emit(TokenEvent::RefreshStarted {
            expires_at: credential.expires_at,
        });
        self.refresh(&credential.refresh_token).await
    }

    async fn refresh(&self, current_refresh_token: &str) -> Option<String> {
        let Some(client) = ClientCredentials::resolve(
            self.secrets.as_ref(),
            self.provider.secret_prefix(),
            self.provider.default_redirect_uri(),
        ) else {
            self.emit(TokenEvent::ConfigurationMissing);
            return None;
        };

        let tokens = match self
            .provider
            .refresh_token(&client, current_refresh_token)
            .await
        {
            Ok(tokens) => tokens,
            Err(AuthError::RefreshRejected { status, body }) => {
                self.emit(TokenEvent::RefreshRejected { status, body });
                return None;
            }
            Err(e) => {
                self.emit(TokenEvent::RefreshFailed {
                    error: e.to_string(),
                });
                return None;
            }
        };

        let now = Utc::now();
        let lifetime = tokens
            .expires_in
            .unwrap_or_else(|| self.provider.token_ttl().as_secs());
        let expires_at = expiry_after(now, lifetime);

        // Providers that don't rotate leave the current refresh token valid.
        let refresh_token = tokens
            .refresh_token
            .unwrap_or_else(|| current_refresh_token.to_string());

        let upsert = CredentialUpsert {
            provider: self.provider().to_string(),
            account_id: self.account_id.clone(),
            access_token: tokens.access_token,
            refresh_token,
            expires_at,
            updated_at: now,
        };

        match self.store.upsert(&upsert).await {
            Ok(()) => self.emit(TokenEvent::Refreshed { expires_at }),
            Err(e) => self.emit(TokenEvent::PersistenceFailed {
                error: e.to_string(),
            }),
        }

        Some(upsert.access_token)
    }

    fn emit(&self, event: TokenEvent) {
        self.events.record(self.provider(), &self.account_id, event);
    }
}

/// `now + seconds`, saturating instead of overflowing.
pub(crate) fn expiry_after(now: DateTime<Utc>, seconds: u64) -> DateTime<Utc> {
    i64::try_from(seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
