//! Observable outcomes of the token lifecycle.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

/// Something the token manager did or failed to do for one (provider, account).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenEvent {
    /// Stored token still outside the refresh buffer.
    Served { expires_at: DateTime<Utc> },
    /// No credential row exists.
    NotAuthorized,
    /// The credential row could not be read.
    LookupFailed { error: String },
    /// Stored token is inside the refresh buffer or already expired.
    RefreshStarted { expires_at: DateTime<Utc> },
    /// Client id or secret is not configured; nothing was sent.
    ConfigurationMissing,
    /// Token endpoint answered with a non-2xx status.
    RefreshRejected { status: u16, body: String },
    /// Token endpoint unreachable or its response unreadable.
    RefreshFailed { error: String },
    /// New tokens minted and persisted.
    Refreshed { expires_at: DateTime<Utc> },
    /// New tokens minted but the row write failed.
    PersistenceFailed { error: String },
}

/// Receives every [`TokenEvent`] the manager emits.
pub trait TokenEventSink: Send + Sync {
    fn record(&self, provider: &str, account_id: &str, event: TokenEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl TokenEventSink for TracingEventSink {
    fn record(&self, provider: &str, account_id: &str, event: TokenEvent) {
        match event {
            TokenEvent::Served { expires_at } => {
                debug!(provider, account_id, %expires_at, "Serving stored access token");
            }
            TokenEvent::NotAuthorized => {
                warn!(provider, account_id, "No credential found; integration not authorized");
            }
            TokenEvent::LookupFailed { error } => {
                error!(provider, account_id, %error, "Credential lookup failed");
            }
            TokenEvent::RefreshStarted { expires_at } => {
                info!(provider, account_id, %expires_at, "Token expired or expiring soon, refreshing");
            }
            TokenEvent::ConfigurationMissing => {
                error!(provider, account_id, "Missing OAuth client id or secret");
            }
            TokenEvent::RefreshRejected { status, body } => {
                error!(provider, account_id, status, %body, "Token refresh rejected");
            }
            TokenEvent::RefreshFailed { error } => {
                error!(provider, account_id, %error, "Token refresh failed");
            }
            TokenEvent::Refreshed { expires_at } => {
                info!(provider, account_id, %expires_at, "Stored refreshed token");
            }
            TokenEvent::PersistenceFailed { error } => {
                error!(provider, account_id, %error, "Failed to store refreshed token");
            }
        }
    }
}
