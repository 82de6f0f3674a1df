use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::AuthError;

/// Safety margin before `expires_at` inside which a token counts as expired.
pub const REFRESH_BUFFER_SECS: i64 = 5 * 60;

/// One stored OAuth grant for a (provider, account) pair.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrationCredential {
    pub provider: String,
    pub account_id: String,
    #[serde(skip_serializing)]
    pub access_token: String,
    #[serde(skip_serializing)]
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl IntegrationCredential {
    /// True when `now` plus the refresh buffer has reached `expires_at`.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_BUFFER_SECS) >= self.expires_at
    }
}

/// Full replacement of a credential row, matched on (provider, account_id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialUpsert {
    pub provider: String,
    pub account_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persistent storage for integration credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetch the row for (provider, account_id), if any.
    async fn find(
        &self,
        provider: &str,
        account_id: &str,
    ) -> Result<Option<IntegrationCredential>, AuthError>;

    /// Insert or overwrite the row for (provider, account_id).
    async fn upsert(&self, credential: &CredentialUpsert) -> Result<(), AuthError>;

    /// Round-trip to the backing storage.
    async fn ping(&self) -> Result<(), AuthError>;
}
