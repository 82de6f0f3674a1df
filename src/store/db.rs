//! PostgreSQL-backed credential store.
//!
//! Talks to the Supabase database directly. Table:
//! - `integrations`: one OAuth grant per (provider, location_id)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use super::credential::{CredentialStore, CredentialUpsert, IntegrationCredential};
use crate::error::AuthError;

/// Credential store backed by PostgreSQL.
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub async fn new(db_url: &str) -> Result<Self, AuthError> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(db_url)
            .await
            .map_err(|e| AuthError::Database(format!("Failed to connect to PostgreSQL: {e}")))?;

        Ok(Self { pool })
    }

    /// Run schema migrations.
    ///
    /// `CREATE TABLE IF NOT EXISTS` leaves an existing Supabase-managed table
    /// untouched; it only bootstraps fresh databases.
    pub async fn migrate(&self) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS integrations (
                id              UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                provider        TEXT NOT NULL,
                location_id     TEXT,
                access_token    TEXT NOT NULL,
                refresh_token   TEXT NOT NULL,
                expires_at      TIMESTAMPTZ NOT NULL,
                created_at      TIMESTAMPTZ DEFAULT NOW(),
                updated_at      TIMESTAMPTZ DEFAULT NOW(),
                UNIQUE(provider, location_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find(
        &self,
        provider: &str,
        account_id: &str,
    ) -> Result<Option<IntegrationCredential>, AuthError> {
        let row = sqlx::query(
            r#"
            SELECT access_token, refresh_token, expires_at, updated_at
            FROM integrations
            WHERE provider = $1 AND location_id = $2
            LIMIT 1
            "#,
        )
        .bind(provider)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        let row = match row {
            Some(r) => r,
            None => return Ok(None),
        };

        let expires_at: DateTime<Utc> = row.try_get(2)?;
        let updated_at: Option<DateTime<Utc>> = row.try_get(3)?;

        Ok(Some(IntegrationCredential {
            provider: provider.to_string(),
            account_id: account_id.to_string(),
            access_token: row.try_get(0)?,
            refresh_token: row.try_get(1)?,
            expires_at,
            updated_at,
        }))
    }

    async fn upsert(&self, credential: &CredentialUpsert) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            INSERT INTO integrations
                (provider, location_id, access_token, refresh_token, expires_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (provider, location_id)
            DO UPDATE SET
                access_token = EXCLUDED.access_token,
                refresh_token = EXCLUDED.refresh_token,
                expires_at = EXCLUDED.expires_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&credential.provider)
        .bind(&credential.account_id)
        .bind(&credential.access_token)
        .bind(&credential.refresh_token)
        .bind(credential.expires_at)
        .bind(credential.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), AuthError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
