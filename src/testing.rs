//! In-memory collaborators shared by unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::config::ClientCredentials;
use crate::error::AuthError;
use crate::providers::{OAuthProvider, TokenSet};
use crate::store::{CredentialStore, CredentialUpsert, IntegrationCredential};
use crate::token::{TokenEvent, TokenEventSink};

// ── Store ───────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<(String, String), IntegrationCredential>>,
    writes: AtomicUsize,
    fail_reads: bool,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn with_row(
        provider: &str,
        account_id: &str,
        access_token: &str,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let store = Self::default();
        store.rows.lock().unwrap().insert(
            (provider.to_string(), account_id.to_string()),
            IntegrationCredential {
                provider: provider.to_string(),
                account_id: account_id.to_string(),
                access_token: access_token.to_string(),
                refresh_token: refresh_token.to_string(),
                expires_at,
                updated_at: None,
            },
        );
        store
    }

    pub fn row(&self, provider: &str, account_id: &str) -> Option<IntegrationCredential> {
        self.rows
            .lock()
            .unwrap()
            .get(&(provider.to_string(), account_id.to_string()))
            .cloned()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find(
        &self,
        provider: &str,
        account_id: &str,
    ) -> Result<Option<IntegrationCredential>, AuthError> {
        if self.fail_reads {
            return Err(AuthError::Database("connection refused".into()));
        }
        Ok(self.row(provider, account_id))
    }

    async fn upsert(&self, credential: &CredentialUpsert) -> Result<(), AuthError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(AuthError::Database("write rejected".into()));
        }
        self.rows.lock().unwrap().insert(
            (credential.provider.clone(), credential.account_id.clone()),
            IntegrationCredential {
                provider: credential.provider.clone(),
                account_id: credential.account_id.clone(),
                access_token: credential.access_token.clone(),
                refresh_token: credential.refresh_token.clone(),
                expires_at: credential.expires_at,
                updated_at: Some(credential.updated_at),
            },
        );
        Ok(())
    }

    async fn ping(&self) -> Result<(), AuthError> {
        if self.fail_reads {
            return Err(AuthError::Database("connection refused".into()));
        }
        Ok(())
    }
}

// ── Provider ────────────────────────────────────────────────────────────────

pub enum FakeResponse {
    Tokens(TokenSet),
    Rejected { status: u16, body: String },
    Unreachable,
}

pub struct FakeProvider {
    id: String,
    response: FakeResponse,
    refresh_calls: AtomicUsize,
    exchange_calls: AtomicUsize,
    seen_refresh_tokens: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn new(id: &str, response: FakeResponse) -> Self {
        Self {
            id: id.to_string(),
            response,
            refresh_calls: AtomicUsize::new(0),
            exchange_calls: AtomicUsize::new(0),
            seen_refresh_tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn issuing(id: &str, access: &str, refresh: Option<&str>, expires_in: Option<u64>) -> Self {
        Self::new(
            id,
            FakeResponse::Tokens(TokenSet {
                access_token: access.to_string(),
                refresh_token: refresh.map(str::to_string),
                token_type: Some("Bearer".into()),
                expires_in,
                scope: None,
                account_id: Some("loc-1".into()),
            }),
        )
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    pub fn seen_refresh_tokens(&self) -> Vec<String> {
        self.seen_refresh_tokens.lock().unwrap().clone()
    }

    fn respond(&self) -> Result<TokenSet, AuthError> {
        match &self.response {
            FakeResponse::Tokens(tokens) => Ok(tokens.clone()),
            FakeResponse::Rejected { status, body } => Err(AuthError::RefreshRejected {
                status: *status,
                body: body.clone(),
            }),
            FakeResponse::Unreachable => Err(AuthError::RefreshFailed("connection reset".into())),
        }
    }
}

#[async_trait]
impl OAuthProvider for FakeProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        "Fake CRM"
    }

    fn secret_prefix(&self) -> &str {
        "CRM_X"
    }

    fn default_redirect_uri(&self) -> &str {
        "https://example.test/callback"
    }

    fn default_scopes(&self) -> Vec<String> {
        vec!["contacts.readonly".into()]
    }

    fn auth_url(&self, client_id: &str, scopes: &[String], redirect_uri: &str) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", &scopes.join(" "))
            .finish();
        format!("https://crm.test/authorize?{query}")
    }

    async fn exchange_code(
        &self,
        _client: &ClientCredentials,
        _code: &str,
        _redirect_uri: &str,
    ) -> Result<TokenSet, AuthError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        self.respond()
    }

    async fn refresh_token(
        &self,
        _client: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<TokenSet, AuthError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_refresh_tokens
            .lock()
            .unwrap()
            .push(refresh_token.to_string());
        self.respond()
    }
}

// ── Events ──────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<TokenEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<TokenEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl TokenEventSink for RecordingSink {
    fn record(&self, _provider: &str, _account_id: &str, event: TokenEvent) {
        self.events.lock().unwrap().push(event);
    }
}
