//! Credential store — persistence for OAuth grants, one row per
//! (provider, account).

pub mod credential;
pub mod db;

pub use credential::{CredentialStore, CredentialUpsert, IntegrationCredential, REFRESH_BUFFER_SECS};
pub use db::PgCredentialStore;
