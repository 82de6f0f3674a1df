use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Unified error type for the crm-auth service.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    // ── Auth Errors ─────────────────────────────────────────────────────
    #[error("Authentication required")]
    Unauthorized,

    // ── Request Errors ──────────────────────────────────────────────────
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("No valid token available for {provider}/{account_id}")]
    TokenUnavailable { provider: String, account_id: String },

    // ── Provider Errors ─────────────────────────────────────────────────
    #[error("OAuth provider error: {0}")]
    ProviderError(String),

    #[error("Provider {0} not found")]
    ProviderNotFound(String),

    #[error("Token endpoint rejected refresh with status {status}: {body}")]
    RefreshRejected { status: u16, body: String },

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    // ── Internal ────────────────────────────────────────────────────────
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!("Database error: {e}");
        AuthError::Database(e.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AuthError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AuthError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AuthError::TokenUnavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "token_unavailable")
            }
            AuthError::ProviderError(_) => (StatusCode::BAD_GATEWAY, "provider_error"),
            AuthError::ProviderNotFound(_) => (StatusCode::NOT_FOUND, "provider_not_found"),
            AuthError::RefreshRejected { .. } => (StatusCode::BAD_GATEWAY, "refresh_rejected"),
            AuthError::RefreshFailed(_) => (StatusCode::BAD_GATEWAY, "refresh_failed"),
            AuthError::MissingConfig(_) => (StatusCode::INTERNAL_SERVER_ERROR, "missing_config"),
            AuthError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
        };

        let body = json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}
