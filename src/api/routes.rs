//! API route handlers.
//!
//! Token retrieval is for other backend handlers only and is guarded by the
//! shared `x-internal-secret` header.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::config::ClientCredentials;
use crate::error::AuthError;
use crate::store::CredentialUpsert;
use crate::token::manager::expiry_after;
use crate::token::TokenLifecycleManager;
use crate::SharedState;

// =============================================================================
// V1 Router
// =============================================================================

pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        // ── Health ───────────────────────────────────────────────────────
        .route("/status", get(status))
        // ── OAuth ────────────────────────────────────────────────────────
        .route("/oauth/providers", get(oauth_providers))
        .route("/oauth/start/{provider}", get(oauth_start))
        .route("/oauth/callback/{provider}", get(oauth_callback))
        .route("/oauth/token/{account_id}", get(oauth_token_default))
        .route("/oauth/token/{provider}/{account_id}", get(oauth_token))
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

async fn status(State(state): State<SharedState>) -> impl IntoResponse {
    let (code, status, database) = match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "ok", "ok"),
        Err(e) => {
            warn!(error = %e, "Credential store unreachable");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unreachable")
        }
    };

    (
        code,
        Json(json!({
            "status": status,
            "service": "crm-auth",
            "version": env!("CARGO_PKG_VERSION"),
            "database": database,
        })),
    )
}

// =============================================================================
// OAuth Endpoints
// =============================================================================

/// GET /v1/oauth/providers — List registered providers.
async fn oauth_providers(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let mut providers: Vec<_> = state
        .registry
        .list()
        .into_iter()
        .filter_map(|id| state.registry.get(id))
        .map(|p| json!({ "id": p.id(), "name": p.display_name() }))
        .collect();
    providers.sort_by(|a, b| a["id"].as_str().cmp(&b["id"].as_str()));

    Json(json!({ "data": providers }))
}

#[derive(Deserialize)]
struct OAuthStartQuery {
    #[serde(default)]
    scopes: String,
}

/// GET /v1/oauth/start/:provider — Build the authorization URL the dashboard
/// sends the user to.
///
/// `scopes` is comma-separated; the provider's defaults apply when omitted.
async fn oauth_start(
    State(state): State<SharedState>,
    Path(provider_id): Path<String>,
    Query(q): Query<OAuthStartQuery>,
) -> Result<Json<serde_json::Value>, AuthError> {
    let provider = state.registry.resolve(Some(provider_id.as_str()))?;

    let prefix = provider.secret_prefix();
    let client_id = state
        .secrets
        .get(&format!("{prefix}_CLIENT_ID"))
        .ok_or_else(|| AuthError::MissingConfig(format!("{prefix}_CLIENT_ID")))?;
    let redirect_uri = state
        .secrets
        .get(&format!("{prefix}_REDIRECT_URI"))
        .unwrap_or_else(|| state.config.callback_url(&provider_id));

    let scopes: Vec<String> = if q.scopes.is_empty() {
        provider.default_scopes()
    } else {
        q.scopes.split(',').map(|s| s.trim().to_string()).collect()
    };

    let auth_url = provider.auth_url(&client_id, &scopes, &redirect_uri);
    info!(provider = %provider_id, "Authorization URL issued");

    Ok(Json(json!({
        "data": {
            "auth_url": auth_url,
            "redirect_uri": redirect_uri,
        }
    })))
}

#[derive(Deserialize)]
struct OAuthCallbackQuery {
    code: Option<String>,
    error: Option<String>,
}

/// GET /v1/oauth/callback/:provider — Exchange an authorization code and seed
/// the credential row for the granted account.
async fn oauth_callback(
    State(state): State<SharedState>,
    Path(provider_id): Path<String>,
    Query(q): Query<OAuthCallbackQuery>,
) -> Result<Response, AuthError> {
    if let Some(error) = q.error {
        warn!(provider = %provider_id, %error, "Authorization denied by provider");
        return Err(AuthError::BadRequest(format!("authorization failed: {error}")));
    }

    let code = q
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AuthError::BadRequest("no authorization code received".into()))?;

    let provider = state.registry.resolve(Some(provider_id.as_str()))?;

    let callback_url = state.config.callback_url(&provider_id);
    let prefix = provider.secret_prefix();
    let client = ClientCredentials::resolve(state.secrets.as_ref(), prefix, &callback_url)
        .ok_or_else(|| {
            AuthError::MissingConfig(format!("{prefix}_CLIENT_ID / {prefix}_CLIENT_SECRET"))
        })?;

    let tokens = provider
        .exchange_code(&client, &code, &client.redirect_uri)
        .await?;

    let account_id = tokens
        .account_id
        .ok_or_else(|| AuthError::ProviderError("token response missing account id".into()))?;
    let refresh_token = tokens
        .refresh_token
        .ok_or_else(|| AuthError::ProviderError("token response missing refresh_token".into()))?;

    let now = Utc::now();
    let lifetime = tokens
        .expires_in
        .unwrap_or_else(|| provider.token_ttl().as_secs());

    state
        .store
        .upsert(&CredentialUpsert {
            provider: provider_id.clone(),
            account_id: account_id.clone(),
            access_token: tokens.access_token,
            refresh_token,
            expires_at: expiry_after(now, lifetime),
            updated_at: now,
        })
        .await?;

    info!(provider = %provider_id, %account_id, "Integration connected");

    let redirect_url = format!(
        "{}/integrations/connected?provider={}&account_id={}",
        state.config.dashboard_url,
        urlencoding(&provider_id),
        urlencoding(&account_id),
    );
    Ok(Redirect::temporary(&redirect_url).into_response())
}

/// GET /v1/oauth/token/:provider/:account_id — Get a valid access token
/// (refreshes when expiring).
async fn oauth_token(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path((provider_id, account_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AuthError> {
    require_internal(&state, &headers)?;
    serve_token(&state, Some(&provider_id), account_id).await
}

/// GET /v1/oauth/token/:account_id — Same, for the default provider.
async fn oauth_token_default(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(account_id): Path<String>,
) -> Result<Json<serde_json::Value>, AuthError> {
    require_internal(&state, &headers)?;
    serve_token(&state, None, account_id).await
}

async fn serve_token(
    state: &SharedState,
    provider_id: Option<&str>,
    account_id: String,
) -> Result<Json<serde_json::Value>, AuthError> {
    let provider = state.registry.resolve(provider_id)?;
    let provider_id = provider.id().to_string();

    let manager = TokenLifecycleManager::new(
        state.store.clone(),
        provider,
        state.secrets.clone(),
        account_id.clone(),
    );

    let access_token = manager
        .get_valid_token()
        .await
        .ok_or(AuthError::TokenUnavailable {
            provider: provider_id,
            account_id,
        })?;

    Ok(Json(json!({ "data": { "access_token": access_token } })))
}

/// Check the service-to-service secret. An empty configured secret never matches.
fn require_internal(state: &SharedState, headers: &HeaderMap) -> Result<(), AuthError> {
    let provided = headers
        .get("x-internal-secret")
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::Unauthorized)?;

    let expected = &state.config.auth_service_secret;
    if expected.is_empty() || provided != expected {
        return Err(AuthError::Unauthorized);
    }

    Ok(())
}

fn urlencoding(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}
