use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::traits::{OAuthProvider, TokenSet};
use crate::config::ClientCredentials;
use crate::error::AuthError;

pub const HIGHLEVEL_AUTH_URL: &str = "https://marketplace.leadconnectorhq.com/oauth/chooselocation";
pub const HIGHLEVEL_TOKEN_URL: &str = "https://services.leadconnectorhq.com/oauth/token";

/// Contact management is all the integration needs.
pub const HIGHLEVEL_DEFAULT_SCOPES: &[&str] = &["contacts.write", "contacts.readonly"];

/// Redirect URI registered with the marketplace app at authorization time.
pub const HIGHLEVEL_DEFAULT_REDIRECT_URI: &str = "https://oauth.lovable.app/callback";

/// HighLevel (LeadConnector) OAuth 2.0 provider.
///
/// Sub-account ("Location") level app: every grant carries `user_type=Location`
/// and the response is scoped to a `locationId`.
/// Token lifetime: ~24 hours. Refresh tokens rotate on every use.
pub struct HighLevelProvider {
    token_url: String,
    http: reqwest::Client,
}

// Raw token response from the LeadConnector token endpoint
#[derive(Debug, Deserialize)]
struct HighLevelTokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    token_type: Option<String>,
    expires_in: Option<u64>,
    scope: Option<String>,
    #[serde(rename = "locationId")]
    location_id: Option<String>,
}

impl From<HighLevelTokenResponse> for TokenSet {
    fn from(r: HighLevelTokenResponse) -> Self {
        TokenSet {
            access_token: r.access_token,
            refresh_token: r.refresh_token,
            token_type: r.token_type,
            expires_in: r.expires_in,
            scope: r.scope,
            account_id: r.location_id,
        }
    }
}

impl HighLevelProvider {
    pub fn new() -> Self {
        Self::with_token_url(HIGHLEVEL_TOKEN_URL)
    }

    /// Point the provider at a different token endpoint (sandboxes, tests).
    pub fn with_token_url(token_url: impl Into<String>) -> Self {
        Self {
            token_url: token_url.into(),
            http: reqwest::Client::new(),
        }
    }
}

impl Default for HighLevelProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OAuthProvider for HighLevelProvider {
    fn id(&self) -> &str {
        "highlevel"
    }

    fn display_name(&self) -> &str {
        "HighLevel"
    }

    fn secret_prefix(&self) -> &str {
        "HIGHLEVEL"
    }

    fn default_redirect_uri(&self) -> &str {
        HIGHLEVEL_DEFAULT_REDIRECT_URI
    }

    fn default_scopes(&self) -> Vec<String> {
        HIGHLEVEL_DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
    }

    fn auth_url(&self, client_id: &str, scopes: &[String], redirect_uri: &str) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("response_type", "code")
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", &scopes.join(" "))
            .finish();
        format!("{HIGHLEVEL_AUTH_URL}?{query}")
    }

    async fn exchange_code(
        &self,
        client: &ClientCredentials,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenSet, AuthError> {
        let resp = self
            .http
            .post(&self.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("client_id", client.client_id.as_str()),
                ("client_secret", client.client_secret.as_str()),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("user_type", "Location"),
            ])
            .send()
            .await
            .map_err(|e| AuthError::ProviderError(format!("Token exchange request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::ProviderError(format!(
                "HighLevel token exchange failed ({status}): {body}"
            )));
        }

        let token_resp: HighLevelTokenResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::ProviderError(format!("Failed to parse token response: {e}")))?;

        Ok(token_resp.into())
    }

    async fn refresh_token(
        &self,
        client: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<TokenSet, AuthError> {
        let resp = self
            .http
            .post(&self.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("client_id", client.client_id.as_str()),
                ("client_secret", client.client_secret.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("user_type", "Location"),
                ("redirect_uri", client.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::RefreshFailed(format!("Refresh request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::RefreshRejected { status, body });
        }

        let token_resp: HighLevelTokenResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::RefreshFailed(format!("Failed to parse refresh response: {e}")))?;

        Ok(token_resp.into())
    }

    fn token_ttl(&self) -> Duration {
        Duration::from_secs(86_399)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Form, Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    type Captured = Arc<Mutex<Vec<HashMap<String, String>>>>;

    /// Serve a fixed response from an in-process token endpoint and record
    /// every form body it receives.
    async fn spawn_token_endpoint(status: StatusCode, body: serde_json::Value) -> (String, Captured) {
        let seen: Captured = Arc::new(Mutex::new(Vec::new()));
        let captured = seen.clone();

        let app = Router::new().route(
            "/oauth/token",
            post(move |Form(form): Form<HashMap<String, String>>| {
                let captured = captured.clone();
                let body = body.clone();
                async move {
                    captured.lock().unwrap().push(form);
                    (status, Json(body))
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}/oauth/token"), seen)
    }

    fn client() -> ClientCredentials {
        ClientCredentials {
            client_id: "cid".into(),
            client_secret: "shh".into(),
            redirect_uri: "https://example.test/callback".into(),
        }
    }

    #[test]
    fn test_auth_url_targets_location_chooser() {
        let provider = HighLevelProvider::new();
        let scopes = provider.default_scopes();
        let raw = provider.auth_url("cid", &scopes, "https://svc.test/v1/oauth/callback/highlevel");

        let url = url::Url::parse(&raw).unwrap();
        assert_eq!(url.host_str(), Some("marketplace.leadconnectorhq.com"));
        assert_eq!(url.path(), "/oauth/chooselocation");

        let query: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(query["response_type"], "code");
        assert_eq!(query["client_id"], "cid");
        assert_eq!(query["redirect_uri"], "https://svc.test/v1/oauth/callback/highlevel");
        assert_eq!(query["scope"], "contacts.write contacts.readonly");
    }

    #[tokio::test]
    async fn test_refresh_sends_form_encoded_grant() {
        let (url, seen) = spawn_token_endpoint(
            StatusCode::OK,
            json!({
                "access_token": "new",
                "refresh_token": "rt-2",
                "token_type": "Bearer",
                "expires_in": 86399,
                "scope": "contacts.write",
                "userType": "Location",
                "locationId": "loc-1"
            }),
        )
        .await;

        let provider = HighLevelProvider::with_token_url(url);
        let tokens = provider.refresh_token(&client(), "rt-1").await.unwrap();

        assert_eq!(tokens.access_token, "new");
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt-2"));
        assert_eq!(tokens.expires_in, Some(86399));
        assert_eq!(tokens.account_id.as_deref(), Some("loc-1"));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let form = &seen[0];
        assert_eq!(form["client_id"], "cid");
        assert_eq!(form["client_secret"], "shh");
        assert_eq!(form["grant_type"], "refresh_token");
        assert_eq!(form["refresh_token"], "rt-1");
        assert_eq!(form["user_type"], "Location");
        assert_eq!(form["redirect_uri"], "https://example.test/callback");
    }

    #[tokio::test]
    async fn test_refresh_non_success_is_rejected_with_body() {
        let (url, _seen) = spawn_token_endpoint(
            StatusCode::UNAUTHORIZED,
            json!({ "error": "invalid_grant" }),
        )
        .await;

        let provider = HighLevelProvider::with_token_url(url);
        let err = provider.refresh_token(&client(), "revoked").await.unwrap_err();

        match err {
            AuthError::RefreshRejected { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("invalid_grant"));
            }
            other => panic!("expected RefreshRejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_refresh_unparseable_body_is_failure() {
        let (url, _seen) = spawn_token_endpoint(StatusCode::OK, json!({ "unexpected": true })).await;

        let provider = HighLevelProvider::with_token_url(url);
        let err = provider.refresh_token(&client(), "rt-1").await.unwrap_err();
        assert!(matches!(err, AuthError::RefreshFailed(_)));
    }

    #[tokio::test]
    async fn test_exchange_code_uses_authorization_code_grant() {
        let (url, seen) = spawn_token_endpoint(
            StatusCode::OK,
            json!({
                "access_token": "at",
                "refresh_token": "rt",
                "expires_in": 3600,
                "locationId": "loc-9"
            }),
        )
        .await;

        let provider = HighLevelProvider::with_token_url(url);
        let tokens = provider
            .exchange_code(&client(), "auth-code", "https://svc/v1/oauth/callback/highlevel")
            .await
            .unwrap();

        assert_eq!(tokens.account_id.as_deref(), Some("loc-9"));

        let seen = seen.lock().unwrap();
        let form = &seen[0];
        assert_eq!(form["grant_type"], "authorization_code");
        assert_eq!(form["code"], "auth-code");
        assert_eq!(form["redirect_uri"], "https://svc/v1/oauth/callback/highlevel");
        assert_eq!(form["user_type"], "Location");
    }
}
