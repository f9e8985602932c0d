//! Client-secret credential for the OAuth2 client-credentials grant.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use url::Url;

use super::secure::{AccessToken, SecureString};
use crate::config::CredentialConfig;
use crate::error::AuthError;

/// HTTP request timeout.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// HTTP connection timeout.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Cached tokens are reused only while they have more than this left.
const REFRESH_BEFORE_EXPIRY_SECONDS: i64 = 300;

/// App-only identity built from a tenant, client id and client secret.
///
/// Construction makes no network call; the first [`get_token`] does.
///
/// [`get_token`]: ClientSecretCredential::get_token
pub struct ClientSecretCredential {
    client_id: String,
    client_secret: SecureString,
    token_endpoint: Url,
    http_client: reqwest::Client,
    cache: Mutex<HashMap<String, AccessToken>>,
}

impl ClientSecretCredential {
    /// Build a credential against `authority_host` (e.g. `https://login.microsoftonline.com`).
    pub fn new(config: &CredentialConfig, authority_host: &str) -> Result<Self, AuthError> {
        if !is_valid_tenant_id(&config.tenant_id) {
            return Err(AuthError::InvalidCredential(
                "tenant ID must contain only alphanumeric characters, '.' or '-'".to_string(),
            ));
        }
        if config.client_id.trim().is_empty() {
            return Err(AuthError::InvalidCredential(
                "client ID is empty".to_string(),
            ));
        }
        if config.client_secret.is_empty() {
            return Err(AuthError::InvalidCredential(
                "client secret is empty".to_string(),
            ));
        }

        let token_endpoint = Url::parse(&format!(
            "{}/{}/oauth2/v2.0/token",
            authority_host.trim_end_matches('/'),
            config.tenant_id
        ))
        .map_err(|e| AuthError::InvalidCredential(format!("authority host: {}", e)))?;

        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AuthError::InvalidCredential(e.to_string()))?;

        Ok(Self {
            client_id: config.client_id.clone(),
            client_secret: SecureString::new(config.client_secret.clone()),
            token_endpoint,
            http_client,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Return a currently valid token for `scopes`.
    ///
    /// A previously acquired token is reused while it is not about to expire;
    /// otherwise a new one is requested from the token endpoint.
    pub async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken, AuthError> {
        let scope = scopes.join(" ");
        let mut cache = self.cache.lock().await;

        if let Some(token) = cache.get(&scope) {
            if token.is_fresh(
                Utc::now(),
                chrono::Duration::seconds(REFRESH_BEFORE_EXPIRY_SECONDS),
            ) {
                debug!("Reusing cached token for {}", scope);
                return Ok(token.clone());
            }
        }

        let token = self.request_token(&scope).await?;
        cache.insert(scope, token.clone());
        Ok(token)
    }

    async fn request_token(&self, scope: &str) -> Result<AccessToken, AuthError> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope),
        ];

        debug!("Requesting app-only token for {}", scope);

        let response = self
            .http_client
            .post(self.token_endpoint.clone())
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::TokenRequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            // Log error details for debugging (doesn't expose to user)
            let body = response.text().await.unwrap_or_default();
            let description = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| e.error_description.unwrap_or(e.error))
                .unwrap_or(body);
            error!("Token request failed: HTTP {} - {}", status, description);
            return Err(AuthError::TokenRequestFailed(format!(
                "HTTP {}",
                status.as_u16()
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::TokenRequestFailed(e.to_string()))?;

        if !token_response.token_type.eq_ignore_ascii_case("bearer") {
            return Err(AuthError::UnsupportedTokenType(token_response.token_type));
        }

        let expires_at = expiry_from_now(token_response.expires_in)?;
        info!("Acquired app-only token, expires at {}", expires_at);

        Ok(AccessToken::new(token_response.access_token, expires_at))
    }
}

impl std::fmt::Debug for ClientSecretCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecretCredential")
            .field("client_id", &self.client_id)
            .field("token_endpoint", &self.token_endpoint.as_str())
            .finish_non_exhaustive()
    }
}

/// Token response from the Entra ID token endpoint.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
    expires_in: u64,
}

/// Error body returned by the token endpoint.
#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Absolute expiry for a token valid `expires_in` seconds from now.
fn expiry_from_now(expires_in: u64) -> Result<DateTime<Utc>, AuthError> {
    i64::try_from(expires_in)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
        .ok_or_else(|| {
            AuthError::TokenRequestFailed(format!("expires_in out of range: {}", expires_in))
        })
}

/// Tenant IDs are GUIDs or domain names.
fn is_valid_tenant_id(tenant_id: &str) -> bool {
    !tenant_id.is_empty()
        && tenant_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}
