//! Microsoft Graph API client for listing users.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Response;
use serde::de::DeserializeOwned;
use tracing::{debug, error};
use url::Url;
use uuid::Uuid;

use super::models::{UserPage, UserQuery};
use crate::auth::ClientSecretCredential;
use crate::error::ApiError;

/// HTTP request timeout.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// HTTP connection timeout.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Read access to a paged user collection.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Issue the initial listing request.
    async fn list_users(&self, query: &UserQuery) -> Result<UserPage, ApiError>;

    /// Fetch the page behind a continuation link returned by a previous page.
    async fn get_page(&self, next_link: &str) -> Result<UserPage, ApiError>;
}

/// Microsoft Graph API client authenticated with an app-only credential.
pub struct GraphClient {
    http_client: reqwest::Client,
    base_url: Url,
    credential: Arc<ClientSecretCredential>,
    scopes: Vec<String>,
}

impl GraphClient {
    /// Create a Graph client bound to `credential` and `scopes`.
    pub fn new(
        credential: Arc<ClientSecretCredential>,
        scopes: Vec<String>,
        base_url: &str,
    ) -> Result<Self, String> {
        if scopes.is_empty() {
            return Err("at least one scope is required".to_string());
        }

        // Joining relative paths needs the trailing slash.
        let base_url = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))
            .map_err(|e| format!("invalid Graph base URL: {}", e))?;

        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| format!("failed to create HTTP client: {}", e))?;

        Ok(Self {
            http_client,
            base_url,
            credential,
            scopes,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let scopes: Vec<&str> = self.scopes.iter().map(String::as_str).collect();
        let token = self.credential.get_token(&scopes).await?;
        let request_id = Uuid::new_v4();

        debug!(%request_id, "GET {}", url);

        let response = self
            .http_client
            .get(url)
            .query(query)
            .bearer_auth(token.secret())
            .header("client-request-id", request_id.to_string())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ApiError::GraphRequestFailed(e.to_string()))?;

        parse_response(response, request_id).await
    }
}

#[async_trait]
impl UserDirectory for GraphClient {
    async fn list_users(&self, query: &UserQuery) -> Result<UserPage, ApiError> {
        let url = self
            .base_url
            .join("users")
            .map_err(|e| ApiError::GraphRequestFailed(e.to_string()))?;

        self.get_json(url, &query.to_query_pairs()).await
    }

    async fn get_page(&self, next_link: &str) -> Result<UserPage, ApiError> {
        // The link already carries every query option, including the skip token.
        let url = Url::parse(next_link)
            .map_err(|e| ApiError::GraphRequestFailed(format!("invalid next link: {}", e)))?;

        self.get_json(url, &[]).await
    }
}

async fn parse_response<T: DeserializeOwned>(
    response: Response,
    request_id: Uuid,
) -> Result<T, ApiError> {
    let status = response.status();
    match status.as_u16() {
        200 => response
            .json()
            .await
            .map_err(|e| ApiError::ParseFailed(e.to_string())),
        401 => Err(ApiError::Unauthorized),
        403 => Err(ApiError::Forbidden),
        429 => Err(ApiError::RateLimited),
        status => {
            let body = response.text().await.unwrap_or_default();
            error!(%request_id, "Graph request failed: HTTP {} - {}", status, body);
            Err(ApiError::GraphRequestFailed(format!("HTTP {}", status)))
        }
    }
}
