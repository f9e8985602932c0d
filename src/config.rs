//! Configuration loading.
//!
//! Credentials come from the process environment only; everything else is a
//! compiled-in default.

use std::env;
use std::path::PathBuf;

/// Base URL for Microsoft Graph API.
pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Entra ID authority host.
pub const AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// App-only scope covering every Graph permission granted to the app registration.
pub const GRAPH_DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Organizational mail domain whose users are reported.
pub const TARGET_DOMAIN: &str = "acu.edu";

/// Users whose last sign-in is older than this many days are reported.
pub const STALE_AFTER_DAYS: i64 = 180;

/// Report file, relative to the working directory.
pub const OUTPUT_FILE: &str = "stale_users_SAML.csv";

/// Root configuration structure.
#[derive(Debug, Clone)]
pub struct Config {
    pub credential: CredentialConfig,
    pub api: ApiConfig,
    pub report: ReportConfig,
}

/// Client-credentials secrets. `Debug` never prints the secret.
#[derive(Clone)]
pub struct CredentialConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub graph_base_url: String,
    pub authority_host: String,
    pub scope: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            graph_base_url: GRAPH_BASE_URL.to_string(),
            authority_host: AUTHORITY_HOST.to_string(),
            scope: GRAPH_DEFAULT_SCOPE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub target_domain: String,
    pub stale_after_days: i64,
    pub output_path: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            target_domain: TARGET_DOMAIN.to_string(),
            stale_after_days: STALE_AFTER_DAYS,
            output_path: PathBuf::from(OUTPUT_FILE),
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Unset variables read as empty strings. They are not validated here; the
    /// credential rejects them when it is built.
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).unwrap_or_default();

        Self {
            credential: CredentialConfig {
                tenant_id: var("TENANT_ID"),
                client_id: var("CLIENT_ID"),
                client_secret: var("CLIENT_SECRET"),
            },
            api: ApiConfig::default(),
            report: ReportConfig::default(),
        }
    }

    /// Get the token URL for the configured tenant.
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.api.authority_host.trim_end_matches('/'),
            self.credential.tenant_id
        )
    }
}
