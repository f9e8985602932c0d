//! Error types for the stale-users export.
//!
//! Uses `thiserror` for library-style errors with automatic `Display` and `Error` implementations.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error type.
///
/// Each variant names the pipeline step that failed. None of them are retried.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to construct credential: {0}")]
    Credential(#[source] AuthError),

    #[error("Failed to construct Graph client: {0}")]
    Adapter(String),

    #[error("Failed to acquire token: {0}")]
    Token(#[source] AuthError),

    #[error("Error getting users: {0}")]
    Query(#[source] ApiError),

    #[error("Error iterating user pages: {0}")]
    PageIteration(#[source] ApiError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

/// Authentication-related errors.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Token request failed: {0}")]
    TokenRequestFailed(String),

    #[error("Unsupported token type: {0}")]
    UnsupportedTokenType(String),
}

/// Graph API errors.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Graph API request failed: {0}")]
    GraphRequestFailed(String),

    #[error("Failed to parse API response: {0}")]
    ParseFailed(String),

    #[error("Unauthorized (401): Token may be expired")]
    Unauthorized,

    #[error("Forbidden (403): Insufficient permissions")]
    Forbidden,

    #[error("Rate limited (429): Too many requests")]
    RateLimited,

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// CSV export errors.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to create {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write row: {0}")]
    Write(#[from] csv::Error),

    #[error("Failed to flush output: {0}")]
    Flush(#[source] std::io::Error),
}

impl AppError {
    /// Returns a short hint printed alongside the error before exiting.
    pub fn user_message(&self) -> &str {
        match self {
            Self::Credential(_) => {
                "Check the TENANT_ID, CLIENT_ID and CLIENT_SECRET environment variables."
            }
            Self::Adapter(_) => "Could not set up the HTTP client.",
            Self::Token(_) => "Token request rejected. Verify the app registration and secret.",
            Self::Query(ApiError::Forbidden) | Self::PageIteration(ApiError::Forbidden) => {
                "The app needs User.Read.All and AuditLog.Read.All application permissions."
            }
            Self::Query(ApiError::RateLimited) | Self::PageIteration(ApiError::RateLimited) => {
                "Too many requests. Please wait a moment and run again."
            }
            Self::Query(_) | Self::PageIteration(_) => "Listing users failed.",
            Self::Export(_) => "Could not write the CSV report.",
        }
    }

    /// Returns true if the failure happened before any data was requested.
    pub fn is_setup_failure(&self) -> bool {
        matches!(
            self,
            Self::Credential(_) | Self::Adapter(_) | Self::Export(ExportError::Create { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        let err = AppError::Query(ApiError::Forbidden);
        assert_eq!(
            err.user_message(),
            "The app needs User.Read.All and AuditLog.Read.All application permissions."
        );

        let err = AppError::PageIteration(ApiError::Unauthorized);
        assert_eq!(err.user_message(), "Listing users failed.");
    }

    #[test]
    fn test_setup_failure() {
        let err = AppError::Credential(AuthError::InvalidCredential("tenant".into()));
        assert!(err.is_setup_failure());

        let err = AppError::Export(ExportError::Create {
            path: PathBuf::from("out.csv"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        });
        assert!(err.is_setup_failure());

        let err = AppError::Token(AuthError::TokenRequestFailed("HTTP 401".into()));
        assert!(!err.is_setup_failure());
    }

    #[test]
    fn test_display_names_step() {
        let err = AppError::Query(ApiError::GraphRequestFailed("HTTP 500".into()));
        assert_eq!(
            err.to_string(),
            "Error getting users: Graph API request failed: HTTP 500"
        );
    }
}
