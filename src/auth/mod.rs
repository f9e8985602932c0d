//! Entra ID authentication module.
//!
//! Provides the OAuth2 client-credentials identity and zeroizing token types.

pub mod credential;
pub mod secure;

pub use credential::ClientSecretCredential;
pub use secure::AccessToken;
