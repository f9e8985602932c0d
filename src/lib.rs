//! Stale user export for Microsoft Entra ID.
//!
//! Lists every user through Microsoft Graph with an app-only token, keeps the
//! ones in the organization's mail domain that have not signed in for 180
//! days, and writes them to `stale_users_SAML.csv`.

#![deny(clippy::all)]

pub mod auth;
pub mod config;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod report;
