//! Microsoft Graph user directory.
//!
//! This module provides:
//! - The typed `/users` collection models
//! - An authenticated Graph client behind the `UserDirectory` seam
//! - A pull-based pager that follows `@odata.nextLink`

pub mod client;
pub mod models;
pub mod pager;

pub use client::{GraphClient, UserDirectory};
pub use models::{SignInActivity, User, UserPage, UserQuery};
pub use pager::UserPager;
