//! Microsoft Graph user collection models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Properties requested for every user.
pub const USER_SELECT: [&str; 4] = ["displayName", "id", "mail", "signInActivity"];

/// User from the Microsoft Graph `/users` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier for the user.
    #[serde(default)]
    pub id: String,

    /// User's display name.
    pub display_name: Option<String>,

    /// User's primary SMTP address.
    pub mail: Option<String>,

    /// Sign-in activity. Only returned when explicitly selected and the app
    /// holds `AuditLog.Read.All`.
    pub sign_in_activity: Option<SignInActivity>,
}

impl User {
    /// Last `@`-separated segment of the mail address.
    ///
    /// An address without `@` yields the whole address.
    pub fn mail_domain(&self) -> Option<&str> {
        self.mail.as_deref().and_then(|mail| mail.rsplit('@').next())
    }

    /// Last interactive sign-in, if Graph recorded one.
    pub fn last_sign_in(&self) -> Option<DateTime<Utc>> {
        self.sign_in_activity
            .as_ref()
            .and_then(|activity| activity.last_sign_in_date_time)
    }
}

/// Sign-in activity sub-object of a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInActivity {
    pub last_sign_in_date_time: Option<DateTime<Utc>>,
}

/// One page of the user collection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPage {
    #[serde(default)]
    pub value: Vec<User>,

    /// Absolute URL of the next page; absent on the last page.
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// OData query options for listing users.
#[derive(Debug, Clone, PartialEq)]
pub struct UserQuery {
    pub select: Vec<String>,
    pub order_by: Vec<String>,
}

impl UserQuery {
    /// Select only the reported properties, sorted by display name.
    pub fn stale_users() -> Self {
        Self {
            select: USER_SELECT.iter().map(|s| s.to_string()).collect(),
            order_by: vec!["displayName".to_string()],
        }
    }

    /// Query-string pairs in OData syntax. Empty options are omitted.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if !self.select.is_empty() {
            pairs.push(("$select", self.select.join(",")));
        }
        if !self.order_by.is_empty() {
            pairs.push(("$orderby", self.order_by.join(",")));
        }
        pairs
    }
}
