//! Stale-user selection rule.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::config::ReportConfig;
use crate::graph::User;

/// Status written for users Graph has no sign-in time for.
///
/// Graph only retains sign-in activity from April 2020 onwards.
pub const NO_SIGN_IN: &str = "NO SIGN IN OR LAST SIGN IN BEFORE April 2020";

/// Mail column placeholder for users without an address.
pub const NO_EMAIL: &str = "NO EMAIL";

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputRow {
    pub display_name: String,
    pub mail: String,
    pub status: String,
}

/// Decides which users are reported and with what status.
#[derive(Debug, Clone)]
pub struct StaleUserFilter<C: Clock> {
    target_domain: String,
    stale_after: Duration,
    clock: C,
}

impl<C: Clock> StaleUserFilter<C> {
    pub fn new(report: &ReportConfig, clock: C) -> Self {
        Self {
            target_domain: report.target_domain.clone(),
            stale_after: Duration::days(report.stale_after_days),
            clock,
        }
    }

    /// Row for `user` if it belongs to the target domain and is stale.
    ///
    /// The cutoff is taken from the clock on every call.
    pub fn evaluate(&self, user: &User) -> Option<OutputRow> {
        if user.mail_domain() != Some(self.target_domain.as_str()) {
            return None;
        }

        let status = match user.last_sign_in() {
            // No signInActivity object and no lastSignInDateTime both mean
            // "never signed in" and are reported alike.
            None => NO_SIGN_IN.to_string(),
            Some(last) if last < self.cutoff() => last.to_string(),
            Some(_) => return None,
        };

        Some(OutputRow {
            display_name: user.display_name.clone().unwrap_or_default(),
            mail: mail_or_placeholder(user),
            status,
        })
    }

    /// Users who last signed in before this instant are stale.
    pub fn cutoff(&self) -> DateTime<Utc> {
        self.clock.now() - self.stale_after
    }
}

/// Mail address, or [`NO_EMAIL`] when absent.
///
/// Unreachable from [`StaleUserFilter::evaluate`], which already requires a
/// matching address.
pub fn mail_or_placeholder(user: &User) -> String {
    user.mail.clone().unwrap_or_else(|| NO_EMAIL.to_string())
}
