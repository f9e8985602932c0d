//! Pull-based iteration over a paged user collection.

use tracing::debug;

use super::client::UserDirectory;
use super::models::{User, UserPage};
use crate::error::ApiError;

/// Yields every user of a collection, fetching follow-up pages on demand.
///
/// Finite and single-pass: once `next_user` returns `Ok(None)` the pager is
/// exhausted. An error leaves the pager in an unspecified position.
pub struct UserPager<'a, D: UserDirectory + ?Sized> {
    directory: &'a D,
    current: std::vec::IntoIter<User>,
    next_link: Option<String>,
    pages_fetched: usize,
}

impl<'a, D: UserDirectory + ?Sized> UserPager<'a, D> {
    /// Start iterating from the response to the initial listing request.
    pub fn new(directory: &'a D, first_page: UserPage) -> Self {
        Self {
            directory,
            current: first_page.value.into_iter(),
            next_link: first_page.next_link,
            pages_fetched: 1,
        }
    }

    /// Next user in collection order, or `None` when no pages remain.
    pub async fn next_user(&mut self) -> Result<Option<User>, ApiError> {
        loop {
            if let Some(user) = self.current.next() {
                return Ok(Some(user));
            }

            let Some(link) = self.next_link.take() else {
                return Ok(None);
            };

            let page = self.directory.get_page(&link).await?;
            self.pages_fetched += 1;
            debug!(
                "Fetched page {} with {} users",
                self.pages_fetched,
                page.value.len()
            );

            self.current = page.value.into_iter();
            self.next_link = page.next_link;
        }
    }

    /// Number of pages retrieved so far, including the first.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }
}
