//! The page fetcher capability.
//!
//! Everything above this module talks to the target site only through
//! [`PageFetcher`]: navigate, wait for an element, read text or attributes,
//! and open a short-lived auxiliary page. Pipelines are generic over the
//! trait so they run unchanged against the HTTP implementation
//! ([`http::HttpPageFetcher`]) and against the scripted double used in tests.
//!
//! # Extraction targets
//!
//! Extraction reads either an element's normalized text or one of its
//! attributes, see [`Target`]. Whitespace runs in text are collapsed to a
//! single space and the result is trimmed.

pub mod dom;
pub mod http;
#[cfg(test)]
pub mod scripted;

use crate::error::FetchError;
use std::time::Duration;

/// What to read from a matched element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    Text,
    Attr(&'a str),
}

/// A headless page session.
///
/// One instance holds at most one loaded page. A failed navigation leaves
/// no page loaded, so later extraction calls return [`FetchError::NoPage`].
pub trait PageFetcher {
    /// The type of page returned by [`PageFetcher::open_auxiliary`].
    type Auxiliary: PageFetcher;

    /// Load `url`, giving up after `timeout`.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), FetchError>;

    /// Wait until `selector` matches at least one element of the loaded page.
    ///
    /// Implementations without script execution see the final document on
    /// navigation and may check once, returning
    /// [`FetchError::SelectorNotFound`] without waiting out `timeout`. Content
    /// that a site renders client-side is never matched by such a fetcher.
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), FetchError>;

    /// Final URL of the loaded page, after redirects.
    fn current_url(&self) -> Option<&str>;

    /// Read the first element matching `selector`. `Ok(None)` when nothing matches.
    async fn extract_one(
        &self,
        selector: &str,
        target: Target<'_>,
    ) -> Result<Option<String>, FetchError>;

    /// For every element matching `row_selector`, read the first match of
    /// `inner_selector` inside it (or the row itself when `None`). Rows
    /// without a match, or with an empty value, are skipped. Order follows
    /// the document.
    async fn extract_all(
        &self,
        row_selector: &str,
        inner_selector: Option<&str>,
        target: Target<'_>,
    ) -> Result<Vec<String>, FetchError>;

    /// For every element matching `row_selector`, read each of `fields`
    /// relative to that row. Rows are never skipped, so columns stay aligned.
    async fn extract_rows(
        &self,
        row_selector: &str,
        fields: &[(&str, Target<'_>)],
    ) -> Result<Vec<Vec<Option<String>>>, FetchError>;

    /// Open a second page sharing this session (cookies, proxy, identity).
    async fn open_auxiliary(&self) -> Result<Self::Auxiliary, FetchError>;

    /// Release the page.
    async fn close(self)
    where
        Self: Sized;

    /// Convenience for [`PageFetcher::extract_one`] with [`Target::Text`].
    async fn extract_text(&self, selector: &str) -> Result<Option<String>, FetchError> {
        self.extract_one(selector, Target::Text).await
    }
}
