//! Data models shared by the link and article pipelines.
//!
//! - [`SearchQuery`] / [`DateRange`]: one (subject, keyword) search, able to
//!   derive the URL of any result page
//! - [`LinkSet`]: the deduplicated accumulator of discovered result URLs
//! - [`ResultPage`]: what one fetched result page contributed
//! - [`UrlEntry`]: one line of a resumable input list
//! - [`ArticleRecord`] / [`Author`] / [`AbstractSnapshot`]: extracted article data
//! - [`Field`]: a per-field extraction outcome, either a value or unavailable

use crate::config::SiteConfig;
use crate::error::HarvestError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use url::Url;

/// Rendering of [`Field::Unavailable`] in delimited outputs.
pub const NOT_AVAILABLE: &str = "N/A";

/// Publication window filter applied to a search.
///
/// `before_*` bounds are optional; when absent the corresponding URL
/// parameters are sent empty, which the search endpoint reads as "no upper
/// bound".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub after_year: i32,
    pub after_month: u32,
    #[serde(default)]
    pub before_year: Option<i32>,
    #[serde(default)]
    pub before_month: Option<u32>,
}

impl Default for DateRange {
    fn default() -> Self {
        Self {
            after_year: 2015,
            after_month: 1,
            before_year: None,
            before_month: None,
        }
    }
}

impl DateRange {
    /// Check month bounds and that the window is not inverted.
    pub fn validate(&self) -> Result<(), HarvestError> {
        let after = chrono::NaiveDate::from_ymd_opt(self.after_year, self.after_month, 1)
            .ok_or_else(|| {
                HarvestError::Config(format!(
                    "date_range after {}-{} is not a valid month",
                    self.after_year, self.after_month
                ))
            })?;

        if let Some(month) = self.before_month {
            if !(1..=12).contains(&month) {
                return Err(HarvestError::Config(format!(
                    "date_range before_month {month} is not in 1..=12"
                )));
            }
        }

        if let Some(year) = self.before_year {
            let month = self.before_month.unwrap_or(12);
            let before = chrono::NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
                HarvestError::Config(format!("date_range before {year}-{month} is not valid"))
            })?;
            if before < after {
                return Err(HarvestError::Config(format!(
                    "date_range ends ({before}) before it starts ({after})"
                )));
            }
        }
        Ok(())
    }
}

/// One search against the publisher, fixed for the whole pagination run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub keyword: String,
    pub subject_filter_id: u32,
    pub date_range: Option<DateRange>,
    pub page_size: u32,
}

impl SearchQuery {
    pub fn new(
        keyword: impl Into<String>,
        subject_filter_id: u32,
        date_range: Option<DateRange>,
        page_size: u32,
    ) -> Result<Self, HarvestError> {
        if page_size == 0 {
            return Err(HarvestError::Config("page_size must be greater than 0".into()));
        }
        Ok(Self {
            keyword: keyword.into(),
            subject_filter_id,
            date_range,
            page_size,
        })
    }

    /// Build the URL of result page `page` (1-based).
    ///
    /// Parameters are form-encoded, so spaces in the keyword become `+`.
    pub fn page_url(&self, site: &SiteConfig, page: u32) -> Result<Url, HarvestError> {
        let mut url = Url::parse(&site.base_url)
            .and_then(|base| base.join(&site.search_path))
            .map_err(|e| HarvestError::Config(format!("bad search endpoint: {e}")))?;

        let (after_month, after_year, before_month, before_year) = match &self.date_range {
            Some(range) => (
                range.after_month.to_string(),
                range.after_year.to_string(),
                range.before_month.map(|m| m.to_string()).unwrap_or_default(),
                range.before_year.map(|y| y.to_string()).unwrap_or_default(),
            ),
            None => Default::default(),
        };

        url.query_pairs_mut()
            .clear()
            .append_pair("AfterMonth", &after_month)
            .append_pair("AfterYear", &after_year)
            .append_pair("BeforeMonth", &before_month)
            .append_pair("BeforeYear", &before_year)
            .append_pair("ConceptID", &self.subject_filter_id.to_string())
            .append_pair("PubType", &site.pub_type)
            .append_pair("field1", &site.search_field)
            .append_pair("text1", &self.keyword)
            .append_pair("publication", "")
            .append_pair("content", &site.content)
            .append_pair("pageSize", &self.page_size.to_string())
            .append_pair("startPage", &page.to_string());

        Ok(url)
    }
}

/// Deduplicated set of absolute result URLs.
///
/// Membership only grows. Iteration yields URLs in first-seen order so the
/// written output is stable between runs over the same pages.
#[derive(Debug, Clone, Default)]
pub struct LinkSet {
    seen: HashSet<String>,
    order: Vec<String>,
}

impl LinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one URL, returning `true` if it was not already present.
    pub fn insert(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.seen.contains(&url) {
            return false;
        }
        self.seen.insert(url.clone());
        self.order.push(url);
        true
    }

    /// Union a batch of URLs into the set, returning how many were new.
    pub fn extend_counting<I, S>(&mut self, urls: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = 0;
        for url in urls {
            if self.insert(url) {
                added += 1;
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

/// What a single result page contributed to a pagination run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultPage {
    pub index: u32,
    pub extracted_links: Vec<String>,
    pub total_result_count: Option<u64>,
}

/// One record of a resumable input list (`label;url[;doneFlag]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlEntry {
    /// The line exactly as read (without its line terminator). Used to find
    /// the line again when marking it processed.
    pub raw_line: String,
    pub label: String,
    pub url: String,
    pub processed: bool,
}

/// Outcome of extracting a single field from a page.
///
/// Serializes as the bare string or `null`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum Field {
    Available(String),
    #[default]
    Unavailable,
}

impl Field {
    /// Wrap an optional extraction result, treating blank text as missing.
    pub fn from_text(text: Option<String>) -> Self {
        match text {
            Some(t) if !t.trim().is_empty() => Field::Available(t.trim().to_string()),
            _ => Field::Unavailable,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Field::Available(_))
    }

    pub fn as_deref(&self) -> Option<&str> {
        match self {
            Field::Available(v) => Some(v),
            Field::Unavailable => None,
        }
    }

    /// Fall back to `other` when this field is unavailable.
    pub fn or(self, other: Field) -> Field {
        match self {
            Field::Available(_) => self,
            Field::Unavailable => other,
        }
    }
}

impl From<Option<String>> for Field {
    fn from(value: Option<String>) -> Self {
        Field::from_text(value)
    }
}

impl From<Field> for Option<String> {
    fn from(value: Field) -> Self {
        match value {
            Field::Available(v) => Some(v),
            Field::Unavailable => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_deref().unwrap_or(NOT_AVAILABLE))
    }
}

/// An author as listed on an article page, optionally enriched from their
/// profile page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Author {
    pub name: Field,
    pub profile_url: Field,
    pub email: Field,
    pub contributions: Field,
}

/// Bibliographic metadata for one article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: Field,
    pub journal: Field,
    pub doi: Field,
    pub publication_date: Field,
    pub authors: Vec<Author>,
    pub source_url: String,
}

/// Per-article JSON snapshot written by the abstract variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbstractSnapshot {
    pub url: String,
    pub title: Field,
    pub authors: Field,
    #[serde(rename = "abstract")]
    pub abstract_text: Field,
}
