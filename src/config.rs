//! Run configuration.
//!
//! A [`HarvestConfig`] is read once at startup (from YAML when `--config`
//! is given, otherwise the built-in defaults) and passed by reference to
//! every pipeline. Defaults reproduce a crawl of the Wiley Online Library
//! search for two subject filters.
//!
//! ```yaml
//! subjects:
//!   - { name: accounting, filter_id: 87 }
//! keywords_file: data/keywords.csv
//! page_size: 100
//! delay: { min_ms: 2000, max_ms: 4000 }
//! proxy: { url: "http://proxy.local:8080", username: user, password: pass }
//! ```

use crate::error::HarvestError;
use crate::extract::ExtractionRule;
use crate::models::DateRange;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};

/// The search endpoint and its fixed query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Origin that relative result links are resolved against.
    pub base_url: String,
    pub search_path: String,
    pub pub_type: String,
    pub content: String,
    pub search_field: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://onlinelibrary.wiley.com".into(),
            search_path: "/action/doSearch".into(),
            pub_type: "journal".into(),
            content: "articlesChapters".into(),
            search_field: "AllField".into(),
        }
    }
}

/// A named subject filter (the site's numeric category id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub name: String,
    pub filter_id: u32,
}

/// Bounds of the randomized pause taken after every processed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayConfig {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            min_ms: 2000,
            max_ms: 4000,
        }
    }
}

/// Bounded exponential backoff for a single page load.
///
/// `max_retries: 0` means a failed page is given up on immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Selectors used on search result pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRule {
    /// Element whose text holds the total result count ("1,234").
    pub count_selector: String,
    /// Element that must be present before a result page is read.
    pub ready_selector: String,
    pub links: ExtractionRule,
}

impl Default for SearchRule {
    fn default() -> Self {
        Self {
            count_selector: "span.result__count".into(),
            ready_selector: "span.result__count".into(),
            links: ExtractionRule::default(),
        }
    }
}

/// Selectors used on article and author-profile pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticleRule {
    /// Gate for a loaded article page. Structural, so that a missing field
    /// such as the title degrades to `N/A` instead of failing the entry.
    pub ready_selector: String,
    pub title: String,
    pub journal: String,
    pub doi: String,
    pub publication_date: String,
    /// One element per listed author.
    pub author_row: String,
    /// Author name, relative to an author row.
    pub author_name: String,
    /// Profile link (its `href`), relative to an author row.
    pub author_profile: String,
    /// Per-author contribution statement, relative to an author row.
    pub author_contributions: String,
    /// Article-level contribution statement, used when a row has none.
    pub contributions: String,
    pub abstract_text: String,
    /// Author name elements for the abstract variant.
    pub author_names: String,
    /// Email on an author's profile page (its `href`, `mailto:` stripped).
    pub profile_email: String,
}

impl Default for ArticleRule {
    fn default() -> Self {
        Self {
            ready_selector: "body".into(),
            title: "h1.citation__title".into(),
            journal: "a.journal-banner-text".into(),
            doi: "a.epub-doi".into(),
            publication_date: "span.epub-date".into(),
            author_row: "div.accordion-tabbed__tab-mobile".into(),
            author_name: "a.author-name span".into(),
            author_profile: "a.author-name".into(),
            author_contributions: "div.author-info p.author-contribution".into(),
            contributions: "section#author-contributions p".into(),
            abstract_text: ".article-section__content p".into(),
            author_names: ".authors-list span.name".into(),
            profile_email: "a[href^='mailto:']".into(),
        }
    }
}

fn default_subjects() -> Vec<Subject> {
    vec![
        Subject {
            name: "accounting".into(),
            filter_id: 87,
        },
        Subject {
            name: "business_and_management".into(),
            filter_id: 41,
        },
    ]
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36"
        .into()
}

/// Complete configuration for a harvest run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub site: SiteConfig,
    pub subjects: Vec<Subject>,
    pub keywords: Vec<String>,
    pub keywords_file: Option<PathBuf>,
    pub date_range: Option<DateRange>,
    pub page_size: u32,
    pub timeout_ms: u64,
    pub delay: DelayConfig,
    pub retry: RetryConfig,
    pub proxy: Option<ProxyConfig>,
    pub user_agent: String,
    pub search_rule: SearchRule,
    pub article_rule: ArticleRule,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            subjects: default_subjects(),
            keywords: Vec::new(),
            keywords_file: None,
            date_range: Some(DateRange::default()),
            page_size: 100,
            timeout_ms: 30_000,
            delay: DelayConfig::default(),
            retry: RetryConfig::default(),
            proxy: None,
            user_agent: default_user_agent(),
            search_rule: SearchRule::default(),
            article_rule: ArticleRule::default(),
        }
    }
}

impl HarvestConfig {
    /// Load from a YAML file, or use defaults when `path` is `None`.
    ///
    /// The result is validated before it is returned.
    #[instrument(level = "info", skip_all, fields(path = ?path))]
    pub async fn load(path: Option<&Path>) -> Result<Self, HarvestError> {
        let config = match path {
            Some(path) => {
                let raw = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| HarvestError::io(path, e))?;
                let parsed: HarvestConfig = serde_yaml::from_str(&raw)?;
                info!("Loaded configuration file");
                parsed
            }
            None => {
                info!("No configuration file given; using defaults");
                HarvestConfig::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), HarvestError> {
        if self.page_size == 0 {
            return Err(HarvestError::Config("page_size must be greater than 0".into()));
        }
        if self.timeout_ms == 0 {
            return Err(HarvestError::Config("timeout_ms must be greater than 0".into()));
        }
        if self.delay.min_ms > self.delay.max_ms {
            return Err(HarvestError::Config(format!(
                "delay.min_ms ({}) exceeds delay.max_ms ({})",
                self.delay.min_ms, self.delay.max_ms
            )));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(HarvestError::Config(
                "retry.base_delay_ms exceeds retry.max_delay_ms".into(),
            ));
        }
        if let Some(range) = &self.date_range {
            range.validate()?;
        }
        url::Url::parse(&self.site.base_url)
            .map_err(|e| HarvestError::Config(format!("site.base_url: {e}")))?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
