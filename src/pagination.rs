//! Pagination-and-dedup engine for search results.
//!
//! Given a [`SearchQuery`], walk the result pages and accumulate every result
//! link into a [`LinkSet`], fetching as few pages as possible:
//!
//! 1. Load page 1 and read the total result count ("1,234" → 1234). An
//!    unreadable count, or one below 1, is treated as exactly one page.
//! 2. `max_pages = ceil(total / page_size)`.
//! 3. Extract page 1's links, then for pages `2..=max_pages`: load, extract,
//!    union. A page that adds nothing new ends the walk, since the site
//!    repeats its tail rather than running out.
//! 4. A page that fails to load ends the walk; links gathered so far are
//!    kept. Only a failure on page 1 is reported as an error.
//!
//! Nothing is persisted here.

use crate::config::{SearchRule, SiteConfig};
use crate::error::HarvestError;
use crate::fetcher::PageFetcher;
use crate::models::{LinkSet, ResultPage, SearchQuery};
use crate::throttle::RetryPolicy;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

static LEADING_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d[\d,]*)").expect("static regex"));

/// Parse a free-text result counter such as `"1,234"` or `"1,234 results"`.
pub fn parse_total_count(text: &str) -> Result<u64, HarvestError> {
    LEADING_COUNT
        .captures(text)
        .and_then(|c| c[1].replace(',', "").parse::<u64>().ok())
        .ok_or_else(|| HarvestError::ParseFailure {
            field: "total result count",
            value: text.to_string(),
        })
}

/// Number of pages needed for `total` results at `page_size` per page.
pub fn max_pages(total: u64, page_size: u32) -> u32 {
    let page_size = u64::from(page_size.max(1));
    u32::try_from(total.div_ceil(page_size)).unwrap_or(u32::MAX)
}

/// Why the walk ended.
#[derive(Debug)]
pub enum StopReason {
    /// Every page up to `max_pages` was visited.
    Exhausted,
    /// The given page contributed no new links.
    NoNewLinks { page: u32 },
    /// The given page could not be loaded.
    FetchFailed { page: u32, error: HarvestError },
}

/// Result of one pagination run.
#[derive(Debug)]
pub struct Collected {
    pub links: LinkSet,
    pub pages_visited: u32,
    pub max_pages: u32,
    pub total_results: Option<u64>,
    pub stop: StopReason,
}

/// Walks result pages for one query at a time.
#[derive(Debug, Clone)]
pub struct Paginator<'a> {
    site: &'a SiteConfig,
    rule: &'a SearchRule,
    base: Url,
    retry: RetryPolicy,
    timeout: Duration,
}

impl<'a> Paginator<'a> {
    pub fn new(
        site: &'a SiteConfig,
        rule: &'a SearchRule,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self, HarvestError> {
        let base = Url::parse(&site.base_url)
            .map_err(|e| HarvestError::Config(format!("site.base_url: {e}")))?;
        Ok(Self {
            site,
            rule,
            base,
            retry,
            timeout,
        })
    }

    /// Load result page `index` and read its links (and, on page 1, the
    /// result counter).
    async fn fetch_page<F: PageFetcher>(
        &self,
        fetcher: &mut F,
        query: &SearchQuery,
        index: u32,
    ) -> Result<ResultPage, HarvestError> {
        let url = query.page_url(self.site, index)?;
        debug!(page = index, %url, "Fetching result page");

        self.retry
            .load_page(
                fetcher,
                url.as_str(),
                &[self.rule.ready_selector.as_str()],
                self.timeout,
            )
            .await?;

        let total_result_count = if index == 1 {
            match fetcher.extract_text(&self.rule.count_selector).await {
                Ok(Some(text)) => match parse_total_count(&text) {
                    Ok(n) => Some(n),
                    Err(e) => {
                        warn!(error = %e, "Result count unreadable");
                        None
                    }
                },
                Ok(None) => {
                    warn!(selector = %self.rule.count_selector, "Result count element missing");
                    None
                }
                Err(e) => {
                    warn!(error = %e, "Result count extraction failed");
                    None
                }
            }
        } else {
            None
        };

        let extracted_links = match self.rule.links.extract(fetcher, &self.base).await {
            Ok(out) => {
                if out.used_fallback && !out.links.is_empty() {
                    info!(
                        page = index,
                        count = out.links.len(),
                        "Row extraction empty; used fallback selector"
                    );
                }
                out.links
            }
            Err(e) => {
                error!(page = index, error = %e, "Link extraction failed");
                Vec::new()
            }
        };

        Ok(ResultPage {
            index,
            extracted_links,
            total_result_count,
        })
    }

    /// Collect the deduplicated result links for `query`.
    ///
    /// Returns an error only when page 1 cannot be loaded.
    #[instrument(
        level = "info",
        skip_all,
        fields(keyword = %query.keyword, filter = query.subject_filter_id)
    )]
    pub async fn collect<F: PageFetcher>(
        &self,
        fetcher: &mut F,
        query: &SearchQuery,
    ) -> Result<Collected, HarvestError> {
        let first = self.fetch_page(fetcher, query, 1).await?;

        let total = match first.total_result_count {
            Some(n) if n >= 1 => n,
            _ => {
                warn!(page_size = query.page_size, "Treating result set as a single page");
                u64::from(query.page_size)
            }
        };
        let max_pages = max_pages(total, query.page_size);
        info!(total, page_size = query.page_size, max_pages, "Computed page budget");

        let mut links = LinkSet::new();
        let added = links.extend_counting(first.extracted_links);
        info!(page = 1, added, total_links = links.len(), "Extracted page");
        let mut pages_visited = 1;
        let mut stop = StopReason::Exhausted;

        for index in 2..=max_pages {
            let page = match self.fetch_page(fetcher, query, index).await {
                Ok(page) => page,
                Err(e) => {
                    error!(page = index, max_pages, error = %e, "Page failed; stopping this query");
                    stop = StopReason::FetchFailed { page: index, error: e };
                    break;
                }
            };
            pages_visited += 1;

            let extracted = page.extracted_links.len();
            let grew_by = links.extend_counting(page.extracted_links);
            info!(
                page = page.index,
                max_pages,
                extracted,
                grew_by,
                total_links = links.len(),
                "Extracted page"
            );

            if grew_by == 0 {
                info!(page = index, "No new links; stopping early");
                stop = StopReason::NoNewLinks { page: index };
                break;
            }
        }

        Ok(Collected {
            links,
            pages_visited,
            max_pages,
            total_results: first.total_result_count,
            stop,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::fetcher::scripted::{Scripted, ScriptedFetcher};

    fn results_page(count: &str, dois: &[&str]) -> String {
        let items: String = dois
            .iter()
            .map(|d| format!(r#"<li class="search__item"><a href="/doi/{d}">{d}</a></li>"#))
            .collect();
        format!(
            r#"<html><body><span class="result__count">{count}</span><ul>{items}</ul></body></html>"#
        )
    }

    fn query(page_size: u32) -> SearchQuery {
        SearchQuery::new("audit", 87, None, page_size).unwrap()
    }

    fn paginator<'a>(site: &'a SiteConfig, rule: &'a SearchRule) -> Paginator<'a> {
        Paginator::new(site, rule, RetryPolicy::default(), Duration::from_secs(1)).unwrap()
    }

    fn url(site: &SiteConfig, q: &SearchQuery, page: u32) -> String {
        q.page_url(site, page).unwrap().to_string()
    }

    #[test]
    fn test_parse_total_count() {
        assert_eq!(parse_total_count("1,234").unwrap(), 1234);
        assert_eq!(parse_total_count("  250 results").unwrap(), 250);
        assert_eq!(parse_total_count("0").unwrap(), 0);
        assert!(parse_total_count("no results").is_err());
        assert!(parse_total_count("").is_err());
    }

    #[test]
    fn test_max_pages() {
        assert_eq!(max_pages(1234, 100), 13);
        assert_eq!(max_pages(250, 100), 3);
        assert_eq!(max_pages(100, 100), 1);
        assert_eq!(max_pages(0, 100), 0);
    }

    #[tokio::test]
    async fn test_stops_when_page_adds_nothing() {
        let site = SiteConfig::default();
        let rule = SearchRule::default();
        let q = query(2);
        let mut fetcher = ScriptedFetcher::new()
            .page(url(&site, &q, 1), results_page("10", &["a", "b"]))
            .page(url(&site, &q, 2), results_page("10", &["c", "d"]))
            .page(url(&site, &q, 3), results_page("10", &["c", "d"]))
            .page(url(&site, &q, 4), results_page("10", &["e"]));

        let out = paginator(&site, &rule).collect(&mut fetcher, &q).await.unwrap();

        assert_eq!(out.max_pages, 5);
        assert_eq!(out.pages_visited, 3);
        assert_eq!(out.links.len(), 4);
        assert!(matches!(out.stop, StopReason::NoNewLinks { page: 3 }));
        assert_eq!(fetcher.visits().len(), 3);
    }

    #[tokio::test]
    async fn test_budget_of_three_pages() {
        let site = SiteConfig::default();
        let rule = SearchRule::default();
        let q = query(100);
        let mut fetcher = ScriptedFetcher::new()
            .page(url(&site, &q, 1), results_page("250", &["a", "b"]))
            .page(url(&site, &q, 2), results_page("250", &["b", "c"]))
            .page(url(&site, &q, 3), results_page("250", &["d"]))
            .page(url(&site, &q, 4), results_page("250", &["z"]));

        let out = paginator(&site, &rule).collect(&mut fetcher, &q).await.unwrap();

        assert_eq!(out.max_pages, 3);
        assert_eq!(out.pages_visited, 3);
        assert!(matches!(out.stop, StopReason::Exhausted));
        assert_eq!(
            out.links.iter().collect::<Vec<_>>(),
            vec![
                "https://onlinelibrary.wiley.com/doi/a",
                "https://onlinelibrary.wiley.com/doi/b",
                "https://onlinelibrary.wiley.com/doi/c",
                "https://onlinelibrary.wiley.com/doi/d",
            ]
        );
        assert!(!fetcher.visits().contains(&url(&site, &q, 4)));
    }

    #[tokio::test]
    async fn test_unreadable_count_means_one_page() {
        let site = SiteConfig::default();
        let rule = SearchRule::default();
        let q = query(100);
        let mut fetcher = ScriptedFetcher::new()
            .page(url(&site, &q, 1), results_page("many", &["a"]))
            .page(url(&site, &q, 2), results_page("many", &["b"]));

        let out = paginator(&site, &rule).collect(&mut fetcher, &q).await.unwrap();

        assert_eq!(out.max_pages, 1);
        assert_eq!(out.total_results, None);
        assert_eq!(out.links.len(), 1);
        assert_eq!(fetcher.visits().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_results_keeps_page_one_links() {
        let site = SiteConfig::default();
        let rule = SearchRule::default();
        let q = query(100);
        let mut fetcher = ScriptedFetcher::new().page(url(&site, &q, 1), results_page("0", &["a"]));

        let out = paginator(&site, &rule).collect(&mut fetcher, &q).await.unwrap();

        assert_eq!(out.total_results, Some(0));
        assert_eq!(out.pages_visited, 1);
        assert_eq!(out.links.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_page_keeps_accumulated_links() {
        let site = SiteConfig::default();
        let rule = SearchRule::default();
        let q = query(1);
        let mut fetcher = ScriptedFetcher::new()
            .page(url(&site, &q, 1), results_page("3", &["a"]))
            .page(url(&site, &q, 2), results_page("3", &["b"]))
            .respond(url(&site, &q, 3), [Scripted::Timeout]);

        let out = paginator(&site, &rule).collect(&mut fetcher, &q).await.unwrap();

        assert_eq!(out.links.len(), 2);
        assert_eq!(out.pages_visited, 2);
        assert!(matches!(
            out.stop,
            StopReason::FetchFailed {
                page: 3,
                error: HarvestError::Fetch(FetchError::NavigationTimeout { .. }),
            }
        ));
    }

    #[tokio::test]
    async fn test_page_one_failure_is_an_error() {
        let site = SiteConfig::default();
        let rule = SearchRule::default();
        let q = query(100);
        let mut fetcher = ScriptedFetcher::new().page(url(&site, &q, 1), "<html>captcha</html>");

        let err = paginator(&site, &rule).collect(&mut fetcher, &q).await.unwrap_err();
        assert!(matches!(err, HarvestError::Fetch(FetchError::SelectorNotFound { .. })));
    }
}
