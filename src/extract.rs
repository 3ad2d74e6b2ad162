//! Link extraction rules for result pages.
//!
//! An [`ExtractionRule`] is plain data: site layout changes are made by
//! editing the rule in configuration, never the pagination loop.

use crate::error::FetchError;
use crate::fetcher::{PageFetcher, Target};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// How result links are located on a page.
///
/// Primary path: one link per `row_selector` element, taken from the first
/// `inner_selector` match inside it. When that yields nothing, every element
/// matching `fallback_selector` is used directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionRule {
    pub row_selector: String,
    pub inner_selector: String,
    pub fallback_selector: String,
    /// Attribute holding the link.
    pub attribute: String,
}

impl Default for ExtractionRule {
    fn default() -> Self {
        Self {
            row_selector: "li.search__item".into(),
            inner_selector: "a[href^='/doi/']".into(),
            fallback_selector: "a[href^='/doi/']".into(),
            attribute: "href".into(),
        }
    }
}

/// Links read from one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLinks {
    /// Absolute URLs in document order, possibly with repeats.
    pub links: Vec<String>,
    pub used_fallback: bool,
}

/// Resolve an extracted `href` against the site origin.
pub fn normalize_link(base: &Url, href: &str) -> Option<String> {
    let mut url = base.join(href.trim()).ok()?;
    url.set_fragment(None);
    Some(url.to_string())
}

impl ExtractionRule {
    /// Apply the rule to the page currently loaded in `fetcher`.
    pub async fn extract<F: PageFetcher>(
        &self,
        fetcher: &F,
        base: &Url,
    ) -> Result<ExtractedLinks, FetchError> {
        let target = Target::Attr(&self.attribute);
        let mut raw = fetcher
            .extract_all(&self.row_selector, Some(&self.inner_selector), target)
            .await?;

        let used_fallback = raw.is_empty();
        if used_fallback {
            raw = fetcher
                .extract_all(&self.fallback_selector, None, target)
                .await?;
        }

        let links = raw
            .iter()
            .filter_map(|href| {
                let normalized = normalize_link(base, href);
                if normalized.is_none() {
                    debug!(%href, "Dropping unresolvable link");
                }
                normalized
            })
            .collect();

        Ok(ExtractedLinks {
            links,
            used_fallback,
        })
    }
}
