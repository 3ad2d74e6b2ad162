//! [`PageFetcher`] over plain HTTP.
//!
//! Pages are fetched with `reqwest` and queried with `scraper`. There is no
//! script execution, so a page is complete as soon as its body has arrived:
//! [`HttpPageFetcher::wait_for`] checks the selector once instead of polling.

use super::{PageFetcher, Target, dom};
use crate::config::HarvestConfig;
use crate::error::{FetchError, HarvestError};
use crate::utils::truncate_for_log;
use reqwest::{Client, Proxy};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

#[derive(Debug)]
struct LoadedPage {
    url: String,
    body: String,
}

/// HTTP page session. Clones of the underlying client share connections.
#[derive(Debug)]
pub struct HttpPageFetcher {
    client: Client,
    page: Option<LoadedPage>,
}

impl HttpPageFetcher {
    /// Build a session from the run configuration (user agent, proxy).
    pub fn new(config: &HarvestConfig) -> Result<Self, HarvestError> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());

        if let Some(proxy) = &config.proxy {
            let mut p = Proxy::all(&proxy.url)
                .map_err(|e| HarvestError::Config(format!("proxy url {}: {e}", proxy.url)))?;
            if let Some(user) = &proxy.username {
                p = p.basic_auth(user, proxy.password.as_deref().unwrap_or_default());
            }
            info!(proxy = %proxy.url, authenticated = proxy.username.is_some(), "Using proxy");
            builder = builder.proxy(p);
        }

        let client = builder
            .build()
            .map_err(|e| HarvestError::Config(format!("http client: {e}")))?;
        Ok(Self { client, page: None })
    }

    fn loaded(&self) -> Result<&LoadedPage, FetchError> {
        self.page.as_ref().ok_or(FetchError::NoPage)
    }
}

fn classify(url: &str, timeout: Duration, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::NavigationTimeout {
            url: url.to_string(),
            timeout,
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}

impl PageFetcher for HttpPageFetcher {
    type Auxiliary = HttpPageFetcher;

    #[instrument(level = "debug", skip_all, fields(url = %truncate_for_log(url, 160)))]
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), FetchError> {
        self.page = None;
        let t0 = Instant::now();

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(url, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Navigation returned non-success status");
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let body = response.text().await.map_err(|e| classify(url, timeout, e))?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Page loaded"
        );
        self.page = Some(LoadedPage {
            url: final_url,
            body,
        });
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), FetchError> {
        let page = self.loaded()?;
        if dom::has_match(&page.body, selector)? {
            Ok(())
        } else {
            Err(FetchError::SelectorNotFound {
                selector: selector.to_string(),
                timeout,
            })
        }
    }

    fn current_url(&self) -> Option<&str> {
        self.page.as_ref().map(|p| p.url.as_str())
    }

    async fn extract_one(
        &self,
        selector: &str,
        target: Target<'_>,
    ) -> Result<Option<String>, FetchError> {
        dom::select_one(&self.loaded()?.body, selector, target)
    }

    async fn extract_all(
        &self,
        row_selector: &str,
        inner_selector: Option<&str>,
        target: Target<'_>,
    ) -> Result<Vec<String>, FetchError> {
        dom::select_all(&self.loaded()?.body, row_selector, inner_selector, target)
    }

    async fn extract_rows(
        &self,
        row_selector: &str,
        fields: &[(&str, Target<'_>)],
    ) -> Result<Vec<Vec<Option<String>>>, FetchError> {
        dom::select_rows(&self.loaded()?.body, row_selector, fields)
    }

    async fn open_auxiliary(&self) -> Result<Self::Auxiliary, FetchError> {
        Ok(Self {
            client: self.client.clone(),
            page: None,
        })
    }

    async fn close(self) {
        debug!(had_page = self.page.is_some(), "Page closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyConfig;

    #[tokio::test]
    async fn test_extraction_before_navigation_is_no_page() {
        let fetcher = HttpPageFetcher::new(&HarvestConfig::default()).unwrap();
        let err = fetcher.extract_text("h1").await.unwrap_err();
        assert!(matches!(err, FetchError::NoPage));
        assert!(fetcher.current_url().is_none());
    }

    #[tokio::test]
    async fn test_wait_for_checks_static_body_once() {
        let mut fetcher = HttpPageFetcher::new(&HarvestConfig::default()).unwrap();
        fetcher.page = Some(LoadedPage {
            url: "https://x.org/doi/1".into(),
            body: r#"<html><body><h1 class="title">T</h1></body></html>"#.into(),
        });

        let long = Duration::from_secs(30);
        fetcher.wait_for("h1.title", long).await.unwrap();

        let started = Instant::now();
        let err = fetcher.wait_for("div.rendered-later", long).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(matches!(err, FetchError::SelectorNotFound { timeout, .. } if timeout == long));
    }

    #[test]
    fn test_builds_with_authenticated_proxy() {
        let config = HarvestConfig {
            proxy: Some(ProxyConfig {
                url: "http://127.0.0.1:3128".into(),
                username: Some("user".into()),
                password: Some("secret".into()),
            }),
            ..HarvestConfig::default()
        };
        assert!(HttpPageFetcher::new(&config).is_ok());
    }
}
