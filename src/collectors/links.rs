//! Link Collector: subjects × keywords → per-pair link lists.
//!
//! Output goes to `<output_dir>/links-<subject>/`. A pair whose file already
//! exists is skipped, so an interrupted run resumes at the next pair. A pair
//! whose first result page fails is not written at all and is retried by the
//! next run.

use crate::config::HarvestConfig;
use crate::error::HarvestError;
use crate::fetcher::PageFetcher;
use crate::models::SearchQuery;
use crate::outputs::json;
use crate::pagination::{Paginator, StopReason};
use crate::throttle::{DelayPolicy, RetryPolicy};
use crate::utils::keyword_slug;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs;
use tracing::{debug, error, info, instrument, warn};

/// Outcome counts of one Link Collector run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSummary {
    pub pairs_written: usize,
    pub pairs_skipped: usize,
    pub pairs_failed: usize,
    pub links_written: usize,
    pub pages_visited: u32,
    pub elapsed: Duration,
}

/// Directory holding one subject's outputs.
pub fn subject_dir(output_dir: &Path, subject: &str) -> PathBuf {
    output_dir.join(format!("links-{subject}"))
}

/// Run the Link Collector over every configured subject and `keywords`.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display()))]
pub async fn collect_links<F: PageFetcher>(
    fetcher: &mut F,
    config: &HarvestConfig,
    keywords: &[String],
    output_dir: &Path,
) -> Result<LinkSummary, HarvestError> {
    if keywords.is_empty() {
        return Err(HarvestError::Config(
            "no keywords configured (set `keywords` or `keywords_file`)".into(),
        ));
    }

    let started = Instant::now();
    let paginator = Paginator::new(
        &config.site,
        &config.search_rule,
        RetryPolicy::from(config.retry),
        config.timeout(),
    )?;
    let delay = DelayPolicy::from(config.delay);
    let mut summary = LinkSummary::default();

    for subject in &config.subjects {
        let dir = subject_dir(output_dir, &subject.name);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| HarvestError::io(&dir, e))?;
        info!(
            subject = %subject.name,
            filter = subject.filter_id,
            keywords = keywords.len(),
            "Collecting subject"
        );

        for keyword in keywords {
            let slug = keyword_slug(keyword);
            if slug.is_empty() {
                warn!(%keyword, "Keyword has no usable characters; skipping");
                continue;
            }

            let path = json::pair_path(&dir, &subject.name, &slug);
            if fs::try_exists(&path).await.unwrap_or(false) {
                debug!(path = %path.display(), "Pair already collected; skipping");
                summary.pairs_skipped += 1;
                continue;
            }

            let query = SearchQuery::new(
                keyword.as_str(),
                subject.filter_id,
                config.date_range.clone(),
                config.page_size,
            )?;

            match paginator.collect(fetcher, &query).await {
                Ok(collected) => {
                    summary.pages_visited += collected.pages_visited;
                    match &collected.stop {
                        StopReason::FetchFailed { page, error } => {
                            warn!(
                                %keyword,
                                page,
                                error = %error,
                                "Pair is incomplete; keeping links gathered so far"
                            )
                        }
                        StopReason::NoNewLinks { page } => {
                            debug!(%keyword, page, "Results started repeating")
                        }
                        StopReason::Exhausted => {}
                    }
                    if collected.links.is_empty() {
                        warn!(%keyword, "Search returned no result links");
                    }
                    json::write_link_list(&path, &collected.links).await?;
                    summary.pairs_written += 1;
                    summary.links_written += collected.links.len();
                    info!(
                        subject = %subject.name,
                        %keyword,
                        links = collected.links.len(),
                        pages = collected.pages_visited,
                        max_pages = collected.max_pages,
                        total_results = ?collected.total_results,
                        "Pair collected"
                    );
                }
                Err(e) => {
                    summary.pairs_failed += 1;
                    error!(
                        subject = %subject.name,
                        %keyword,
                        error = %e,
                        "First result page failed; pair not written"
                    );
                }
            }

            delay.pause().await;
        }

        match json::write_subject_master(&dir, &subject.name).await {
            Ok(master) => {
                debug!(subject = %subject.name, keywords = master.len(), "Master file rebuilt")
            }
            Err(e) => error!(subject = %subject.name, error = %e, "Failed to write master file"),
        }
    }

    summary.elapsed = started.elapsed();
    info!(
        written = summary.pairs_written,
        skipped = summary.pairs_skipped,
        failed = summary.pairs_failed,
        links = summary.links_written,
        pages = summary.pages_visited,
        elapsed = ?summary.elapsed,
        "Link collection complete"
    );
    Ok(summary)
}
