//! Article Collector: input list → extracted article data.
//!
//! Two output variants share one resumable loop:
//!
//! - **Bibliographic**: one semicolon-delimited row per (article, author),
//!   optionally enriched with each author's email from their profile page.
//! - **Abstracts**: one `article_<n>.json` snapshot per article plus a row in
//!   `merged.csv`, where `n` is the entry's 1-based position in the list.
//!
//! For every unprocessed entry, in list order: load the page, extract,
//! persist, mark the list line processed, pause. A failed entry is logged,
//! counted, left unmarked and followed by the same pause.

use super::RunSummary;
use crate::config::{ArticleRule, HarvestConfig};
use crate::error::HarvestError;
use crate::extract::normalize_link;
use crate::fetcher::{PageFetcher, Target};
use crate::models::{AbstractSnapshot, ArticleRecord, Author, Field, UrlEntry};
use crate::outputs::csv::{DelimitedSink, abstract_row, article_rows};
use crate::outputs::json;
use crate::progress::{MarkOutcome, ProgressList};
use crate::throttle::{DelayPolicy, RetryPolicy};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Where and how extracted articles are persisted.
#[derive(Debug, Clone)]
pub enum ArticleOutput {
    Bibliographic {
        sink: DelimitedSink,
        fetch_profiles: bool,
    },
    Abstracts {
        snapshot_dir: PathBuf,
        sink: DelimitedSink,
    },
}

impl ArticleOutput {
    pub fn bibliographic(csv_path: impl Into<PathBuf>, fetch_profiles: bool) -> Self {
        Self::Bibliographic {
            sink: DelimitedSink::articles(csv_path),
            fetch_profiles,
        }
    }

    /// `merged.csv` and `articles/` under `output_dir`.
    pub fn abstracts(output_dir: &Path) -> Self {
        Self::Abstracts {
            snapshot_dir: output_dir.join("articles"),
            sink: DelimitedSink::abstracts(output_dir.join("merged.csv")),
        }
    }

    fn sink(&self) -> &DelimitedSink {
        match self {
            Self::Bibliographic { sink, .. } | Self::Abstracts { sink, .. } => sink,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Bibliographic { .. } => "articles",
            Self::Abstracts { .. } => "abstracts",
        }
    }
}

/// Runs one output variant over an input list.
#[derive(Debug, Clone)]
pub struct ArticleCollector<'a> {
    rule: &'a ArticleRule,
    retry: RetryPolicy,
    delay: DelayPolicy,
    timeout: Duration,
    output: ArticleOutput,
}

impl<'a> ArticleCollector<'a> {
    pub fn new(config: &'a HarvestConfig, output: ArticleOutput) -> Self {
        Self {
            rule: &config.article_rule,
            retry: config.retry.into(),
            delay: config.delay.into(),
            timeout: config.timeout(),
            output,
        }
    }

    /// Process every unprocessed entry of `list`.
    ///
    /// Only failing to load the list is an error; per-entry failures are
    /// counted in the returned summary.
    #[instrument(
        level = "info",
        skip_all,
        fields(list = %list.path().display(), variant = self.output.name())
    )]
    pub async fn run<F: PageFetcher>(
        &self,
        fetcher: &mut F,
        list: &ProgressList,
    ) -> Result<RunSummary, HarvestError> {
        let started = Instant::now();
        let entries = list.load().await?;
        let mut summary = RunSummary {
            total: entries.len(),
            ..RunSummary::default()
        };
        info!(output = %self.output.sink().path().display(), "Appending to output");

        for (position, entry) in entries.iter().enumerate() {
            if entry.processed {
                summary.skipped += 1;
                continue;
            }
            let number = position + 1;

            match self.process(fetcher, entry, number).await {
                Ok(rows) => {
                    summary.processed += 1;
                    info!(
                        n = number,
                        label = %entry.label,
                        url = %entry.url,
                        rows,
                        "Entry persisted"
                    );
                    match list.mark_processed(&entry.raw_line).await {
                        Ok(MarkOutcome::NotFound) => {
                            summary.mark_failures += 1;
                            error!(
                                n = number,
                                line = %entry.raw_line,
                                "Entry persisted but its list line is missing; it will run again"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => {
                            summary.mark_failures += 1;
                            error!(
                                n = number,
                                error = %e,
                                "Entry persisted but could not be marked; it will run again"
                            );
                        }
                    }
                }
                Err(e) => {
                    summary.failed += 1;
                    error!(
                        n = number,
                        url = %entry.url,
                        error = %e,
                        "Entry failed; leaving it unmarked"
                    );
                }
            }

            self.delay.pause().await;
        }

        summary.elapsed = started.elapsed();
        summary.log(self.output.name());
        Ok(summary)
    }

    /// Extract and persist one entry. Returns the number of rows appended.
    async fn process<F: PageFetcher>(
        &self,
        fetcher: &mut F,
        entry: &UrlEntry,
        number: usize,
    ) -> Result<usize, HarvestError> {
        self.retry
            .load_page(fetcher, &entry.url, &[self.rule.ready_selector.as_str()], self.timeout)
            .await?;

        match &self.output {
            ArticleOutput::Bibliographic {
                sink,
                fetch_profiles,
            } => {
                let record = self.extract_record(fetcher, &entry.url, *fetch_profiles).await;
                sink.append(article_rows(&record))
            }
            ArticleOutput::Abstracts { snapshot_dir, sink } => {
                let snapshot = self.extract_snapshot(fetcher, &entry.url).await;
                let file_name = format!("article_{number}.json");
                json::write_snapshot(snapshot_dir, &file_name, &snapshot).await?;
                sink.append([abstract_row(
                    &file_name,
                    &snapshot.title,
                    &snapshot.authors,
                    &snapshot.abstract_text,
                )])
            }
        }
    }

    /// Read the bibliographic fields of the loaded article page.
    async fn extract_record<F: PageFetcher>(
        &self,
        fetcher: &F,
        source_url: &str,
        fetch_profiles: bool,
    ) -> ArticleRecord {
        let rule = self.rule;
        let base = fetcher.current_url().and_then(|u| Url::parse(u).ok());

        let shared_contributions = field(fetcher, &rule.contributions, Target::Text).await;
        let rows = fetcher
            .extract_rows(
                &rule.author_row,
                &[
                    (rule.author_name.as_str(), Target::Text),
                    (rule.author_profile.as_str(), Target::Attr("href")),
                    (rule.author_contributions.as_str(), Target::Text),
                ],
            )
            .await
            .unwrap_or_else(|e| {
                warn!(url = %source_url, error = %e, "Author rows unreadable");
                Vec::new()
            });

        let mut authors = Vec::with_capacity(rows.len());
        for row in rows {
            let mut cells = row.into_iter();
            let name = Field::from_text(cells.next().flatten());
            let profile_url = Field::from_text(
                cells
                    .next()
                    .flatten()
                    .map(|href| resolve(base.as_ref(), href)),
            );
            let contributions =
                Field::from_text(cells.next().flatten()).or(shared_contributions.clone());

            if !name.is_available() && !profile_url.is_available() {
                debug!(url = %source_url, "Skipping empty author row");
                continue;
            }

            let email = match (fetch_profiles, profile_url.as_deref()) {
                (true, Some(profile)) => self.profile_email(fetcher, profile).await,
                _ => Field::Unavailable,
            };

            authors.push(Author {
                name,
                profile_url,
                email,
                contributions,
            });
        }

        ArticleRecord {
            title: field(fetcher, &rule.title, Target::Text).await,
            journal: field(fetcher, &rule.journal, Target::Text).await,
            doi: field(fetcher, &rule.doi, Target::Text).await,
            publication_date: field(fetcher, &rule.publication_date, Target::Text).await,
            authors,
            source_url: source_url.to_string(),
        }
    }

    /// Visit an author's profile on an auxiliary page and read their email.
    #[instrument(level = "debug", skip_all, fields(%profile))]
    async fn profile_email<F: PageFetcher>(&self, fetcher: &F, profile: &str) -> Field {
        let mut page = match fetcher.open_auxiliary().await {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, "Could not open profile page");
                return Field::Unavailable;
            }
        };

        let email: Field = match self.retry.load_page(&mut page, profile, &[], self.timeout).await {
            Ok(()) => field(&page, &self.rule.profile_email, Target::Attr("href"))
                .await
                .as_deref()
                .map(|href| href.trim_start_matches("mailto:").to_string())
                .into(),
            Err(e) => {
                warn!(error = %e, "Profile page failed");
                Field::Unavailable
            }
        };

        page.close().await;
        email
    }

    /// Read the single-field variant from the loaded article page.
    async fn extract_snapshot<F: PageFetcher>(&self, fetcher: &F, url: &str) -> AbstractSnapshot {
        let rule = self.rule;
        AbstractSnapshot {
            url: url.to_string(),
            title: field(fetcher, &rule.title, Target::Text).await,
            authors: joined(fetcher, &rule.author_names, "; ").await,
            abstract_text: joined(fetcher, &rule.abstract_text, "\n").await,
        }
    }
}

/// One field of the loaded page. Any extraction failure is `Unavailable`.
async fn field<F: PageFetcher>(fetcher: &F, selector: &str, target: Target<'_>) -> Field {
    match fetcher.extract_one(selector, target).await {
        Ok(value) => Field::from_text(value),
        Err(e) => {
            debug!(%selector, error = %e, "Field unavailable");
            Field::Unavailable
        }
    }
}

/// All matches of `selector`, joined. `Unavailable` when there are none.
async fn joined<F: PageFetcher>(fetcher: &F, selector: &str, separator: &str) -> Field {
    match fetcher.extract_all(selector, None, Target::Text).await {
        Ok(values) => Field::from_text(Some(values.join(separator))),
        Err(e) => {
            debug!(%selector, error = %e, "Field unavailable");
            Field::Unavailable
        }
    }
}

fn resolve(base: Option<&Url>, href: String) -> String {
    base.and_then(|b| normalize_link(b, &href)).unwrap_or(href)
}
