//! Crawl pipelines.
//!
//! - [`links`]: the Link Collector. For every (subject, keyword) pair it
//!   paginates the search results and writes the deduplicated links, then
//!   rebuilds the subject's master file.
//! - [`seed`]: turns link collector output into a resumable input list.
//! - [`articles`]: the Article Collector. It visits every unprocessed entry
//!   of an input list, appends the extracted data to a sink and marks the
//!   entry processed.
//!
//! Every pipeline drives one [`PageFetcher`](crate::fetcher::PageFetcher)
//! strictly sequentially and pauses between units of work according to the
//! configured [`DelayPolicy`](crate::throttle::DelayPolicy).

pub mod articles;
pub mod links;
pub mod seed;

use std::time::Duration;
use tracing::info;

/// Outcome counts of one Article Collector run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Entries in the list after deduplication.
    pub total: usize,
    /// Entries extracted and persisted in this run.
    pub processed: usize,
    /// Entries whose extraction or persistence failed; left unmarked.
    pub failed: usize,
    /// Entries already marked when the run started.
    pub skipped: usize,
    /// Persisted entries whose mark could not be applied.
    pub mark_failures: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn log(&self, pipeline: &str) {
        info!(
            pipeline,
            total = self.total,
            processed = self.processed,
            failed = self.failed,
            skipped = self.skipped,
            mark_failures = self.mark_failures,
            elapsed = ?self.elapsed,
            secs = self.elapsed.as_secs(),
            "Run complete"
        );
    }
}
