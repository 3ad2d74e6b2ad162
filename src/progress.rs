//! Resumable progress tracking over a flat input list.
//!
//! # List format
//!
//! UTF-8 text, one record per line: `label;url[;doneFlag]`. Only a flag of
//! exactly `1` marks a record processed. Blank lines and lines without a URL
//! are ignored. CRLF line endings are accepted.
//!
//! # Resume discipline
//!
//! Callers process the unprocessed entries in load order and, after an
//! entry's output has been persisted, call [`ProgressList::mark_processed`]
//! with that entry's original line before moving on. A crash therefore
//! leaves every marked entry with its output written and every unmarked entry
//! without it.
//!
//! Marking is a whole-file read-modify-write. It is not safe against another
//! process editing the list at the same time.

use crate::error::HarvestError;
use crate::models::UrlEntry;
use itertools::Itertools;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

const DONE_FLAG: &str = "1";

/// Parse one list line. `None` for blank or malformed lines.
pub fn parse_line(line: &str) -> Option<UrlEntry> {
    if line.trim().is_empty() {
        return None;
    }
    let mut fields = line.split(';');
    let label = fields.next()?.trim();
    let url = fields.next()?.trim();
    if url.is_empty() {
        return None;
    }
    let processed = fields.next().map(str::trim) == Some(DONE_FLAG);
    Some(UrlEntry {
        raw_line: line.to_string(),
        label: label.to_string(),
        url: url.to_string(),
        processed,
    })
}

/// Parse a whole list, keeping only the first line seen for each URL.
pub fn parse_list(text: &str) -> Vec<UrlEntry> {
    text.lines()
        .filter_map(|line| {
            let entry = parse_line(line);
            if entry.is_none() && !line.trim().is_empty() {
                warn!(line = %line, "Skipping malformed list line");
            }
            entry
        })
        .unique_by(|entry| entry.url.clone())
        .collect()
}

/// The line as it should read once processed.
fn marked(line: &str) -> Option<String> {
    let fields: Vec<&str> = line.split(';').collect();
    match fields.as_slice() {
        [_, _] => Some(format!("{line};{DONE_FLAG}")),
        [label, url, flag, rest @ ..] if flag.trim() != DONE_FLAG => {
            let mut out = vec![*label, *url, DONE_FLAG];
            out.extend_from_slice(rest);
            Some(out.join(";"))
        }
        _ => None,
    }
}

/// Result of a mark request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// The line was rewritten with the done flag.
    Marked,
    /// The line already carried the done flag.
    AlreadyMarked,
    /// No line matched exactly.
    NotFound,
}

/// A persisted input list.
#[derive(Debug, Clone)]
pub struct ProgressList {
    path: PathBuf,
}

impl ProgressList {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the list and return its deduplicated entries in file order.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<Vec<UrlEntry>, HarvestError> {
        let text = fs::read_to_string(&self.path)
            .await
            .map_err(|e| HarvestError::io(&self.path, e))?;
        let entries = parse_list(&text);
        let done = entries.iter().filter(|e| e.processed).count();
        info!(
            entries = entries.len(),
            done,
            remaining = entries.len() - done,
            "Loaded progress list"
        );
        Ok(entries)
    }

    /// Mark the line exactly equal to `raw_line` as processed.
    ///
    /// Matching is on the full line, never the URL alone. Every matching
    /// line is rewritten. Calling this again for the same `raw_line` leaves
    /// the file unchanged.
    #[instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    pub async fn mark_processed(&self, raw_line: &str) -> Result<MarkOutcome, HarvestError> {
        let Some(replacement) = marked(raw_line) else {
            return Ok(MarkOutcome::AlreadyMarked);
        };

        let text = fs::read_to_string(&self.path)
            .await
            .map_err(|e| HarvestError::io(&self.path, e))?;

        let mut hits = 0usize;
        let mut out = String::with_capacity(text.len() + DONE_FLAG.len() + 1);
        for chunk in text.split_inclusive('\n') {
            let content = chunk.strip_suffix('\n').unwrap_or(chunk);
            let content = content.strip_suffix('\r').unwrap_or(content);
            if content == raw_line {
                hits += 1;
                out.push_str(&replacement);
                out.push_str(&chunk[content.len()..]);
            } else {
                out.push_str(chunk);
            }
        }

        if hits == 0 {
            if text.lines().any(|line| line == replacement) {
                return Ok(MarkOutcome::AlreadyMarked);
            }
            warn!(line = %raw_line, "Line to mark not found in list");
            return Ok(MarkOutcome::NotFound);
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, out)
            .await
            .map_err(|e| HarvestError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| HarvestError::io(&self.path, e))?;

        debug!(hits, "Marked line processed");
        Ok(MarkOutcome::Marked)
    }
}
