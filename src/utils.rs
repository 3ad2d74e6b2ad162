//! Small helpers shared by the collectors.
//!
//! - Keyword slugs used in output file names and list labels
//! - String truncation for logging
//! - Keyword loading from config and keyword files
//! - File system validation for output directories

use crate::config::HarvestConfig;
use crate::error::HarvestError;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));
static NON_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]").expect("static regex"));

/// Convert a search keyword to the slug used in file names and list labels.
///
/// Surrounding whitespace is trimmed, inner whitespace runs become `_`, and
/// anything outside `[A-Za-z0-9_-]` is dropped. Case is kept.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(keyword_slug("  Artificial   Intelligence "), "Artificial_Intelligence");
/// assert_eq!(keyword_slug("ESG (reporting)"), "ESG_reporting");
/// ```
pub fn keyword_slug(keyword: &str) -> String {
    let underscored = WHITESPACE_RUN.replace_all(keyword.trim(), "_");
    NON_SLUG.replace_all(&underscored, "").into_owned()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a character boundary)
/// with `"…(+N bytes)"` appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// All keywords to search for: the inline `keywords` list followed by the
/// lines of `keywords_file`, trimmed, blanks dropped, first occurrence kept.
#[instrument(level = "info", skip_all)]
pub async fn load_keywords(config: &HarvestConfig) -> Result<Vec<String>, HarvestError> {
    let mut keywords = config.keywords.clone();

    if let Some(path) = &config.keywords_file {
        let text = fs::read_to_string(path)
            .await
            .map_err(|e| HarvestError::io(path, e))?;
        keywords.extend(text.lines().map(str::to_string));
    }

    let keywords: Vec<String> = keywords
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .unique()
        .collect();

    info!(count = keywords.len(), "Loaded keywords");
    Ok(keywords)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), HarvestError> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| HarvestError::io(path, e))?;

    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path).map_err(|e| HarvestError::io(&probe_path, e))?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}
