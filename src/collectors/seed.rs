//! Build or extend an Article Collector input list from Link Collector output.
//!
//! Each source is either a pair file (JSON array) or a subject master file
//! (JSON object keyed by keyword slug). New URLs are appended as
//! `label;url` lines; URLs already in the list, processed or not, are left
//! alone, so seeding twice is harmless.

use crate::error::HarvestError;
use crate::outputs::json::read_link_source;
use crate::progress::parse_list;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};

/// Outcome counts of one seeding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub added: usize,
    pub already_listed: usize,
}

/// Append every URL in `sources` that `list_path` does not contain yet.
///
/// All sources are read before anything is written; an unreadable source
/// leaves the list untouched.
#[instrument(
    level = "info",
    skip_all,
    fields(list = %list_path.display(), sources = sources.len())
)]
pub async fn seed_list(sources: &[PathBuf], list_path: &Path) -> Result<SeedSummary, HarvestError> {
    let pairs: Vec<(String, String)> = stream::iter(sources)
        .then(|path| read_link_source(path))
        .try_collect::<Vec<_>>()
        .await?
        .into_iter()
        .flatten()
        .collect();

    let existing = match fs::read_to_string(list_path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(HarvestError::io(list_path, e)),
    };
    let mut known: HashSet<String> = parse_list(&existing).into_iter().map(|e| e.url).collect();

    let mut summary = SeedSummary::default();
    let mut appended = String::new();
    if !existing.is_empty() && !existing.ends_with('\n') {
        appended.push('\n');
    }
    for (label, url) in pairs {
        if known.insert(url.clone()) {
            appended.push_str(&format!("{label};{url}\n"));
            summary.added += 1;
        } else {
            summary.already_listed += 1;
        }
    }

    if summary.added > 0 {
        if let Some(parent) = list_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| HarvestError::io(parent, e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(list_path)
            .await
            .map_err(|e| HarvestError::io(list_path, e))?;
        file.write_all(appended.as_bytes())
            .await
            .map_err(|e| HarvestError::io(list_path, e))?;
        file.flush()
            .await
            .map_err(|e| HarvestError::io(list_path, e))?;
    }

    info!(added = summary.added, already_listed = summary.already_listed, "Seeded input list");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressList;

    #[tokio::test]
    async fn test_seed_creates_and_extends_list() {
        let dir = tempfile::tempdir().unwrap();
        let master = dir.path().join("all_accounting_links.json");
        tokio::fs::write(
            &master,
            r#"{"audit": ["https://x.org/doi/1", "https://x.org/doi/2"], "tax": ["https://x.org/doi/2"]}"#,
        )
        .await
        .unwrap();
        let list_path = dir.path().join("lists/urls.txt");

        let first = seed_list(&[master.clone()], &list_path).await.unwrap();
        assert_eq!(first, SeedSummary { added: 2, already_listed: 1 });
        assert_eq!(
            tokio::fs::read_to_string(&list_path).await.unwrap(),
            "audit;https://x.org/doi/1\naudit;https://x.org/doi/2\n"
        );

        ProgressList::new(&list_path)
            .mark_processed("audit;https://x.org/doi/1")
            .await
            .unwrap();

        let pair = dir.path().join("accounting_esg.json");
        tokio::fs::write(&pair, r#"["https://x.org/doi/1", "https://x.org/doi/3"]"#)
            .await
            .unwrap();
        let second = seed_list(&[master, pair], &list_path).await.unwrap();
        assert_eq!(second, SeedSummary { added: 1, already_listed: 4 });
        assert_eq!(
            tokio::fs::read_to_string(&list_path).await.unwrap(),
            "audit;https://x.org/doi/1;1\naudit;https://x.org/doi/2\naccounting_esg;https://x.org/doi/3\n"
        );
    }

    #[tokio::test]
    async fn test_seed_appends_after_unterminated_last_line() {
        let dir = tempfile::tempdir().unwrap();
        let pair = dir.path().join("accounting_audit.json");
        tokio::fs::write(&pair, r#"["https://x.org/doi/2"]"#).await.unwrap();
        let list_path = dir.path().join("urls.txt");
        tokio::fs::write(&list_path, "old;https://x.org/doi/1").await.unwrap();

        seed_list(&[pair], &list_path).await.unwrap();
        assert_eq!(
            tokio::fs::read_to_string(&list_path).await.unwrap(),
            "old;https://x.org/doi/1\naccounting_audit;https://x.org/doi/2\n"
        );
    }

    #[tokio::test]
    async fn test_unreadable_source_leaves_list_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("accounting_audit.json");
        tokio::fs::write(&good, r#"["https://x.org/doi/2"]"#).await.unwrap();
        let list_path = dir.path().join("urls.txt");

        let result = seed_list(&[good, dir.path().join("missing.json")], &list_path).await;
        assert!(matches!(result, Err(HarvestError::Io { .. })));
        assert!(!list_path.exists());
    }
}
