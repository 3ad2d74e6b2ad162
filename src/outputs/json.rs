//! JSON outputs.
//!
//! All files are pretty-printed with two-space indentation.

use crate::error::HarvestError;
use crate::models::{AbstractSnapshot, LinkSet};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

async fn write_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), HarvestError> {
    let json = serde_json::to_string_pretty(value)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| HarvestError::io(parent, e))?;
    }
    fs::write(path, json)
        .await
        .map_err(|e| HarvestError::io(path, e))
}

/// Path of the link list for one (subject, keyword) pair.
pub fn pair_path(subject_dir: &Path, subject: &str, keyword_slug: &str) -> PathBuf {
    subject_dir.join(format!("{subject}_{keyword_slug}.json"))
}

/// Path of the merged keyword → links mapping for a subject.
pub fn master_path(subject_dir: &Path, subject: &str) -> PathBuf {
    subject_dir.join(format!("all_{subject}_links.json"))
}

/// Write a pair's links as a JSON array, in first-seen order.
#[instrument(level = "info", skip_all, fields(path = %path.display(), links = links.len()))]
pub async fn write_link_list(path: &Path, links: &LinkSet) -> Result<(), HarvestError> {
    let urls: Vec<&str> = links.iter().collect();
    write_pretty(path, &urls).await?;
    info!("Wrote link list");
    Ok(())
}

/// Rebuild `all_<subject>_links.json` from every `<subject>_*.json` file in
/// `subject_dir`. Keys are the keyword slugs; unreadable files are skipped.
#[instrument(level = "info", skip_all, fields(dir = %subject_dir.display(), %subject))]
pub async fn write_subject_master(
    subject_dir: &Path,
    subject: &str,
) -> Result<BTreeMap<String, Vec<String>>, HarvestError> {
    let prefix = format!("{subject}_");
    let mut reader = fs::read_dir(subject_dir)
        .await
        .map_err(|e| HarvestError::io(subject_dir, e))?;

    let mut master = BTreeMap::new();
    while let Some(entry) = reader
        .next_entry()
        .await
        .map_err(|e| HarvestError::io(subject_dir, e))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(slug) = name
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(".json"))
        else {
            continue;
        };

        match read_url_array(&entry.path()).await {
            Ok(urls) => {
                debug!(file = %name, count = urls.len(), "Merged pair file");
                master.insert(slug.to_string(), urls);
            }
            Err(e) => warn!(file = %name, error = %e, "Skipping unreadable pair file"),
        }
    }

    let path = master_path(subject_dir, subject);
    write_pretty(&path, &master).await?;
    info!(path = %path.display(), keywords = master.len(), "Wrote subject master file");
    Ok(master)
}

async fn read_url_array(path: &Path) -> Result<Vec<String>, HarvestError> {
    let raw = fs::read_to_string(path)
        .await
        .map_err(|e| HarvestError::io(path, e))?;
    Ok(serde_json::from_str(&raw)?)
}

/// Read `(label, url)` pairs from link collector output.
///
/// Accepts either a pair file (a JSON array; the label is the file stem) or
/// a subject master file (an object; the label is the key).
pub async fn read_link_source(path: &Path) -> Result<Vec<(String, String)>, HarvestError> {
    let raw = fs::read_to_string(path)
        .await
        .map_err(|e| HarvestError::io(path, e))?;
    let value: Value = serde_json::from_str(&raw)?;

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let pairs = if value.is_array() {
        let urls: Vec<String> = serde_json::from_value(value)?;
        urls.into_iter().map(|u| (stem.clone(), u)).collect()
    } else if value.is_object() {
        let map: BTreeMap<String, Vec<String>> = serde_json::from_value(value)?;
        map.into_iter()
            .flat_map(|(label, urls)| urls.into_iter().map(move |u| (label.clone(), u)))
            .collect()
    } else {
        return Err(HarvestError::ParseFailure {
            field: "link source",
            value: value.to_string(),
        });
    };
    Ok(pairs)
}

/// Write `article_<n>.json` under `dir`.
pub async fn write_snapshot(
    dir: &Path,
    file_name: &str,
    snapshot: &AbstractSnapshot,
) -> Result<PathBuf, HarvestError> {
    let path = dir.join(file_name);
    write_pretty(&path, snapshot).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Field;

    #[tokio::test]
    async fn test_master_merges_pair_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = LinkSet::new();
        a.insert("https://x.org/doi/1");
        a.insert("https://x.org/doi/2");
        let mut b = LinkSet::new();
        b.insert("https://x.org/doi/3");

        write_link_list(&pair_path(dir.path(), "accounting", "audit"), &a).await.unwrap();
        write_link_list(&pair_path(dir.path(), "accounting", "Artificial_Intelligence"), &b)
            .await
            .unwrap();
        write_link_list(&pair_path(dir.path(), "finance", "audit"), &b).await.unwrap();

        let master = write_subject_master(dir.path(), "accounting").await.unwrap();
        assert_eq!(master.len(), 2);
        assert_eq!(master["audit"].len(), 2);
        assert_eq!(master["Artificial_Intelligence"], vec!["https://x.org/doi/3"]);

        let raw = tokio::fs::read_to_string(master_path(dir.path(), "accounting"))
            .await
            .unwrap();
        let parsed: BTreeMap<String, Vec<String>> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, master);

        // Rebuilding does not fold the master file into itself.
        let again = write_subject_master(dir.path(), "accounting").await.unwrap();
        assert_eq!(again.len(), 2);
    }

    #[tokio::test]
    async fn test_read_link_source_array_and_object() {
        let dir = tempfile::tempdir().unwrap();
        let array = dir.path().join("accounting_audit.json");
        tokio::fs::write(&array, r#"["https://x.org/doi/1"]"#).await.unwrap();
        let object = dir.path().join("all_accounting_links.json");
        tokio::fs::write(&object, r#"{"tax": ["https://x.org/doi/2", "https://x.org/doi/3"]}"#)
            .await
            .unwrap();

        let from_array = read_link_source(&array).await.unwrap();
        assert_eq!(
            from_array,
            vec![("accounting_audit".to_string(), "https://x.org/doi/1".to_string())]
        );

        let from_object = read_link_source(&object).await.unwrap();
        assert_eq!(from_object.len(), 2);
        assert!(from_object.iter().all(|(label, _)| label == "tax"));
    }

    #[tokio::test]
    async fn test_snapshot_written_under_dir() {
        let dir = tempfile::tempdir().unwrap();
        let snap = AbstractSnapshot {
            url: "https://x.org/doi/1".into(),
            title: Field::Available("T".into()),
            authors: Field::Available("A; B".into()),
            abstract_text: Field::Unavailable,
        };
        let path = write_snapshot(&dir.path().join("articles"), "article_1.json", &snap)
            .await
            .unwrap();
        let back: AbstractSnapshot =
            serde_json::from_str(&tokio::fs::read_to_string(path).await.unwrap()).unwrap();
        assert_eq!(back, snap);
    }
}
