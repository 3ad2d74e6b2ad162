//! Append-only delimited outputs.
//!
//! A sink writes its header only when the file is new or empty, so a
//! resumed run keeps appending to the same file. Each append is flushed
//! before returning; the caller marks progress only after that.

use crate::error::HarvestError;
use crate::models::{ArticleRecord, Author, Field};
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Header of the bibliographic sink (one row per article × author).
pub const ARTICLE_HEADER: [&str; 9] = [
    "Title",
    "Journal",
    "DOI",
    "PublicationDate",
    "Author",
    "Email",
    "AuthorProfileURL",
    "AuthorContributions",
    "URL",
];

/// Header of the merged abstract sink.
pub const ABSTRACT_HEADER: [&str; 4] = ["file", "title", "authors", "abstract"];

/// An append-only delimited file with a fixed header.
#[derive(Debug, Clone)]
pub struct DelimitedSink {
    path: PathBuf,
    delimiter: u8,
    header: &'static [&'static str],
}

impl DelimitedSink {
    /// `Title;Journal;…;URL`, semicolon-delimited.
    pub fn articles(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b';',
            header: &ARTICLE_HEADER,
        }
    }

    /// `file,title,authors,abstract`, comma-delimited.
    pub fn abstracts(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
            header: &ABSTRACT_HEADER,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `rows`, writing the header first if the file is new or empty.
    pub fn append<R, I, S>(&self, rows: R) -> Result<usize, HarvestError>
    where
        R: IntoIterator<Item = I>,
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| HarvestError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| HarvestError::io(&self.path, e))?;
        let is_empty = file
            .metadata()
            .map_err(|e| HarvestError::io(&self.path, e))?
            .len()
            == 0;

        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .from_writer(file);

        if is_empty {
            writer.write_record(self.header)?;
        }
        let mut written = 0;
        for row in rows {
            writer.write_record(row)?;
            written += 1;
        }
        writer
            .flush()
            .map_err(|e| HarvestError::io(&self.path, e))?;
        debug!(path = %self.path.display(), rows = written, "Appended rows");
        Ok(written)
    }
}

/// Flatten an article into one row per author.
///
/// An article without any listed author still yields one row, with the
/// author columns unavailable, so it is visible in the output.
pub fn article_rows(record: &ArticleRecord) -> Vec<[String; 9]> {
    let placeholder = [Author::default()];
    let authors: &[Author] = if record.authors.is_empty() {
        &placeholder
    } else {
        &record.authors
    };

    authors
        .iter()
        .map(|author| {
            [
                record.title.to_string(),
                record.journal.to_string(),
                record.doi.to_string(),
                record.publication_date.to_string(),
                author.name.to_string(),
                author.email.to_string(),
                author.profile_url.to_string(),
                author.contributions.to_string(),
                record.source_url.clone(),
            ]
        })
        .collect()
}

/// Row of the merged abstract sink.
pub fn abstract_row(
    file: &str,
    title: &Field,
    authors: &Field,
    abstract_text: &Field,
) -> [String; 4] {
    [
        file.to_string(),
        title.to_string(),
        authors.to_string(),
        abstract_text.to_string(),
    ]
}
