//! Error types for the harvest pipelines.
//!
//! Page-level failures are [`FetchError`]; everything that can stop a stage
//! (configuration, persistence, decoding) is a [`HarvestError`]. Field-level
//! extraction misses are not errors at all; they surface as
//! [`crate::models::Field::Unavailable`].

use std::path::PathBuf;
use std::time::Duration;

/// Failures reported by a [`crate::fetcher::PageFetcher`].
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    /// Navigation did not complete within the configured timeout.
    #[error("navigation to {url} timed out after {timeout:?}")]
    NavigationTimeout { url: String, timeout: Duration },

    /// Transport-level failure (DNS, TLS, connection reset, proxy refusal).
    #[error("network error loading {url}: {message}")]
    Network { url: String, message: String },

    /// The server answered with a non-success status.
    #[error("{url} answered with HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// A required element never appeared on the loaded page.
    #[error("selector `{selector}` not found within {timeout:?}")]
    SelectorNotFound { selector: String, timeout: Duration },

    /// The selector string itself could not be parsed.
    #[error("invalid selector `{0}`")]
    InvalidSelector(String),

    /// An extraction or wait was attempted before any navigation succeeded.
    #[error("no page is loaded")]
    NoPage,
}

impl FetchError {
    /// Whether a retry of the same navigation could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::NavigationTimeout { .. } | Self::Network { .. } => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            Self::SelectorNotFound { .. } => true,
            Self::InvalidSelector(_) | Self::NoPage => false,
        }
    }
}

/// Errors that abort a stage of the harvest.
#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A numeric or structured field could not be parsed.
    #[error("could not parse {field} from {value:?}")]
    ParseFailure { field: &'static str, value: String },

    /// Reading or writing a persisted list or output sink failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration is internally inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl HarvestError {
    /// Attach a path to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
