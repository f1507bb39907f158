//! Shared error type for extractors. Separates an unreachable page from a page whose shape changed.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed transport cause, so sessions other than the HTTP one can report failures.
pub type TransportSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error raised while fetching pages or pulling structure out of them.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("Invalid URL: {input}: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("Failed to create HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    // Transport
    #[error("Network error: could not reach {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: TransportSource,
    },

    #[error("Failed to read response body from {url}: {source}")]
    BodyRead {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Page structure
    #[error("Tag not found: <{tag}> {filter}")]
    TagNotFound { tag: String, filter: String },

    #[error("Element not found: {message}")]
    ElementNotFound { message: String },

    #[error("Row has {found} column(s), header has {expected}")]
    RowArity { expected: usize, found: usize },

    // Local state
    #[error("Cache error at {path}: {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid cache index {path}: {source}")]
    CacheIndex {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ScraperError {
    /// True for failures where the page could not be fetched at all.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ScraperError::Network { .. } | ScraperError::BodyRead { .. }
        )
    }
}
