//! Extractors and the plumbing they share: session, cache, tag lookup, and mode dispatch.

mod cache;
mod error;

pub mod download;
pub mod html;
pub mod latest_versions;
pub mod pep;
pub mod session;
pub mod status;
pub mod whats_new;

pub use cache::{CachedResponse, ResponseCache};
pub use error::ScraperError;
pub use session::{CachedSession, CachedSessionBuilder, Page, Session};

use crate::model::ResultTable;
use reqwest::Url;
use std::fmt;
use std::path::PathBuf;

pub const MAIN_DOC_URL: &str = "https://docs.python.org/3/";
pub const PEP_URL: &str = "https://peps.python.org/";

/// Resolve `href` against `base`, as a browser would.
pub fn join_url(base: &str, href: &str) -> Result<String, ScraperError> {
    let base_url = Url::parse(base).map_err(|e| ScraperError::InvalidUrl {
        input: base.to_string(),
        reason: e.to_string(),
    })?;
    base_url
        .join(href)
        .map(|u| u.to_string())
        .map_err(|e| ScraperError::InvalidUrl {
            input: href.to_string(),
            reason: e.to_string(),
        })
}

/// Which extractor to run. Names match the CLI's positional argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    WhatsNew,
    LatestVersions,
    Download,
    Pep,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::WhatsNew, Mode::LatestVersions, Mode::Download, Mode::Pep];

    pub fn name(self) -> &'static str {
        match self {
            Mode::WhatsNew => "whats-new",
            Mode::LatestVersions => "latest-versions",
            Mode::Download => "download",
            Mode::Pep => "pep",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inputs shared by every extractor: site roots, where downloads go, and an optional
/// per-sub-page progress callback `(done, total)`.
pub struct ExtractOptions<'a> {
    pub docs_url: String,
    pub pep_url: String,
    pub downloads_dir: PathBuf,
    pub progress: Option<&'a dyn Fn(u64, u64)>,
}

/// Implemented by each extractor. `Ok(None)` means there is nothing to render.
pub trait Extractor {
    fn extract(&mut self, options: &ExtractOptions<'_>) -> Result<Option<ResultTable>, ScraperError>;
}

/// Dispatch by mode: build the matching extractor and run it.
pub fn extract(
    mode: Mode,
    session: &mut dyn Session,
    options: &ExtractOptions<'_>,
) -> Result<Option<ResultTable>, ScraperError> {
    match mode {
        Mode::WhatsNew => whats_new::WhatsNewExtractor::new(session).extract(options),
        Mode::LatestVersions => latest_versions::LatestVersionsExtractor::new(session).extract(options),
        Mode::Download => download::DownloadExtractor::new(session).extract(options),
        Mode::Pep => pep::PepExtractor::new(session).extract(options),
    }
}
