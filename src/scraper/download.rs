//! Download extractor. Saves the A4 PDF documentation archive linked from the downloads page.

use crate::model::ResultTable;
use crate::scraper::error::ScraperError;
use crate::scraper::html::{find_tag, required_attr, AttrValue};
use crate::scraper::session::{fetch, fetch_document, Session};
use crate::scraper::{join_url, ExtractOptions, Extractor};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};

static PDF_A4_HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r".+pdf-a4\.zip$").expect("valid archive regex"));

/// Last path segment of `url`, used as the saved file name.
fn archive_file_name(url: &str) -> Result<String, ScraperError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| ScraperError::InvalidUrl {
        input: url.to_string(),
        reason: e.to_string(),
    })?;
    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .ok_or_else(|| ScraperError::InvalidUrl {
            input: url.to_string(),
            reason: "URL has no file name".to_string(),
        })
}

pub struct DownloadExtractor<'a> {
    session: &'a mut dyn Session,
}

impl<'a> DownloadExtractor<'a> {
    pub fn new(session: &'a mut dyn Session) -> Self {
        Self { session }
    }

    /// Absolute URL of the A4 PDF archive.
    fn archive_url(&mut self, downloads_url: &str) -> Result<String, ScraperError> {
        let doc = fetch_document(&mut *self.session, downloads_url)?;
        let table = find_tag(
            doc.root_element(),
            "table",
            &[("class", AttrValue::Equals("docutils"))],
        )?;
        let a = find_tag(table, "a", &[("href", AttrValue::Matches(&PDF_A4_HREF))])?;
        join_url(downloads_url, required_attr(a, "href")?)
    }
}

impl Extractor for DownloadExtractor<'_> {
    /// Writes the archive into the downloads directory. Never produces a table.
    fn extract(&mut self, options: &ExtractOptions<'_>) -> Result<Option<ResultTable>, ScraperError> {
        let downloads_url = join_url(&options.docs_url, "download.html")?;
        let archive_url = self.archive_url(&downloads_url)?;
        let file_name = archive_file_name(&archive_url)?;

        if let Err(e) = fs::create_dir_all(&options.downloads_dir) {
            error!(
                path = %options.downloads_dir.display(),
                error = %e,
                "CRITICAL: could not create downloads directory"
            );
            return Ok(None);
        }
        let archive_path: PathBuf = options.downloads_dir.join(file_name);

        let page = fetch(&mut *self.session, &archive_url)?;
        fs::write(&archive_path, &page.body).map_err(|e| ScraperError::Io {
            path: archive_path.clone(),
            source: e,
        })?;
        info!(path = %archive_path.display(), bytes = page.body.len(), "archive downloaded and saved");
        Ok(None)
    }
}
