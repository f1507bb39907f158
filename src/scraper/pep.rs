//! PEP status census. Visits every PEP in the numerical index, reads its "Status:" field,
//! and counts PEPs per status, warning when the status disagrees with the index preview.

use crate::model::ResultTable;
use crate::scraper::error::ScraperError;
use crate::scraper::html::{
    element_text, find_all, find_tag, next_sibling_element, required_attr, AttrValue,
};
use crate::scraper::session::{fetch, fetch_document, Session};
use crate::scraper::status::{expected_statuses, is_expected, StatusCensus};
use crate::scraper::{join_url, ExtractOptions, Extractor};
use scraper::ElementRef;
use tracing::{info, warn};

const STATUS_TERM: &str = "Status:";

/// One row of the numerical index: preview status code and absolute PEP link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IndexEntry {
    pub preview: String,
    pub link: String,
}

/// Preview status code from the first cell's text: everything after the leading type marker.
fn preview_code(cell_text: &str) -> String {
    cell_text.trim().chars().skip(1).collect()
}

fn parse_index_row(row: ElementRef<'_>, pep_url: &str) -> Result<IndexEntry, ScraperError> {
    let td = find_tag(row, "td", &[])?;
    let a = find_tag(row, "a", &[("href", AttrValue::Any)])?;
    Ok(IndexEntry {
        preview: preview_code(&element_text(td)),
        link: join_url(pep_url, required_attr(a, "href")?)?,
    })
}

/// Every "Status:" value on a PEP page. Normally exactly one.
pub(crate) fn page_statuses(html: &str) -> Vec<String> {
    let doc = scraper::Html::parse_document(html);
    find_all(doc.root_element(), "dt", &[])
        .into_iter()
        .filter(|dt| element_text(*dt) == STATUS_TERM)
        .map(|dt| {
            next_sibling_element(dt)
                .map(|dd| element_text(dd).trim().to_string())
                .unwrap_or_default()
        })
        .collect()
}

pub struct PepExtractor<'a> {
    session: &'a mut dyn Session,
}

impl<'a> PepExtractor<'a> {
    pub fn new(session: &'a mut dyn Session) -> Self {
        Self { session }
    }

    fn index_entries(&mut self, pep_url: &str) -> Result<Vec<IndexEntry>, ScraperError> {
        let doc = fetch_document(&mut *self.session, pep_url)?;
        let section = find_tag(
            doc.root_element(),
            "section",
            &[("id", AttrValue::Equals("numerical-index"))],
        )?;
        let tbody = find_tag(section, "tbody", &[])?;
        find_all(tbody, "tr", &[])
            .into_iter()
            .map(|tr| parse_index_row(tr, pep_url))
            .collect()
    }
}

impl Extractor for PepExtractor<'_> {
    fn extract(&mut self, options: &ExtractOptions<'_>) -> Result<Option<ResultTable>, ScraperError> {
        let entries = self.index_entries(&options.pep_url)?;
        let total = entries.len() as u64;
        let mut census = StatusCensus::default();
        for (n, entry) in (1u64..).zip(&entries) {
            if let Some(progress) = options.progress {
                progress(n, total);
            }
            let page = fetch(&mut *self.session, &entry.link)?;
            for status in page_statuses(&page.text()) {
                census.record(&status);
                if !is_expected(&entry.preview, &status) {
                    warn!(
                        link = %entry.link,
                        status = %status,
                        expected = ?expected_statuses(&entry.preview),
                        "status mismatch"
                    );
                }
            }
        }
        info!(peps = census.total(), statuses = census.distinct(), "PEP census complete");
        census.into_table().map(Some)
    }
}
