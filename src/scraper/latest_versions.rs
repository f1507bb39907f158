//! Latest-versions extractor. Reads the "All versions" list from the documentation sidebar.

use crate::model::ResultTable;
use crate::scraper::error::ScraperError;
use crate::scraper::html::{element_text, find_all, find_tag, required_attr, AttrValue};
use crate::scraper::session::{fetch_document, Session};
use crate::scraper::{ExtractOptions, Extractor};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::error;

pub const HEADER: [&str; 3] = ["Ссылка на статью", "Заголовок", "Редактор, автор"];

const ALL_VERSIONS_MARKER: &str = "All versions";

/// `Python <major>.<minor> (<status>)`, e.g. `Python 3.13 (stable)`.
static VERSION_STATUS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Python (?P<version>\d\.\d+) \((?P<status>.*)\)").expect("valid version regex")
});

/// Split sidebar link text into (version, status). Text that does not match is returned whole
/// as the version with an empty status.
pub fn split_version(text: &str) -> (String, String) {
    match VERSION_STATUS.captures(text) {
        Some(caps) => (caps["version"].to_string(), caps["status"].to_string()),
        None => (text.to_string(), String::new()),
    }
}

pub struct LatestVersionsExtractor<'a> {
    session: &'a mut dyn Session,
}

impl<'a> LatestVersionsExtractor<'a> {
    pub fn new(session: &'a mut dyn Session) -> Self {
        Self { session }
    }
}

impl Extractor for LatestVersionsExtractor<'_> {
    fn extract(&mut self, options: &ExtractOptions<'_>) -> Result<Option<ResultTable>, ScraperError> {
        let doc = fetch_document(&mut *self.session, &options.docs_url)?;
        let sidebar = find_tag(
            doc.root_element(),
            "div",
            &[("class", AttrValue::Equals("sphinxsidebarwrapper"))],
        )?;
        let list = find_all(sidebar, "ul", &[])
            .into_iter()
            .find(|ul| element_text(*ul).contains(ALL_VERSIONS_MARKER))
            .ok_or_else(|| {
                let message = format!("no list containing {:?} in sidebar", ALL_VERSIONS_MARKER);
                error!(url = %options.docs_url, "{}", message);
                ScraperError::ElementNotFound { message }
            })?;

        let mut table = ResultTable::new(&HEADER);
        for a in find_all(list, "a", &[("href", AttrValue::Any)]) {
            let link = required_attr(a, "href")?.to_string();
            let (version, status) = split_version(&element_text(a));
            table.push_row(vec![link, version, status])?;
        }
        Ok(Some(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::test_support::{options, FakeSession};

    const DOCS: &str = "https://docs.python.org/3/";

    #[test]
    fn split_version_with_status() {
        assert_eq!(
            split_version("Python 3.10 (stable)"),
            ("3.10".to_string(), "stable".to_string())
        );
        assert_eq!(
            split_version("Python 3.14 (in development)"),
            ("3.14".to_string(), "in development".to_string())
        );
    }

    #[test]
    fn split_version_without_status_keeps_whole_text() {
        assert_eq!(
            split_version("Python 2.0"),
            ("Python 2.0".to_string(), String::new())
        );
        assert_eq!(
            split_version("All versions"),
            ("All versions".to_string(), String::new())
        );
    }

    #[test]
    fn rows_from_all_versions_list() -> Result<(), ScraperError> {
        let html = r#"<html><body><div class="sphinxsidebar"><div class="sphinxsidebarwrapper">
<h3>Navigation</h3><ul><li><a href="genindex.html">Index</a></li></ul>
<ul>
<li><a href="https://docs.python.org/3.14/">Python 3.14 (in development)</a></li>
<li><a href="https://docs.python.org/3.13/">Python 3.13 (stable)</a></li>
<li><a href="https://docs.python.org/2.7/">Python 2.7</a></li>
<li><a href="https://www.python.org/doc/versions/">All versions</a></li>
</ul></div></div></body></html>"#;
        let mut session = FakeSession::default().with_page(DOCS, html);
        let table = LatestVersionsExtractor::new(&mut session)
            .extract(&options(DOCS))?
            .ok_or(ScraperError::ElementNotFound {
                message: "no table".into(),
            })?;
        assert_eq!(table.header(), &HEADER);
        let rows = table.rows();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], vec!["https://docs.python.org/3.14/", "3.14", "in development"]);
        assert_eq!(rows[1], vec!["https://docs.python.org/3.13/", "3.13", "stable"]);
        assert_eq!(rows[2], vec!["https://docs.python.org/2.7/", "Python 2.7", ""]);
        assert_eq!(rows[3], vec!["https://www.python.org/doc/versions/", "All versions", ""]);
        Ok(())
    }

    #[test]
    fn missing_marker_is_element_not_found() {
        let html = r#"<html><body><div class="sphinxsidebarwrapper">
<ul><li><a href="genindex.html">Index</a></li></ul></div></body></html>"#;
        let mut session = FakeSession::default().with_page(DOCS, html);
        let result = LatestVersionsExtractor::new(&mut session).extract(&options(DOCS));
        assert!(matches!(result, Err(ScraperError::ElementNotFound { .. })));
    }

    #[test]
    fn missing_sidebar_is_tag_not_found() {
        let mut session = FakeSession::default().with_page(DOCS, "<html><body></body></html>");
        let result = LatestVersionsExtractor::new(&mut session).extract(&options(DOCS));
        assert!(matches!(result, Err(ScraperError::TagNotFound { .. })));
    }
}
