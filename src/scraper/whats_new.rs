//! "What's New" extractor. Walks the index of release notes and reads the heading and
//! author/editor block of each one.

use crate::model::ResultTable;
use crate::scraper::error::ScraperError;
use crate::scraper::html::{element_text, find_all, find_tag, required_attr, AttrValue};
use crate::scraper::session::{fetch, fetch_document, Session};
use crate::scraper::{join_url, ExtractOptions, Extractor};
use tracing::{info, warn};

pub const HEADER: [&str; 3] = ["Ссылка на статью", "Заголовок", "Редактор, Автор"];

pub struct WhatsNewExtractor<'a> {
    session: &'a mut dyn Session,
}

impl<'a> WhatsNewExtractor<'a> {
    pub fn new(session: &'a mut dyn Session) -> Self {
        Self { session }
    }

    /// Links to every release-notes page listed on the index, in listing order.
    fn release_links(&mut self, index_url: &str) -> Result<Vec<String>, ScraperError> {
        let doc = fetch_document(&mut *self.session, index_url)?;
        let main = find_tag(
            doc.root_element(),
            "section",
            &[("id", AttrValue::Equals("what-s-new-in-python"))],
        )?;
        let wrapper = find_tag(
            main,
            "div",
            &[("class", AttrValue::Equals("toctree-wrapper"))],
        )?;
        let mut links = Vec::new();
        for item in find_all(wrapper, "li", &[("class", AttrValue::Equals("toctree-l1"))]) {
            let a = find_tag(item, "a", &[("href", AttrValue::Any)])?;
            links.push(join_url(index_url, required_attr(a, "href")?)?);
        }
        Ok(links)
    }
}

/// Heading and flattened first definition list of one release-notes page.
pub(crate) fn parse_release_page(html: &str) -> Result<(String, String), ScraperError> {
    let doc = scraper::Html::parse_document(html);
    let root = doc.root_element();
    let h1 = find_tag(root, "h1", &[])?;
    let dl = find_tag(root, "dl", &[])?;
    let dl_text = element_text(dl).replace('\n', " ");
    Ok((element_text(h1), dl_text))
}

impl Extractor for WhatsNewExtractor<'_> {
    /// Sub-pages that cannot be fetched are logged and skipped; a fetched page missing its
    /// heading or definition list still fails the run.
    fn extract(&mut self, options: &ExtractOptions<'_>) -> Result<Option<ResultTable>, ScraperError> {
        let index_url = join_url(&options.docs_url, "whatsnew/")?;
        let links = self.release_links(&index_url)?;
        let total = links.len() as u64;
        let mut table = ResultTable::new(&HEADER);
        for (n, link) in (1u64..).zip(links) {
            if let Some(progress) = options.progress {
                progress(n, total);
            }
            let page = match fetch(&mut *self.session, &link) {
                Ok(page) => page,
                Err(e) if e.is_transport() => {
                    warn!(url = %link, error = %e, "skipping release notes page");
                    continue;
                }
                Err(e) => return Err(e),
            };
            let (heading, editors) = parse_release_page(&page.text())?;
            table.push_row(vec![link, heading, editors])?;
        }
        info!(rows = table.rows().len(), "what's new pages collected");
        Ok(Some(table))
    }
}
