//! pydoc-scrape: CLI scraper for the Python documentation and the PEP index.

pub mod cli;
pub mod config;
pub mod logging;
pub mod model;
pub mod output;
pub mod scraper;

// Re-exports for CLI and consumers.
pub use model::ResultTable;
pub use output::{control_output, OutputError, OutputMode, OutputRequest};
pub use self::scraper::{
    extract, CachedSession, CachedSessionBuilder, ExtractOptions, Extractor, Mode, Page,
    ScraperError, Session,
};
