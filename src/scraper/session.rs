//! Blocking HTTP session with a transparent response cache, and the page fetcher built on it.

use crate::scraper::cache::ResponseCache;
use crate::scraper::error::ScraperError;
use scraper::Html;
use std::backtrace::Backtrace;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, warn};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; pydoc-scrape/0.1)";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_REDIRECTS: usize = 10;

/// Raw response: final status and body bytes.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub status: u16,
    pub body: Vec<u8>,
    pub from_cache: bool,
}

impl Page {
    /// Body decoded as UTF-8 whatever charset the server declared. Invalid bytes become U+FFFD.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Anything that can GET a URL. Extractors only talk to this.
pub trait Session {
    fn get(&mut self, url: &str) -> Result<Page, ScraperError>;

    /// Drop stored responses. Returns how many were removed.
    fn clear_cache(&mut self) -> Result<usize, ScraperError> {
        Ok(0)
    }
}

/// Blocking reqwest client with an optional on-disk response cache.
#[derive(Debug)]
pub struct CachedSession {
    inner: reqwest::blocking::Client,
    cache: Option<ResponseCache>,
}

impl CachedSession {
    /// Builder for custom User-Agent, timeout, and cache location.
    pub fn builder() -> CachedSessionBuilder {
        CachedSessionBuilder::default()
    }
}

impl Session for CachedSession {
    /// Drop every cached response. Returns the number of entries removed (0 without a cache).
    fn clear_cache(&mut self) -> Result<usize, ScraperError> {
        match self.cache.as_mut() {
            Some(cache) => cache.clear(),
            None => Ok(0),
        }
    }

    fn get(&mut self, url: &str) -> Result<Page, ScraperError> {
        if let Some(hit) = self.cache.as_ref().and_then(|c| c.lookup(url)) {
            debug!(url, "cache hit");
            return Ok(Page {
                url: url.to_string(),
                status: hit.status,
                body: hit.body,
                from_cache: true,
            });
        }

        let response = self
            .inner
            .get(url)
            .send()
            .map_err(|e| ScraperError::Network {
                url: url.to_string(),
                source: Box::new(e),
            })?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|e| ScraperError::BodyRead {
                url: url.to_string(),
                source: e,
            })?
            .to_vec();
        let page = Page {
            url: url.to_string(),
            status,
            body,
            from_cache: false,
        };

        if page.is_success() {
            if let Some(cache) = self.cache.as_mut() {
                if let Err(e) = cache.store(url, status, &page.body) {
                    warn!(url, error = %e, "could not cache response");
                }
            }
        }
        Ok(page)
    }
}

/// Builder for CachedSession.
#[derive(Debug)]
pub struct CachedSessionBuilder {
    user_agent: Option<String>,
    timeout_secs: u64,
    cache_dir: Option<PathBuf>,
    cache_expire_secs: Option<u64>,
}

impl Default for CachedSessionBuilder {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            cache_dir: None,
            cache_expire_secs: None,
        }
    }
}

impl CachedSessionBuilder {
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Request timeout in seconds. Default 30.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Cache responses under this directory. Without it nothing is cached.
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Ignore cached responses older than this many seconds. Default: never expire.
    pub fn cache_expire_secs(mut self, secs: Option<u64>) -> Self {
        self.cache_expire_secs = secs;
        self
    }

    pub fn build(self) -> Result<CachedSession, ScraperError> {
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let inner = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(self.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(ScraperError::ClientBuild)?;
        let expire_after = self
            .cache_expire_secs
            .and_then(|s| i64::try_from(s).ok())
            .map(chrono::Duration::seconds);
        let cache = match self.cache_dir {
            Some(dir) => {
                let cache = ResponseCache::open(&dir, expire_after)?;
                debug!(dir = %dir.display(), entries = cache.len(), "response cache opened");
                Some(cache)
            }
            None => None,
        };
        Ok(CachedSession { inner, cache })
    }
}

/// GET `url` through `session`. Transport failures are logged with a backtrace and returned.
pub fn fetch(session: &mut dyn Session, url: &str) -> Result<Page, ScraperError> {
    match session.get(url) {
        Ok(page) => {
            if !page.is_success() {
                warn!(url, status = page.status, "non-success status");
            }
            Ok(page)
        }
        Err(e) => {
            error!(
                url,
                error = %e,
                backtrace = %Backtrace::force_capture(),
                "failed to load page"
            );
            Err(e)
        }
    }
}

/// Fetch `url` and parse it as an HTML document.
pub fn fetch_document(session: &mut dyn Session, url: &str) -> Result<Html, ScraperError> {
    let page = fetch(session, url)?;
    Ok(Html::parse_document(&page.text()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::test_support::{capture_logs, FakeSession};

    #[test]
    fn page_text_replaces_invalid_utf8() {
        let page = Page {
            url: "https://x/".into(),
            status: 200,
            body: vec![b'o', b'k', 0xff],
            from_cache: false,
        };
        assert_eq!(page.text(), "ok\u{fffd}");
    }

    #[test]
    fn page_text_decodes_utf8_regardless_of_charset() {
        let page = Page {
            url: "https://x/".into(),
            status: 200,
            body: "Статусы".as_bytes().to_vec(),
            from_cache: false,
        };
        assert_eq!(page.text(), "Статусы");
    }

    #[test]
    fn builder_without_cache_dir_has_no_cache() -> Result<(), ScraperError> {
        let mut session = CachedSession::builder().timeout_secs(5).build()?;
        assert_eq!(session.clear_cache()?, 0);
        Ok(())
    }

    #[test]
    fn cached_responses_are_served_without_network() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        {
            let mut cache = ResponseCache::open(dir.path(), None)?;
            cache.store("http://unreachable.invalid/page", 200, b"<p>cached</p>")?;
        }
        let mut session = CachedSession::builder().cache_dir(dir.path()).build()?;
        let page = session.get("http://unreachable.invalid/page")?;
        assert!(page.from_cache);
        assert_eq!(page.text(), "<p>cached</p>");
        Ok(())
    }

    #[test]
    fn opening_a_cache_logs_its_size() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        {
            let mut cache = ResponseCache::open(dir.path(), None)?;
            cache.store("https://peps.python.org/", 200, b"<p>index</p>")?;
        }
        let (session, logs) = capture_logs(|| CachedSession::builder().cache_dir(dir.path()).build());
        session?;
        assert!(logs.contains("response cache opened"));
        assert!(logs.contains("entries=1"));
        Ok(())
    }

    #[test]
    fn failed_fetch_logs_a_stack_trace() {
        let (result, logs) =
            capture_logs(|| fetch(&mut FakeSession::default(), "https://x.invalid/"));
        assert!(matches!(result, Err(ScraperError::Network { .. })));
        assert!(logs.contains("failed to load page"));
        assert!(!logs.contains("disabled backtrace"));
        assert!(logs.contains("session::fetch"));
    }
}
