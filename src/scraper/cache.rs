//! On-disk response cache. One body file per URL plus a JSON index.

use crate::scraper::error::ScraperError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    file: String,
    status: u16,
    stored_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheIndex {
    next_id: u64,
    entries: BTreeMap<String, CacheEntry>,
}

/// Cached response body with the status it was stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Response cache rooted at a directory. Entries older than `expire_after` are ignored.
#[derive(Debug)]
pub struct ResponseCache {
    dir: PathBuf,
    index: CacheIndex,
    expire_after: Option<Duration>,
}

impl ResponseCache {
    /// Open (creating if needed) the cache at `dir`. A corrupt index is logged and replaced.
    pub fn open(dir: &Path, expire_after: Option<Duration>) -> Result<Self, ScraperError> {
        fs::create_dir_all(dir).map_err(|e| ScraperError::Cache {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let index_path = dir.join(INDEX_FILE);
        let index = match fs::read_to_string(&index_path) {
            Ok(s) => match serde_json::from_str::<CacheIndex>(&s) {
                Ok(index) => index,
                Err(e) => {
                    warn!(path = %index_path.display(), error = %e, "cache index unreadable, starting empty");
                    CacheIndex::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CacheIndex::default(),
            Err(e) => {
                return Err(ScraperError::Cache {
                    path: index_path,
                    source: e,
                })
            }
        };
        Ok(Self {
            dir: dir.to_path_buf(),
            index,
            expire_after,
        })
    }

    pub fn len(&self) -> usize {
        self.index.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.entries.is_empty()
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        match self.expire_after {
            Some(ttl) => Utc::now() - entry.stored_at < ttl,
            None => true,
        }
    }

    /// Cached response for `url`, if present and fresh. A missing body file counts as a miss.
    pub fn lookup(&self, url: &str) -> Option<CachedResponse> {
        let entry = self.index.entries.get(url)?;
        if !self.is_fresh(entry) {
            return None;
        }
        let body = fs::read(self.dir.join(&entry.file)).ok()?;
        Some(CachedResponse {
            status: entry.status,
            body,
        })
    }

    /// Store `body` for `url`, replacing any previous entry, and persist the index.
    pub fn store(&mut self, url: &str, status: u16, body: &[u8]) -> Result<(), ScraperError> {
        let file = match self.index.entries.get(url) {
            Some(existing) => existing.file.clone(),
            None => {
                self.index.next_id += 1;
                format!("{:08}.body", self.index.next_id)
            }
        };
        let body_path = self.dir.join(&file);
        fs::write(&body_path, body).map_err(|e| ScraperError::Cache {
            path: body_path,
            source: e,
        })?;
        self.index.entries.insert(
            url.to_string(),
            CacheEntry {
                file,
                status,
                stored_at: Utc::now(),
            },
        );
        self.save_index()
    }

    /// Remove every entry and its body file. Returns how many entries were removed.
    pub fn clear(&mut self) -> Result<usize, ScraperError> {
        let removed = self.len();
        for entry in self.index.entries.values() {
            let path = self.dir.join(&entry.file);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(ScraperError::Cache { path, source: e }),
            }
        }
        self.index = CacheIndex::default();
        self.save_index()?;
        Ok(removed)
    }

    fn save_index(&self) -> Result<(), ScraperError> {
        let path = self.dir.join(INDEX_FILE);
        let json = serde_json::to_string_pretty(&self.index).map_err(|e| ScraperError::CacheIndex {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, json).map_err(|e| ScraperError::Cache { path, source: e })
    }
}
