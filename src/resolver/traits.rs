//! Seams between the resolver and the outside world
//!
//! The resolver only knows these traits; the HTTP-backed implementations live
//! in `sources` and `robots`, and tests plug in in-memory doubles.

use crate::model::{StructuredCitation, Work};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors from a bibliographic API lookup
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("DOI {doi} not found")]
    NotFound { doi: String },

    #[error("Lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Unexpected status {status}")]
    Status { status: u16 },

    #[error("Malformed response: {0}")]
    Parse(String),
}

/// Errors from fetching or scraping a page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timed out")]
    Timeout,

    #[error("Host unreachable: {0}")]
    Unreachable(String),

    #[error("HTTP status {status}")]
    HttpStatus { status: u16 },

    #[error("Not an HTML page (Content-Type {content_type})")]
    ContentMismatch { content_type: String },

    #[error("Could not parse page: {0}")]
    Parse(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("robots.txt disallows redirect target {url}")]
    Disallowed { url: String },
}

/// Looks works up by DOI
#[async_trait]
pub trait BibliographicClient: Send + Sync {
    async fn lookup_by_doi(&self, doi: &str, timeout: Duration) -> Result<Work, LookupError>;
}

/// What a page scrape found; every field is optional
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialWork {
    pub title: Option<String>,
    /// Printed author names
    pub authors: Vec<String>,
    pub date: Option<String>,
    pub doi: Option<String>,
    pub source: Option<String>,
    pub publisher: Option<String>,
    pub work_type: Option<String>,
    pub abstract_text: Option<String>,
    pub keywords: Vec<String>,
    /// Link to the page the data came from, after redirects
    pub link: Option<String>,
    /// References listed on the page, as structured entries
    pub references: Vec<StructuredCitation>,
}

impl PartialWork {
    pub fn is_empty(&self) -> bool {
        *self == PartialWork::default()
    }
}

/// Extracts bibliographic fields from a page
#[async_trait]
pub trait SiteScraper: Send + Sync {
    /// Short label used in logs
    fn name(&self) -> &str;

    async fn scrape(&self, url: &str) -> Result<PartialWork, FetchError>;
}

/// Decides whether a URL may be fetched (robots.txt)
#[async_trait]
pub trait PolitenessChecker: Send + Sync {
    async fn may_fetch(&self, url: &str) -> bool;
}
