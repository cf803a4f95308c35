//! Network-backed implementations of the resolver seams
//!
//! - [`CrossrefClient`]: DOI lookups against the Crossref REST API
//! - [`MetaTagScraper`]: pages with Highwire `citation_*` tags
//! - [`GenericScraper`]: any other HTML page

mod crossref;
pub mod fetch;
pub mod meta;

pub use crossref::CrossrefClient;
pub use fetch::{build_http_client, build_scraper_client, fetch_page, FetchedPage};

use crate::resolver::{FetchError, PartialWork, PolitenessChecker, ScraperRegistry, SiteScraper};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use tracing::debug;

/// Keeps the page URL only when the scrape found something
fn with_link(mut partial: PartialWork, final_url: String) -> PartialWork {
    if !partial.is_empty() {
        partial.link = Some(final_url);
    }
    partial
}

/// Scraper for publisher and preprint sites that emit `citation_*` tags
pub struct MetaTagScraper {
    client: Client,
    politeness: Option<Arc<dyn PolitenessChecker>>,
}

impl MetaTagScraper {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            politeness: None,
        }
    }

    /// Checks redirect targets before following them
    pub fn with_politeness(mut self, checker: Arc<dyn PolitenessChecker>) -> Self {
        self.politeness = Some(checker);
        self
    }
}

#[async_trait]
impl SiteScraper for MetaTagScraper {
    fn name(&self) -> &str {
        "citation-meta"
    }

    async fn scrape(&self, url: &str) -> Result<PartialWork, FetchError> {
        let page = fetch_page(&self.client, url, self.politeness.as_deref()).await?;
        let mut partial = meta::parse_citation_meta(&page.body);
        if partial.is_empty() {
            debug!("No citation_* tags on {}, trying generic metadata", page.final_url);
            partial = meta::parse_generic(&page.body, &page.final_url);
        }
        Ok(with_link(partial, page.final_url))
    }
}

/// Fallback scraper reading Dublin Core, OpenGraph and the page title
pub struct GenericScraper {
    client: Client,
    politeness: Option<Arc<dyn PolitenessChecker>>,
}

impl GenericScraper {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            politeness: None,
        }
    }

    /// Checks redirect targets before following them
    pub fn with_politeness(mut self, checker: Arc<dyn PolitenessChecker>) -> Self {
        self.politeness = Some(checker);
        self
    }
}

#[async_trait]
impl SiteScraper for GenericScraper {
    fn name(&self) -> &str {
        "generic"
    }

    async fn scrape(&self, url: &str) -> Result<PartialWork, FetchError> {
        let page = fetch_page(&self.client, url, self.politeness.as_deref()).await?;
        let partial = meta::parse_generic(&page.body, &page.final_url);
        Ok(with_link(partial, page.final_url))
    }
}

/// Registers a [`MetaTagScraper`] for every host fragment in `sites`
///
/// # Arguments
///
/// * `sites` - Host fragments, tried in order
/// * `client` - Shared HTTP client for all scrapers
/// * `politeness` - Checker for redirect targets, if crawling politely
pub fn build_scraper_registry(
    sites: &[String],
    client: Client,
    politeness: Option<Arc<dyn PolitenessChecker>>,
) -> ScraperRegistry {
    let mut meta = MetaTagScraper::new(client.clone());
    let mut generic = GenericScraper::new(client);
    if let Some(checker) = politeness {
        meta = meta.with_politeness(checker.clone());
        generic = generic.with_politeness(checker);
    }

    let meta: Arc<dyn SiteScraper> = Arc::new(meta);
    let mut registry = ScraperRegistry::new(Arc::new(generic));
    for site in sites {
        registry.register(site.as_str(), meta.clone());
    }
    registry
}
