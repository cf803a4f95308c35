//! Record resolution
//!
//! Enriches a work through a fallback chain:
//!
//! 1. DOI known: ask the bibliographic API. On failure, fall through to a
//!    scrape of the DOI resolver URL.
//! 2. No DOI but the link points at a DOI resolver: take the DOI from the link
//!    and continue as in 1.
//! 3. Link only: check politeness, then scrape with the site-specific scraper
//!    for the host or the generic one, bounded by the scrape timeout.
//! 4. Nothing to go on: the record is returned unchanged.
//!
//! Every failure is logged and the record is returned with whatever it held
//! before; resolution never removes information.

mod dispatch;
mod traits;

pub use dispatch::{ScraperChoice, ScraperRegistry};
pub use traits::{
    BibliographicClient, FetchError, LookupError, PartialWork, PolitenessChecker, SiteScraper,
};

use crate::config::CrawlConfig;
use crate::identity::normalize::{bare_doi, doi_url};
use crate::model::{non_empty, AuthorDetails, CitationPayload, Work, WorkType};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Which step of the chain produced the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolveOutcome {
    ApiLookup,
    SiteScrape,
    GenericScrape,
    /// Politeness forbade fetching the page
    Denied,
    /// A lookup or scrape was attempted and failed
    Failed,
    /// No DOI and no link
    NoInformation,
}

impl fmt::Display for ResolveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ApiLookup => "api-lookup",
            Self::SiteScrape => "site-scrape",
            Self::GenericScrape => "generic-scrape",
            Self::Denied => "denied",
            Self::Failed => "failed",
            Self::NoInformation => "no-information",
        };
        f.write_str(label)
    }
}

/// Resolver timeouts and politeness switch
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub be_polite: bool,
    pub api_timeout: Duration,
    pub scrape_timeout: Duration,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            be_polite: true,
            api_timeout: Duration::from_secs(10),
            scrape_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&CrawlConfig> for ResolverSettings {
    fn from(config: &CrawlConfig) -> Self {
        Self {
            be_polite: config.be_polite,
            api_timeout: Duration::from_millis(config.api_timeout_ms),
            scrape_timeout: Duration::from_millis(config.scrape_timeout_ms),
        }
    }
}

impl From<PartialWork> for Work {
    fn from(partial: PartialWork) -> Self {
        let citations_data = if partial.references.is_empty() {
            CitationPayload::Empty
        } else {
            CitationPayload::Structured(partial.references)
        };

        Work {
            title: partial.title,
            authors: partial
                .authors
                .iter()
                .map(|name| AuthorDetails::from_name(name))
                .collect(),
            date: partial.date,
            doi: partial.doi.and_then(|doi| bare_doi(&doi)),
            source: partial.source,
            publisher: partial.publisher,
            work_type: partial.work_type.map(|label| WorkType::from_label(&label)),
            abstract_text: partial.abstract_text,
            keywords: partial.keywords,
            link: partial.link,
            citations_data,
            ..Default::default()
        }
    }
}

/// Runs the resolution fallback chain
#[derive(Default)]
pub struct Resolver {
    settings: ResolverSettings,
    client: Option<Arc<dyn BibliographicClient>>,
    scrapers: Option<ScraperRegistry>,
    politeness: Option<Arc<dyn PolitenessChecker>>,
}

impl Resolver {
    pub fn new(settings: ResolverSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    pub fn with_client(mut self, client: Arc<dyn BibliographicClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_scrapers(mut self, scrapers: ScraperRegistry) -> Self {
        self.scrapers = Some(scrapers);
        self
    }

    pub fn with_politeness(mut self, checker: Arc<dyn PolitenessChecker>) -> Self {
        self.politeness = Some(checker);
        self
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Resolves a work, discarding the outcome
    pub async fn resolve(&self, work: Work) -> Work {
        self.resolve_with_outcome(work).await.0
    }

    /// Resolves a work and reports which step produced the result
    pub async fn resolve_with_outcome(&self, mut work: Work) -> (Work, ResolveOutcome) {
        let Some(doi) = work.doi_fragment() else {
            return match non_empty(&work.link).map(str::to_string) {
                Some(link) => self.scrape(work, &link).await,
                None => {
                    debug!("Nothing to resolve: record has neither DOI nor link");
                    (work, ResolveOutcome::NoInformation)
                }
            };
        };

        if non_empty(&work.doi).is_none() {
            work.doi = Some(doi.clone());
        }

        match &self.client {
            Some(client) => {
                let lookup = client.lookup_by_doi(&doi, self.settings.api_timeout);
                let result = match tokio::time::timeout(self.settings.api_timeout, lookup).await {
                    Ok(result) => result,
                    Err(_) => Err(LookupError::Timeout(self.settings.api_timeout)),
                };
                match result {
                    Ok(found) => {
                        work.update_from(found);
                        return (work, ResolveOutcome::ApiLookup);
                    }
                    Err(e) => warn!("DOI lookup failed for {}: {}", doi, e),
                }
            }
            None => debug!("No bibliographic client configured, scraping {}", doi),
        }

        let url = doi_url(&doi);
        if non_empty(&work.link).is_none() {
            work.link = Some(url.clone());
        }
        self.scrape(work, &url).await
    }

    async fn scrape(&self, mut work: Work, url: &str) -> (Work, ResolveOutcome) {
        if self.settings.be_polite {
            if let Some(checker) = &self.politeness {
                if !checker.may_fetch(url).await {
                    info!("robots.txt disallows {}, leaving record as is", url);
                    return (work, ResolveOutcome::Denied);
                }
            }
        }

        let Some(scrapers) = &self.scrapers else {
            debug!("No scrapers configured, cannot fetch {}", url);
            return (work, ResolveOutcome::Failed);
        };

        let choice = scrapers.select(url);
        let outcome = match &choice {
            ScraperChoice::Site { fragment, .. } => {
                debug!("Scraping {} with site scraper for '{}'", url, fragment);
                ResolveOutcome::SiteScrape
            }
            ScraperChoice::Generic(_) => {
                debug!("Scraping {} with generic scraper", url);
                ResolveOutcome::GenericScrape
            }
        };
        let scraper = choice.scraper();

        match tokio::time::timeout(self.settings.scrape_timeout, scraper.scrape(url)).await {
            Ok(Ok(partial)) if partial.is_empty() => {
                debug!("{} scraper found nothing on {}", scraper.name(), url);
                (work, ResolveOutcome::Failed)
            }
            Ok(Ok(partial)) => {
                work.update_from(Work::from(partial));
                (work, outcome)
            }
            Ok(Err(FetchError::Disallowed { url: target })) => {
                info!("robots.txt disallows {} (redirected from {}), leaving record as is", target, url);
                (work, ResolveOutcome::Denied)
            }
            Ok(Err(e)) => {
                warn!("Scrape of {} failed: {}", url, e);
                (work, ResolveOutcome::Failed)
            }
            Err(_) => {
                warn!(
                    "Scrape of {} timed out after {:?}",
                    url, self.settings.scrape_timeout
                );
                (work, ResolveOutcome::Failed)
            }
        }
    }
}
