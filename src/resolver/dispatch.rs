use crate::resolver::SiteScraper;
use std::sync::Arc;
use url::Url;

/// The scraper picked for a URL
pub enum ScraperChoice<'a> {
    Site {
        fragment: &'a str,
        scraper: &'a Arc<dyn SiteScraper>,
    },
    Generic(&'a Arc<dyn SiteScraper>),
}

impl<'a> ScraperChoice<'a> {
    pub fn scraper(&self) -> &'a Arc<dyn SiteScraper> {
        match self {
            Self::Site { scraper, .. } => *scraper,
            Self::Generic(scraper) => *scraper,
        }
    }
}

/// Site-specific scrapers keyed by host fragment, with a generic fallback
///
/// Fragments are tried in registration order and the first one contained in
/// the URL's host wins.
pub struct ScraperRegistry {
    sites: Vec<(String, Arc<dyn SiteScraper>)>,
    generic: Arc<dyn SiteScraper>,
}

impl ScraperRegistry {
    pub fn new(generic: Arc<dyn SiteScraper>) -> Self {
        Self {
            sites: Vec::new(),
            generic,
        }
    }

    pub fn register(&mut self, fragment: impl Into<String>, scraper: Arc<dyn SiteScraper>) {
        self.sites.push((fragment.into().to_lowercase(), scraper));
    }

    pub fn with_site(mut self, fragment: impl Into<String>, scraper: Arc<dyn SiteScraper>) -> Self {
        self.register(fragment, scraper);
        self
    }

    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    pub fn select(&self, url: &str) -> ScraperChoice<'_> {
        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
            .unwrap_or_else(|| url.to_lowercase());

        self.sites
            .iter()
            .find(|(fragment, _)| host.contains(fragment.as_str()))
            .map(|(fragment, scraper)| ScraperChoice::Site {
                fragment: fragment.as_str(),
                scraper,
            })
            .unwrap_or(ScraperChoice::Generic(&self.generic))
    }
}
