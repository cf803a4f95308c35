use serde::Deserialize;

/// Host fragments that get the `citation_*` meta-tag scraper out of the box
pub const DEFAULT_SCRAPER_SITES: &[&str] = &[
    "arxiv.org",
    "biorxiv.org",
    "medrxiv.org",
    "sciencedirect.com",
    "springer.com",
    "nature.com",
    "wiley.com",
    "tandfonline.com",
    "sagepub.com",
    "jstor.org",
    "plos.org",
    "mdpi.com",
    "frontiersin.org",
    "ieeexplore.ieee.org",
    "dl.acm.org",
    "academic.oup.com",
    "cambridge.org",
    "ssrn.com",
];

/// Main configuration structure for Cite-Ripple
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub scrapers: ScraperConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub seed: Vec<SeedEntry>,
}

/// How crawl depth is counted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthMode {
    /// A wave ends once every row present at its start has been processed
    #[default]
    Waves,
    /// Each record carries the hop count from its seed
    Hops,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Enrich each visited record through the resolver chain
    #[serde(rename = "use-api", default = "default_true")]
    pub use_api: bool,

    /// Maximum number of records to visit
    #[serde(rename = "crawl-limit")]
    pub crawl_limit: usize,

    /// Maximum number of waves (or hops) to expand
    #[serde(rename = "depth-limit")]
    pub depth_limit: usize,

    /// Consult robots.txt before scraping a page
    #[serde(rename = "be-polite", default = "default_true")]
    pub be_polite: bool,

    /// Pause after each visited record (milliseconds)
    #[serde(rename = "rate-limit-ms", default)]
    pub rate_limit_ms: u64,

    /// Timeout for a single bibliographic API lookup (milliseconds)
    #[serde(rename = "api-timeout-ms", default = "default_api_timeout_ms")]
    pub api_timeout_ms: u64,

    /// Timeout for a single page scrape (milliseconds)
    #[serde(rename = "scrape-timeout-ms", default = "default_scrape_timeout_ms")]
    pub scrape_timeout_ms: u64,

    #[serde(rename = "depth-mode", default)]
    pub depth_mode: DepthMode,

    /// Frontier priority given to discovered references (seeds use 0.0)
    #[serde(rename = "child-priority", default = "default_child_priority")]
    pub child_priority: f64,

    /// Look up each extracted reference by DOI before it joins the table
    #[serde(rename = "resolve-references", default)]
    pub resolve_references: bool,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the header value sent with every request
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; mailto:{})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Bibliographic API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(rename = "base-url", default = "default_api_base_url")]
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
        }
    }
}

/// Site-specific scraper configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    /// Host fragments handled by the meta-tag scraper; first match wins
    #[serde(default = "default_scraper_sites")]
    pub sites: Vec<String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            sites: default_scraper_sites(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// A seed work; at least one field must be present
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedEntry {
    pub doi: Option<String>,
    pub link: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    pub date: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_api_timeout_ms() -> u64 {
    10_000
}

fn default_scrape_timeout_ms() -> u64 {
    30_000
}

fn default_child_priority() -> f64 {
    0.001
}

fn default_api_base_url() -> String {
    "https://api.crossref.org".to_string()
}

fn default_scraper_sites() -> Vec<String> {
    DEFAULT_SCRAPER_SITES.iter().map(|s| s.to_string()).collect()
}
