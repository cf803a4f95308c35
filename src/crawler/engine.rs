//! Crawl engine: the resolve, extract, insert, enqueue loop
//!
//! Every row present when a crawl starts is a seed. Each visited row is
//! resolved (when the API is enabled), its references are extracted into the
//! same works table, and rows that were appended are queued as children.

use crate::config::{Config, CrawlConfig, DepthMode};
use crate::crawler::frontier::{Frontier, FrontierEntry, SEED_PRIORITY};
use crate::crawler::state::{CrawlReport, CrawlState};
use crate::model::CitationPayload;
use crate::references::{ExtractOptions, ReferenceExtractor};
use crate::registry::Works;
use crate::resolver::{
    BibliographicClient, PolitenessChecker, ResolveOutcome, Resolver, ResolverSettings,
};
use crate::robots::RobotsChecker;
use crate::sources::{build_http_client, build_scraper_client, build_scraper_registry, CrossrefClient};
use crate::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Limits and pacing for one crawl
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub use_api: bool,
    pub crawl_limit: usize,
    pub depth_limit: usize,
    pub depth_mode: DepthMode,
    /// Pause after each fetch
    pub rate_limit: Duration,
    /// Priority of discovered rows; seeds use [`SEED_PRIORITY`]
    pub child_priority: f64,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            use_api: true,
            crawl_limit: 100,
            depth_limit: 1,
            depth_mode: DepthMode::Waves,
            rate_limit: Duration::ZERO,
            child_priority: 0.001,
        }
    }
}

impl From<&CrawlConfig> for CrawlSettings {
    fn from(config: &CrawlConfig) -> Self {
        Self {
            use_api: config.use_api,
            crawl_limit: config.crawl_limit,
            depth_limit: config.depth_limit,
            depth_mode: config.depth_mode,
            rate_limit: Duration::from_millis(config.rate_limit_ms),
            child_priority: config.child_priority,
        }
    }
}

/// Wave bookkeeping in [`DepthMode::Waves`]
///
/// A wave ends once as many rows have been processed as the table held when
/// the wave began. This approximates citation depth by table growth.
#[derive(Debug)]
struct WaveCounter {
    depth: usize,
    processed: usize,
    length_at_start: usize,
}

impl WaveCounter {
    fn new(table_len: usize) -> Self {
        Self {
            depth: 0,
            processed: 0,
            length_at_start: table_len,
        }
    }

    /// Counts a processed row and returns true if it closed the wave
    fn record(&mut self, table_len: usize) -> bool {
        self.processed += 1;
        if self.processed >= self.length_at_start {
            self.depth += 1;
            self.processed = 0;
            self.length_at_start = table_len;
            return true;
        }
        false
    }
}

/// Drives a crawl over a works table
pub struct CrawlEngine {
    settings: CrawlSettings,
    resolver: Resolver,
    extractor: ReferenceExtractor,
    state: CrawlState,
}

impl CrawlEngine {
    pub fn new(settings: CrawlSettings, resolver: Resolver, extractor: ReferenceExtractor) -> Self {
        Self {
            settings,
            resolver,
            extractor,
            state: CrawlState::Idle,
        }
    }

    /// Builds an engine backed by Crossref, the configured scrapers and robots.txt
    ///
    /// # Errors
    ///
    /// Returns `RippleError::HttpClient` if an HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_timeout = Duration::from_millis(config.crawl.api_timeout_ms);
        let scrape_timeout = Duration::from_millis(config.crawl.scrape_timeout_ms);

        let api: Arc<dyn BibliographicClient> =
            Arc::new(CrossrefClient::new(&config.api.base_url, &config.user_agent)?);
        let http = build_http_client(&config.user_agent, scrape_timeout)?;
        let pages = build_scraper_client(&config.user_agent, scrape_timeout)?;
        let robots: Arc<dyn PolitenessChecker> = Arc::new(RobotsChecker::new(
            http,
            config.user_agent.crawler_name.clone(),
        ));
        let gate = config.crawl.be_polite.then(|| robots.clone());

        let resolver = Resolver::new(ResolverSettings::from(&config.crawl))
            .with_client(api.clone())
            .with_scrapers(build_scraper_registry(&config.scrapers.sites, pages, gate))
            .with_politeness(robots);

        let extractor = ReferenceExtractor::new(ExtractOptions {
            add_work_ids: true,
            update_from_doi: config.crawl.resolve_references,
            lookup_timeout: api_timeout,
        })
        .with_client(api);

        Ok(Self::new(CrawlSettings::from(&config.crawl), resolver, extractor))
    }

    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    /// Crawls outward from every row in `works`
    ///
    /// The table is mutated in place: visited rows are overwritten with their
    /// resolved version and discovered references are appended. The visited
    /// set starts empty on every call.
    ///
    /// # Returns
    ///
    /// A [`CrawlReport`] whose `state` is `Exhausted` when the frontier ran dry
    /// and `StoppedByLimit` when a limit ended the loop.
    pub async fn crawl(&mut self, works: &mut Works) -> CrawlReport {
        self.state = CrawlState::Running;
        works.sync();

        let initial_len = works.len();
        let mut report = CrawlReport::default();
        let mut frontier = Frontier::new();
        for index in 0..initial_len {
            frontier.push(index, SEED_PRIORITY, 0);
        }

        info!(
            "Starting crawl over {} seed rows (crawl limit {}, depth limit {}, {:?} mode)",
            initial_len, self.settings.crawl_limit, self.settings.depth_limit, self.settings.depth_mode
        );

        let start_time = Instant::now();
        let mut waves = WaveCounter::new(initial_len);
        let mut deepest_hop = 0usize;
        let mut limited = false;

        loop {
            if frontier.visited_count() >= self.settings.crawl_limit {
                info!("Crawl limit of {} records reached", self.settings.crawl_limit);
                limited = !frontier.is_empty();
                break;
            }
            if self.settings.depth_mode == DepthMode::Waves && waves.depth >= self.settings.depth_limit {
                info!("Depth limit of {} waves reached", self.settings.depth_limit);
                limited = !frontier.is_empty();
                break;
            }

            let Some(entry) = frontier.pop_unvisited() else {
                break;
            };

            if self.settings.depth_mode == DepthMode::Hops && entry.hops >= self.settings.depth_limit {
                tracing::trace!("Row {} is {} hops out, beyond the depth limit", entry.index, entry.hops);
                limited = true;
                continue;
            }

            self.visit(works, &mut frontier, &entry, &mut report).await;
            deepest_hop = deepest_hop.max(entry.hops + 1);

            if self.settings.depth_mode == DepthMode::Waves && waves.record(works.len()) {
                debug!("Wave {} complete, table now holds {} rows", waves.depth, works.len());
            }

            let visited = frontier.visited_count();
            if visited % 10 == 0 {
                let rate = visited as f64 / start_time.elapsed().as_secs_f64().max(f64::EPSILON);
                info!(
                    "Progress: {} records visited, {} in frontier, {} rows, {:.2} records/sec",
                    visited,
                    frontier.len(),
                    works.len(),
                    rate
                );
            }

            self.pause().await;
        }

        report.visited = frontier.visited_count();
        report.waves = match self.settings.depth_mode {
            DepthMode::Waves => waves.depth,
            DepthMode::Hops => deepest_hop,
        };

        if self.settings.use_api {
            self.cleanup(works, &frontier, &mut report).await;
        }

        report.discovered = works.len().saturating_sub(initial_len);
        self.state = if limited {
            CrawlState::StoppedByLimit
        } else {
            CrawlState::Exhausted
        };
        report.state = self.state;

        info!(
            "Crawl {}: {} visited, {} discovered, {} resolved in cleanup, in {:?}",
            report.state,
            report.visited,
            report.discovered,
            report.cleanup_resolved,
            start_time.elapsed()
        );

        report
    }

    /// Resolves one row, appends its references and queues the new rows
    async fn visit(
        &self,
        works: &mut Works,
        frontier: &mut Frontier,
        entry: &FrontierEntry,
        report: &mut CrawlReport,
    ) {
        let Some(record) = works.row(entry.index).cloned() else {
            warn!("Frontier points past the table (row {}), skipping", entry.index);
            frontier.mark_visited(entry.index);
            return;
        };

        let mut record = if self.settings.use_api {
            let (resolved, outcome) = self.resolver.resolve_with_outcome(record).await;
            debug!("Row {} resolved via {}", entry.index, outcome);
            report.record_outcome(outcome);
            resolved
        } else {
            record
        };

        // Revisits reuse the references found last time
        let payload = if record.citations.is_resolved() && !record.citations.is_empty() {
            &record.citations
        } else {
            &record.citations_data
        };
        let children = self.extractor.extract(payload).await;
        let before = works.len();

        let mut cited = Works::new();
        for child in children.into_rows() {
            let insertion = works.insert(child);
            if cited.contains(&insertion.id) {
                continue;
            }
            if let Some(row) = works.row(insertion.index) {
                cited.restore(row.clone());
            }
        }
        let cited_count = cited.len();
        record.citations = CitationPayload::Resolved(cited);

        if let Err(e) = works.replace(entry.index, record) {
            warn!("Could not store row {}: {}", entry.index, e);
        }
        frontier.mark_visited(entry.index);

        let appended = works.len() - before;
        for index in before..works.len() {
            frontier.push(index, self.settings.child_priority, entry.hops + 1);
        }
        debug!(
            "Row {} visited: {} references, {} new rows",
            entry.index, cited_count, appended
        );
    }

    /// Resolves every row the loop never reached
    async fn cleanup(&self, works: &mut Works, frontier: &Frontier, report: &mut CrawlReport) {
        let pending: Vec<usize> = (0..works.len()).filter(|&i| !frontier.is_visited(i)).collect();
        if pending.is_empty() {
            return;
        }
        info!("Cleanup pass over {} unvisited rows", pending.len());

        for index in pending {
            let Some(record) = works.row(index).cloned() else {
                continue;
            };
            let (resolved, outcome) = self.resolver.resolve_with_outcome(record).await;
            report.record_outcome(outcome);

            match outcome {
                ResolveOutcome::ApiLookup | ResolveOutcome::SiteScrape | ResolveOutcome::GenericScrape => {
                    report.cleanup_resolved += 1;
                }
                _ => {}
            }

            if let Err(e) = works.replace(index, resolved) {
                warn!("Could not store row {}: {}", index, e);
            }
            if outcome != ResolveOutcome::NoInformation {
                self.pause().await;
            }
        }
    }

    async fn pause(&self) {
        if !self.settings.rate_limit.is_zero() {
            tokio::time::sleep(self.settings.rate_limit).await;
        }
    }
}
