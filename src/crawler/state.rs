//! Crawl lifecycle and the summary returned by a crawl

use crate::resolver::ResolveOutcome;
use std::collections::HashMap;
use std::fmt;

/// Where a crawl is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrawlState {
    #[default]
    Idle,
    Running,
    /// `crawl_limit` or `depth_limit` was reached with rows still queued
    StoppedByLimit,
    /// Every reachable row was visited
    Exhausted,
}

impl CrawlState {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::StoppedByLimit | Self::Exhausted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::StoppedByLimit => "stopped-by-limit",
            Self::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a crawl did
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    pub state: CrawlState,
    /// Rows visited through the frontier
    pub visited: usize,
    /// Waves completed (in hops mode, the deepest hop count reached)
    pub waves: usize,
    /// Rows appended to the table
    pub discovered: usize,
    /// Unvisited rows resolved by the cleanup pass
    pub cleanup_resolved: usize,
    pub outcomes: HashMap<ResolveOutcome, usize>,
}

impl CrawlReport {
    pub fn record_outcome(&mut self, outcome: ResolveOutcome) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
    }

    pub fn outcome_count(&self, outcome: ResolveOutcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }
}

impl fmt::Display for CrawlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "State:            {}", self.state)?;
        writeln!(f, "Visited:          {}", self.visited)?;
        writeln!(f, "Waves:            {}", self.waves)?;
        writeln!(f, "Discovered:       {}", self.discovered)?;
        writeln!(f, "Cleanup resolved: {}", self.cleanup_resolved)?;

        let outcomes = [
            ResolveOutcome::ApiLookup,
            ResolveOutcome::SiteScrape,
            ResolveOutcome::GenericScrape,
            ResolveOutcome::Denied,
            ResolveOutcome::Failed,
            ResolveOutcome::NoInformation,
        ];
        for outcome in outcomes {
            let count = self.outcome_count(outcome);
            if count > 0 {
                writeln!(f, "  {:<16}{}", outcome.to_string(), count)?;
            }
        }
        Ok(())
    }
}
