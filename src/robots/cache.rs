//! Per-origin robots.txt cache entries

use crate::robots::RobotsRules;
use chrono::{DateTime, Duration, Utc};

/// Hours after which a cached robots.txt is fetched again
pub const ROBOTS_TTL_HOURS: i64 = 24;

/// Rules for one origin and when they were fetched
#[derive(Debug, Clone)]
pub struct CachedRobots {
    pub rules: RobotsRules,
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    pub fn new(rules: RobotsRules) -> Self {
        Self {
            rules,
            fetched_at: Utc::now(),
        }
    }

    /// True once the entry is older than [`ROBOTS_TTL_HOURS`]
    pub fn is_stale(&self) -> bool {
        Utc::now() - self.fetched_at > Duration::hours(ROBOTS_TTL_HOURS)
    }
}
