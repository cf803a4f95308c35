//! robots.txt politeness
//!
//! [`RobotsChecker`] loads `/robots.txt` once per origin, keeps it for a day
//! and answers [`PolitenessChecker::may_fetch`]. Anything that prevents the
//! rules from loading (network failure, 4xx, 5xx) counts as permission.

mod cache;
mod parser;

pub use cache::{CachedRobots, ROBOTS_TTL_HOURS};
pub use parser::RobotsRules;

use crate::resolver::PolitenessChecker;
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

/// robots.txt-backed politeness checker
pub struct RobotsChecker {
    client: Client,
    /// Product token matched against `User-agent` lines
    agent: String,
    cache: Mutex<HashMap<String, CachedRobots>>,
}

impl RobotsChecker {
    pub fn new(client: Client, agent: impl Into<String>) -> Self {
        Self {
            client,
            agent: agent.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Number of origins with cached rules
    pub async fn cached_origins(&self) -> usize {
        self.cache.lock().await.len()
    }

    /// Fetches and parses robots.txt for the origin of `url`
    ///
    /// # Returns
    ///
    /// The parsed rules, or [`RobotsRules::allow_all`] when the file cannot be loaded
    async fn fetch_rules(&self, url: &Url) -> RobotsRules {
        let robots_url = match url.join("/robots.txt") {
            Ok(robots_url) => robots_url,
            Err(e) => {
                warn!("Cannot build robots.txt URL for {}: {}", url, e);
                return RobotsRules::allow_all();
            }
        };

        let response = match self.client.get(robots_url.as_str()).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Failed to fetch {}: {}, allowing", robots_url, e);
                return RobotsRules::allow_all();
            }
        };

        if !response.status().is_success() {
            debug!("{} returned {}, allowing", robots_url, response.status());
            return RobotsRules::allow_all();
        }

        match response.text().await {
            Ok(body) => RobotsRules::from_body(&body),
            Err(e) => {
                warn!("Failed to read {}: {}, allowing", robots_url, e);
                RobotsRules::allow_all()
            }
        }
    }
}

#[async_trait]
impl PolitenessChecker for RobotsChecker {
    async fn may_fetch(&self, url: &str) -> bool {
        let parsed = match Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => parsed,
            _ => {
                debug!("Not an HTTP URL, skipping robots check: {}", url);
                return true;
            }
        };
        let origin = parsed.origin().ascii_serialization();

        // The lock is held across the fetch so an origin is only requested once
        let mut cache = self.cache.lock().await;
        let needs_fetch = cache.get(&origin).map_or(true, CachedRobots::is_stale);
        if needs_fetch {
            let rules = self.fetch_rules(&parsed).await;
            cache.insert(origin.clone(), CachedRobots::new(rules));
        }

        cache
            .get(&origin)
            .map_or(true, |entry| entry.rules.allows(url, &self.agent))
    }
}
