//! robots.txt rules for one origin

use robotstxt::DefaultMatcher;

/// The robots.txt body of one origin, matched with the `robotstxt` crate
#[derive(Debug, Clone)]
pub struct RobotsRules {
    /// Raw robots.txt body; `None` means everything is allowed
    body: Option<String>,
}

impl RobotsRules {
    pub fn from_body(body: &str) -> Self {
        let body = body.trim();
        Self {
            body: (!body.is_empty()).then(|| body.to_string()),
        }
    }

    /// Rules used when the origin has no robots.txt or it cannot be loaded
    pub fn allow_all() -> Self {
        Self { body: None }
    }

    pub fn is_allow_all(&self) -> bool {
        self.body.is_none()
    }

    /// Checks a full URL against the rules for `agent`
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL of the page
    /// * `agent` - Product token of the crawler (e.g. `CiteRipple`)
    pub fn allows(&self, url: &str, agent: &str) -> bool {
        match &self.body {
            None => true,
            Some(body) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(body, agent, url)
            }
        }
    }
}
