//! Shared fixtures

use async_trait::async_trait;
use cite_ripple::config::UserAgentConfig;
use cite_ripple::model::{CitationPayload, Work};
use cite_ripple::resolver::{
    BibliographicClient, FetchError, LookupError, PartialWork, PolitenessChecker, SiteScraper,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn create_test_user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

/// Structured references with titles and years but no DOI or link
pub fn titled_references(titles: &[&str]) -> CitationPayload {
    let entries: Vec<Value> = titles
        .iter()
        .map(|title| json!({"article-title": title, "year": "2001"}))
        .collect();
    CitationPayload::from_json(&Value::Array(entries))
}

/// Structured references that carry only a DOI
pub fn doi_references(dois: &[&str]) -> CitationPayload {
    let entries: Vec<Value> = dois.iter().map(|doi| json!({"DOI": doi})).collect();
    CitationPayload::from_json(&Value::Array(entries))
}

/// Bibliographic client answering from a fixed table and recording every call
#[derive(Default)]
pub struct ScriptedClient {
    answers: HashMap<String, Work>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn with_answer(mut self, doi: &str, work: Work) -> Self {
        self.answers.insert(doi.to_string(), work);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BibliographicClient for ScriptedClient {
    async fn lookup_by_doi(&self, doi: &str, _timeout: Duration) -> Result<Work, LookupError> {
        self.calls.lock().unwrap().push(doi.to_string());
        self.answers
            .get(doi)
            .cloned()
            .ok_or_else(|| LookupError::NotFound {
                doi: doi.to_string(),
            })
    }
}

/// Scraper that counts calls and returns a fixed result
pub struct CountingScraper {
    pub calls: AtomicUsize,
    pub result: PartialWork,
}

impl CountingScraper {
    pub fn returning(result: PartialWork) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            result,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SiteScraper for CountingScraper {
    fn name(&self) -> &str {
        "counting"
    }

    async fn scrape(&self, _url: &str) -> Result<PartialWork, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.result.clone())
    }
}

/// Politeness checker with a fixed verdict
pub struct FixedVerdict(pub bool);

#[async_trait]
impl PolitenessChecker for FixedVerdict {
    async fn may_fetch(&self, _url: &str) -> bool {
        self.0
    }
}
