//! Crossref REST API client
//!
//! `GET {base}/works/{doi}`; the base URL is configurable so tests can point it
//! at a local mock server.

use crate::config::UserAgentConfig;
use crate::identity::normalize::bare_doi;
use crate::model::{AuthorDetails, CitationPayload, FunderDetails, Work, WorkType};
use crate::resolver::{BibliographicClient, LookupError};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

static JATS_MARKUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?jats:[^>]+>").expect("JATS pattern is valid"));

#[derive(Debug, Deserialize)]
struct CrossrefResponse {
    message: CrossrefWork,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CrossrefWork {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    title: Vec<String>,
    author: Vec<CrossrefAuthor>,
    #[serde(rename = "container-title")]
    container_title: Vec<String>,
    publisher: Option<String>,
    #[serde(rename = "type")]
    work_type: Option<String>,
    issued: Option<CrossrefDate>,
    #[serde(rename = "published-print")]
    published_print: Option<CrossrefDate>,
    #[serde(rename = "published-online")]
    published_online: Option<CrossrefDate>,
    #[serde(rename = "ISBN")]
    isbn: Vec<String>,
    #[serde(rename = "ISSN")]
    issn: Vec<String>,
    #[serde(rename = "URL")]
    url: Option<String>,
    link: Option<Value>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    subject: Vec<String>,
    funder: Vec<CrossrefFunder>,
    reference: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CrossrefAuthor {
    given: Option<String>,
    family: Option<String>,
    name: Option<String>,
    #[serde(rename = "ORCID")]
    orcid: Option<String>,
    affiliation: Vec<CrossrefAffiliation>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CrossrefAffiliation {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CrossrefFunder {
    name: Option<String>,
    #[serde(rename = "DOI")]
    doi: Option<String>,
    award: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CrossrefDate {
    #[serde(rename = "date-parts")]
    date_parts: Vec<Vec<Option<i64>>>,
}

impl CrossrefDate {
    /// `YYYY`, `YYYY-MM` or `YYYY-MM-DD`
    fn render(&self) -> Option<String> {
        let parts: Vec<i64> = self
            .date_parts
            .first()?
            .iter()
            .map_while(|part| *part)
            .collect();
        match parts.as_slice() {
            [] => None,
            [year] => Some(format!("{:04}", year)),
            [year, month] => Some(format!("{:04}-{:02}", year, month)),
            [year, month, day, ..] => Some(format!("{:04}-{:02}-{:02}", year, month, day)),
        }
    }
}

/// Picks a URL out of a link value that may be a string, an object or a list
fn link_url(value: &Value) -> Option<String> {
    match value {
        Value::String(url) if !url.trim().is_empty() => Some(url.trim().to_string()),
        Value::Object(fields) => fields.get("URL").and_then(link_url),
        Value::Array(items) => items.iter().find_map(link_url),
        _ => None,
    }
}

fn first(values: Vec<String>) -> Option<String> {
    values.into_iter().map(|v| v.trim().to_string()).find(|v| !v.is_empty())
}

impl CrossrefWork {
    fn into_work(self) -> Work {
        let date = [&self.issued, &self.published_print, &self.published_online]
            .into_iter()
            .flatten()
            .find_map(CrossrefDate::render);

        let authors = self
            .author
            .into_iter()
            .map(|a| {
                let full_name = match (&a.given, &a.family) {
                    (Some(given), Some(family)) => Some(format!("{} {}", given, family)),
                    (None, Some(family)) => Some(family.clone()),
                    _ => a.name.clone(),
                };
                AuthorDetails {
                    full_name,
                    given_name: a.given,
                    family_name: a.family.or(a.name),
                    orcid: a.orcid,
                    affiliations: a.affiliation.into_iter().filter_map(|af| af.name).collect(),
                    ..Default::default()
                }
            })
            .collect();

        let funders = self
            .funder
            .into_iter()
            .filter(|f| f.name.is_some() || f.doi.is_some())
            .map(|f| FunderDetails {
                name: f.name,
                crossref_id: f.doi,
                awards: f.award,
                ..Default::default()
            })
            .collect();

        let link = self
            .url
            .filter(|u| !u.trim().is_empty())
            .or_else(|| self.link.as_ref().and_then(link_url));

        Work {
            title: first(self.title),
            authors,
            date,
            source: first(self.container_title),
            publisher: self.publisher,
            work_type: self.work_type.map(|t| WorkType::from_label(&t)),
            doi: self.doi.and_then(|d| bare_doi(&d)),
            isbn: first(self.isbn),
            issn: first(self.issn),
            link,
            abstract_text: self
                .abstract_text
                .map(|a| JATS_MARKUP.replace_all(&a, "").trim().to_string()),
            keywords: self.subject,
            funders,
            citations_data: self
                .reference
                .as_ref()
                .map(CitationPayload::from_json)
                .unwrap_or_default(),
            ..Default::default()
        }
    }
}

/// Crossref `works` endpoint client
#[derive(Debug, Clone)]
pub struct CrossrefClient {
    client: Client,
    base_url: String,
}

impl CrossrefClient {
    /// Builds a client that identifies itself with the configured user agent
    ///
    /// The contact email in the user agent puts requests in Crossref's polite pool.
    pub fn new(base_url: &str, user_agent: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent.header_value())
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl BibliographicClient for CrossrefClient {
    async fn lookup_by_doi(&self, doi: &str, timeout: Duration) -> Result<Work, LookupError> {
        let doi = bare_doi(doi).unwrap_or_else(|| doi.trim().to_string());
        let url = format!("{}/works/{}", self.base_url, doi);
        debug!("Crossref lookup: {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LookupError::Timeout(timeout)
                } else {
                    LookupError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound { doi });
        }
        if !status.is_success() {
            return Err(LookupError::Status {
                status: status.as_u16(),
            });
        }

        let body: CrossrefResponse = response
            .json()
            .await
            .map_err(|e| LookupError::Parse(e.to_string()))?;

        let mut work = body.message.into_work();
        if work.doi.is_none() {
            work.doi = Some(doi);
        }
        Ok(work)
    }
}
