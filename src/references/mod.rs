//! Turning a work's reference payload into works
//!
//! Structured reference dictionaries are mapped field by field, falling back to
//! the free-text citation when no title is present. Plain link lists keep each
//! link, also reading a DOI out of resolver URLs and parsing entries that are
//! not URLs as free-text citations. Already-resolved payloads are returned
//! unchanged.

mod unstructured;

pub use unstructured::parse_unstructured;

use crate::identity::normalize::{bare_doi, doi_from_link, doi_url, find_url};
use crate::model::{AuthorDetails, CitationPayload, StructuredCitation, Work, WorkType};
use crate::registry::Works;
use crate::resolver::BibliographicClient;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

const TITLE_KEYS: &[&str] = &["article-title", "title", "volume-title", "series-title"];
const DATE_KEYS: &[&str] = &["year", "date", "issued"];
const SOURCE_KEYS: &[&str] = &["journal-title", "source", "container-title"];
const DOI_KEYS: &[&str] = &["DOI", "doi"];
const ISBN_KEYS: &[&str] = &["ISBN", "isbn"];
const ISSN_KEYS: &[&str] = &["ISSN", "issn"];
const LINK_KEYS: &[&str] = &["URL", "url", "link"];

/// Reference extraction options
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Assign IDs while building the registry (otherwise rows wait for a sync)
    pub add_work_ids: bool,
    /// Look each reference up by DOI and merge what the API returns
    pub update_from_doi: bool,
    pub lookup_timeout: Duration,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            add_work_ids: true,
            update_from_doi: false,
            lookup_timeout: Duration::from_secs(10),
        }
    }
}

/// Builds child registries from reference payloads
#[derive(Clone, Default)]
pub struct ReferenceExtractor {
    options: ExtractOptions,
    client: Option<Arc<dyn BibliographicClient>>,
}

impl ReferenceExtractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self {
            options,
            client: None,
        }
    }

    /// Client used when `update_from_doi` is set
    pub fn with_client(mut self, client: Arc<dyn BibliographicClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extracts the references of one work into a new registry
    ///
    /// An empty payload yields an empty registry.
    pub async fn extract(&self, payload: &CitationPayload) -> Works {
        if let CitationPayload::Resolved(works) = payload {
            return works.clone();
        }

        let mut records = records_from(payload);

        if self.options.update_from_doi {
            if let Some(client) = &self.client {
                for record in records.iter_mut() {
                    let Some(doi) = record.doi_fragment() else {
                        continue;
                    };
                    match client.lookup_by_doi(&doi, self.options.lookup_timeout).await {
                        Ok(found) => record.update_from(found),
                        Err(e) => debug!("Reference lookup for {} failed: {}", doi, e),
                    }
                }
            }
        }

        let works = collect_registry(records, self.options.add_work_ids);
        trace!("Extracted {} references from {} entries", works.len(), payload.len());
        works
    }
}

/// Extracts references without any lookups
pub fn extract_references(payload: &CitationPayload, add_work_ids: bool) -> Works {
    if let CitationPayload::Resolved(works) = payload {
        return works.clone();
    }
    collect_registry(records_from(payload), add_work_ids)
}

fn records_from(payload: &CitationPayload) -> Vec<Work> {
    match payload {
        CitationPayload::Empty | CitationPayload::Resolved(_) => Vec::new(),
        CitationPayload::Structured(entries) => entries.iter().map(work_from_citation).collect(),
        CitationPayload::Links(links) => links.iter().map(|l| work_from_link(l)).collect(),
    }
}

fn collect_registry(records: Vec<Work>, add_work_ids: bool) -> Works {
    let mut works = Works::new();
    for record in records {
        if add_work_ids {
            works.insert(record);
        } else {
            works.push_row(record);
        }
    }
    works
}

/// First non-empty string under any of `keys`; numbers and string lists are accepted
fn text_field(entry: &StructuredCitation, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match entry.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string),
        _ => None,
    })
}

fn authors_field(entry: &StructuredCitation) -> Vec<AuthorDetails> {
    match entry.get("author") {
        Some(Value::String(name)) if !name.trim().is_empty() => vec![AuthorDetails::from_name(name)],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(name) if !name.trim().is_empty() => Some(AuthorDetails::from_name(name)),
                Value::Object(fields) => {
                    let field = |key: &str| {
                        fields
                            .get(key)
                            .and_then(Value::as_str)
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(str::to_string)
                    };
                    let author = AuthorDetails {
                        given_name: field("given"),
                        family_name: field("family"),
                        full_name: field("name"),
                        orcid: field("ORCID"),
                        ..Default::default()
                    };
                    author.display_name().map(|_| author)
                }
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Maps one structured reference onto a work
pub fn work_from_citation(entry: &StructuredCitation) -> Work {
    let mut work = Work {
        title: text_field(entry, TITLE_KEYS),
        authors: authors_field(entry),
        date: text_field(entry, DATE_KEYS),
        source: text_field(entry, SOURCE_KEYS),
        publisher: text_field(entry, &["publisher"]),
        doi: text_field(entry, DOI_KEYS).and_then(|d| bare_doi(&d)),
        isbn: text_field(entry, ISBN_KEYS),
        issn: text_field(entry, ISSN_KEYS),
        link: text_field(entry, LINK_KEYS),
        work_type: text_field(entry, &["type"]).map(|t| WorkType::from_label(&t)),
        ..Default::default()
    };

    if work.title.is_none() {
        if let Some(text) = text_field(entry, &["unstructured"]) {
            work.update_from(parse_unstructured(&text));
        }
    }

    work
}

/// Builds a work from a bare reference string: URL, DOI, or free text
fn work_from_link(entry: &str) -> Work {
    let entry = entry.trim();
    let lower = entry.to_lowercase();

    if lower.starts_with("http://") || lower.starts_with("https://") {
        let mut work = Work::from_link(entry);
        work.doi = doi_from_link(entry);
        return work;
    }

    if let Some(doi) = bare_doi(entry).filter(|_| lower.starts_with("10.") || lower.starts_with("doi:")) {
        let mut work = Work::from_doi(doi.clone());
        work.link = Some(doi_url(&doi));
        return work;
    }

    let mut work = parse_unstructured(entry);
    if work.link.is_none() {
        work.link = find_url(entry);
    }
    work
}
