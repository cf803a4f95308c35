//! Bibliographic metadata from HTML pages
//!
//! Publisher and preprint pages embed Highwire Press `citation_*` meta tags;
//! other pages usually carry Dublin Core (`dc.*`), OpenGraph (`og:*`) or at
//! least a `<title>`.

use crate::identity::normalize::doi_from_link;
use crate::model::StructuredCitation;
use crate::resolver::PartialWork;
use scraper::{Html, Selector};
use serde_json::Value;
use url::Url;

/// Content of every `<meta>` whose `name` or `property` is one of `names`
fn meta_values(document: &Html, names: &[&str]) -> Vec<String> {
    let Ok(selector) = Selector::parse("meta[content]") else {
        return Vec::new();
    };

    let mut values = Vec::new();
    for name in names {
        for element in document.select(&selector) {
            let key = element
                .value()
                .attr("name")
                .or_else(|| element.value().attr("property"))
                .map(str::to_lowercase);
            if key.as_deref() != Some(*name) {
                continue;
            }
            if let Some(content) = element.value().attr("content") {
                let content = content.trim();
                if !content.is_empty() {
                    values.push(content.to_string());
                }
            }
        }
    }
    values
}

fn meta_first(document: &Html, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| meta_values(document, &[name]).into_iter().next())
}

/// Highwire dates use slashes (`2019/05/01`); ISO timestamps keep only the date
fn normalize_date(raw: &str) -> String {
    let date = raw.trim().replace('/', "-");
    match date.split_once('T') {
        Some((day, _)) => day.to_string(),
        None => date,
    }
}

fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// DOI of the page's canonical URL, when that URL is a DOI-resolver link
///
/// Anchors in the body are not consulted; they point at other works.
fn extract_canonical_doi(document: &Html, base_url: Option<&Url>) -> Option<String> {
    let selector = Selector::parse(r#"link[rel="canonical"][href]"#).ok()?;
    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .find_map(|link| doi_from_link(&link))
}

/// Resolves an href against the page URL; non-HTTP schemes are dropped
fn resolve_link(href: &str, base_url: Option<&Url>) -> Option<String> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute = match base_url {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };
    matches!(absolute.scheme(), "http" | "https").then(|| absolute.to_string())
}

/// Parses a Highwire `citation_reference` value
///
/// Values are either `key=value` pairs separated by `;` or a plain citation
/// string, which is kept as `unstructured`.
pub fn parse_reference(content: &str) -> StructuredCitation {
    let mut entry = StructuredCitation::new();
    let mut authors = Vec::new();

    for pair in content.split(';') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        let field = match key.trim().to_lowercase().as_str() {
            "citation_title" | "citation_article_title" => "article-title",
            "citation_journal_title" => "journal-title",
            "citation_year" | "citation_publication_date" | "citation_date" => "year",
            "citation_doi" => "DOI",
            "citation_isbn" => "ISBN",
            "citation_issn" => "ISSN",
            "citation_publisher" => "publisher",
            "citation_url" | "citation_pdf_url" => "URL",
            "citation_author" => {
                authors.push(Value::String(value.to_string()));
                continue;
            }
            _ => continue,
        };
        entry
            .entry(field.to_string())
            .or_insert_with(|| Value::String(value.to_string()));
    }

    if !authors.is_empty() {
        entry.insert("author".to_string(), Value::Array(authors));
    }

    if entry.is_empty() {
        entry.insert(
            "unstructured".to_string(),
            Value::String(content.trim().to_string()),
        );
    }
    entry
}

fn references(document: &Html) -> Vec<StructuredCitation> {
    meta_values(document, &["citation_reference"])
        .iter()
        .map(|content| parse_reference(content))
        .collect()
}

/// Reads the Highwire Press `citation_*` tags
pub fn parse_citation_meta(html: &str) -> PartialWork {
    let document = Html::parse_document(html);

    let work_type = if meta_first(&document, &["citation_journal_title"]).is_some() {
        Some("journal-article".to_string())
    } else if meta_first(&document, &["citation_conference_title"]).is_some() {
        Some("proceedings-article".to_string())
    } else if meta_first(&document, &["citation_dissertation_institution"]).is_some() {
        Some("thesis".to_string())
    } else if meta_first(&document, &["citation_technical_report_institution"]).is_some() {
        Some("report".to_string())
    } else {
        None
    };

    PartialWork {
        title: meta_first(&document, &["citation_title"]),
        authors: meta_values(&document, &["citation_author"]),
        date: meta_first(
            &document,
            &["citation_publication_date", "citation_date", "citation_online_date"],
        )
        .map(|d| normalize_date(&d)),
        doi: meta_first(&document, &["citation_doi"]),
        source: meta_first(
            &document,
            &[
                "citation_journal_title",
                "citation_conference_title",
                "citation_book_title",
            ],
        ),
        publisher: meta_first(&document, &["citation_publisher"]),
        work_type,
        abstract_text: meta_first(&document, &["citation_abstract"]),
        keywords: meta_values(&document, &["citation_keywords"])
            .iter()
            .flat_map(|k| k.split([';', ',']))
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect(),
        link: None,
        references: references(&document),
    }
}

/// Reads whatever common metadata a page has
///
/// Highwire tags are preferred, then Dublin Core, then OpenGraph, then the
/// `<title>` element. A DOI is only taken from page-level metadata.
pub fn parse_generic(html: &str, page_url: &str) -> PartialWork {
    let document = Html::parse_document(html);
    let base_url = Url::parse(page_url).ok();

    let title = meta_first(&document, &["citation_title", "dc.title", "og:title"])
        .or_else(|| extract_title(&document));

    let mut authors = meta_values(&document, &["citation_author"]);
    if authors.is_empty() {
        authors = meta_values(&document, &["dc.creator"]);
    }
    if authors.is_empty() {
        authors = meta_values(&document, &["author"]);
    }

    let doi = meta_first(&document, &["citation_doi"])
        .or_else(|| {
            meta_values(&document, &["dc.identifier"])
                .into_iter()
                .find(|id| id.to_lowercase().contains("10."))
        })
        .or_else(|| extract_canonical_doi(&document, base_url.as_ref()));

    PartialWork {
        title,
        authors,
        date: meta_first(
            &document,
            &[
                "citation_publication_date",
                "dc.date",
                "article:published_time",
            ],
        )
        .map(|d| normalize_date(&d)),
        doi,
        source: meta_first(&document, &["citation_journal_title", "og:site_name"]),
        publisher: meta_first(&document, &["citation_publisher", "dc.publisher"]),
        work_type: meta_first(&document, &["dc.type"]),
        abstract_text: meta_first(
            &document,
            &["citation_abstract", "dc.description", "description", "og:description"],
        ),
        keywords: meta_first(&document, &["keywords"])
            .map(|k| {
                k.split([';', ','])
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        link: None,
        references: references(&document),
    }
}
