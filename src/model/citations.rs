use crate::model::non_empty;
use crate::registry::Works;
use serde_json::{Map, Value};
use tracing::debug;

/// One reference as a bibliographic API reports it (Crossref `reference` entries)
pub type StructuredCitation = Map<String, Value>;

/// A work's references in whichever shape they were found
///
/// The shape is decided once, when data is ingested, so consumers match on the
/// variant instead of inspecting values at runtime.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CitationPayload {
    #[default]
    Empty,
    /// Reference dictionaries from an API
    Structured(Vec<StructuredCitation>),
    /// Bare reference links or strings from a scrape
    Links(Vec<String>),
    /// References already turned into works
    Resolved(Works),
}

impl CitationPayload {
    /// Classifies an ingested JSON value
    ///
    /// Arrays of objects become `Structured`, arrays of strings become `Links`.
    /// Anything else, including mixed arrays, is treated as empty.
    pub fn from_json(value: &Value) -> Self {
        let Value::Array(items) = value else {
            return Self::Empty;
        };

        if items.is_empty() {
            return Self::Empty;
        }

        if items.iter().all(Value::is_object) {
            return Self::Structured(
                items
                    .iter()
                    .filter_map(|item| item.as_object().cloned())
                    .collect(),
            );
        }

        if items.iter().all(Value::is_string) {
            let links: Vec<String> = items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            return if links.is_empty() {
                Self::Empty
            } else {
                Self::Links(links)
            };
        }

        debug!(
            "Ignoring malformed citation payload with {} mixed entries",
            items.len()
        );
        Self::Empty
    }

    /// Renders the payload as JSON; resolved works become reference dictionaries
    pub fn to_json(&self) -> Value {
        match self {
            Self::Empty => Value::Null,
            Self::Structured(items) => {
                Value::Array(items.iter().cloned().map(Value::Object).collect())
            }
            Self::Links(links) => Value::Array(links.iter().cloned().map(Value::String).collect()),
            Self::Resolved(works) => Value::Array(
                works
                    .rows()
                    .map(|work| {
                        let mut entry = Map::new();
                        let mut put = |key: &str, value: &Option<String>| {
                            if let Some(v) = non_empty(value) {
                                entry.insert(key.to_string(), Value::String(v.to_string()));
                            }
                        };
                        put("work_id", &work.work_id);
                        put("article-title", &work.title);
                        put("year", &work.date);
                        put("journal-title", &work.source);
                        put("DOI", &work.doi);
                        put("ISBN", &work.isbn);
                        put("URL", &work.link);
                        if let Some(family) = work.first_author_family() {
                            entry.insert("author".to_string(), Value::String(family));
                        }
                        Value::Object(entry)
                    })
                    .collect(),
            ),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Structured(items) => items.len(),
            Self::Links(links) => links.len(),
            Self::Resolved(works) => works.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}
