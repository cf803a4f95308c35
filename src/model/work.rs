use crate::identity::normalize::{bare_doi, doi_from_link};
use crate::model::{fill_text, non_empty, union_into, AuthorDetails, CitationPayload, FunderDetails};

/// The kind of publication a work is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkType {
    Article,
    Book,
    Chapter,
    Conference,
    Dataset,
    Preprint,
    Report,
    Thesis,
    Website,
    Other(String),
}

impl WorkType {
    /// Maps a free-form type label (Crossref, Highwire, or config) onto a work type
    pub fn from_label(label: &str) -> Self {
        let normalized = label.trim().to_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "journal-article" | "article" | "journal" | "review" => Self::Article,
            "book" | "monograph" | "edited-book" | "reference-book" => Self::Book,
            "book-chapter" | "chapter" | "book-section" | "book-part" => Self::Chapter,
            "proceedings-article" | "proceedings" | "conference" | "conference-paper" => {
                Self::Conference
            }
            "dataset" => Self::Dataset,
            "posted-content" | "preprint" => Self::Preprint,
            "report" | "report-component" => Self::Report,
            "dissertation" | "thesis" => Self::Thesis,
            "website" | "webpage" | "web-page" => Self::Website,
            _ => Self::Other(normalized),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Article => "article",
            Self::Book => "book",
            Self::Chapter => "chapter",
            Self::Conference => "conference",
            Self::Dataset => "dataset",
            Self::Preprint => "preprint",
            Self::Report => "report",
            Self::Thesis => "thesis",
            Self::Website => "website",
            Self::Other(label) => label,
        }
    }
}

/// A bibliographic work and the references it cites
///
/// `citations_data` holds the raw reference payload as ingested; `citations`
/// holds the references once they have been turned into works.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Work {
    pub work_id: Option<String>,
    pub title: Option<String>,
    pub authors: Vec<AuthorDetails>,
    pub date: Option<String>,
    pub source: Option<String>,
    pub publisher: Option<String>,
    pub repository: Option<String>,
    pub work_type: Option<WorkType>,
    pub doi: Option<String>,
    pub isbn: Option<String>,
    pub issn: Option<String>,
    pub link: Option<String>,
    pub abstract_text: Option<String>,
    pub keywords: Vec<String>,
    pub funders: Vec<FunderDetails>,
    pub citations: CitationPayload,
    pub citations_data: CitationPayload,
}

impl Work {
    pub fn from_doi(doi: impl Into<String>) -> Self {
        Self {
            doi: Some(doi.into()),
            ..Default::default()
        }
    }

    pub fn from_link(link: impl Into<String>) -> Self {
        Self {
            link: Some(link.into()),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_author(mut self, name: &str) -> Self {
        self.authors.push(AuthorDetails::from_name(name));
        self
    }

    /// The work's DOI without resolver prefixes, taken from `doi` or a DOI-resolver `link`
    pub fn doi_fragment(&self) -> Option<String> {
        non_empty(&self.doi)
            .and_then(bare_doi)
            .or_else(|| non_empty(&self.link).and_then(doi_from_link))
    }

    /// Family name of the alphabetically first author
    pub fn first_author_family(&self) -> Option<String> {
        self.authors
            .iter()
            .filter_map(AuthorDetails::family_token)
            .min()
    }

    /// True when the record holds a DOI or link the resolver can start from
    pub fn has_locator(&self) -> bool {
        non_empty(&self.doi).is_some() || non_empty(&self.link).is_some()
    }

    /// Merges `other` into this record without losing anything already known
    ///
    /// Text fields are overwritten only when empty or when the incoming value is
    /// longer. List fields take the longer list. `work_id` is never touched.
    pub fn update_from(&mut self, other: Work) {
        fill_text(&mut self.title, other.title);
        fill_text(&mut self.date, other.date);
        fill_text(&mut self.source, other.source);
        fill_text(&mut self.publisher, other.publisher);
        fill_text(&mut self.repository, other.repository);
        fill_text(&mut self.doi, other.doi);
        fill_text(&mut self.isbn, other.isbn);
        fill_text(&mut self.issn, other.issn);
        fill_text(&mut self.link, other.link);
        fill_text(&mut self.abstract_text, other.abstract_text);

        match (&self.work_type, other.work_type) {
            (None, incoming) => self.work_type = incoming,
            (Some(WorkType::Other(_)), Some(incoming)) if !matches!(incoming, WorkType::Other(_)) => {
                self.work_type = Some(incoming)
            }
            _ => {}
        }

        if other.authors.len() > self.authors.len() {
            self.authors = other.authors;
        }
        if other.funders.len() > self.funders.len() {
            self.funders = other.funders;
        }
        union_into(&mut self.keywords, other.keywords);

        if other.citations_data.len() > self.citations_data.len() {
            self.citations_data = other.citations_data;
        }
        if other.citations.len() > self.citations.len() {
            self.citations = other.citations;
        }
    }
}
