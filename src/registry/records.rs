use crate::identity::normalize::{comparable_text, strip_identifier_prefixes};
use crate::identity::{self, base_id};
use crate::model::{
    non_empty, union_into, Affiliation, AffiliationDetails, Author, AuthorDetails, Funder,
    FunderDetails, Work,
};
use crate::registry::{Entity, Record};

/// Compares optional strong identifiers; `None` when either side lacks one
fn strong_match(a: Option<String>, b: Option<String>) -> Option<bool> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a == b),
        _ => None,
    }
}

fn comparable(value: &Option<String>) -> Option<String> {
    non_empty(value)
        .map(comparable_text)
        .filter(|text| !text.is_empty())
}

fn normalized(value: &Option<String>) -> Option<String> {
    non_empty(value).map(strip_identifier_prefixes)
}

fn id_key(id: Option<&str>) -> String {
    id.map(base_id).unwrap_or_default().to_string()
}

impl Work {
    /// Title, first author and date; or the bare link for untitled records
    fn identity_text(&self) -> Option<String> {
        match comparable(&self.title) {
            Some(title) => Some(format!(
                "{}|{}|{}",
                title,
                self.first_author_family().unwrap_or_default(),
                non_empty(&self.date).unwrap_or_default()
            )),
            None => normalized(&self.link).map(|link| format!("link|{}", link)),
        }
    }
}

impl Record for Work {
    fn id(&self) -> Option<&str> {
        self.work_id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.work_id = Some(id);
    }

    fn generate_id(&self) -> String {
        identity::work_id(self)
    }

    fn same_entity(&self, other: &Self) -> bool {
        if let Some(same) = strong_match(self.doi_fragment(), other.doi_fragment()) {
            return same;
        }
        if let Some(same) = strong_match(normalized(&self.isbn), normalized(&other.isbn)) {
            return same;
        }
        // Scrapes rewrite titles but keep the page address
        if strong_match(normalized(&self.link), normalized(&other.link)) == Some(true) {
            return true;
        }
        match (self.identity_text(), other.identity_text()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    fn dedup_key(&self) -> Vec<String> {
        let doi = self.doi_fragment().unwrap_or_default();
        let title = if doi.is_empty() {
            comparable(&self.title)
                .or_else(|| normalized(&self.link))
                .unwrap_or_default()
        } else {
            String::new()
        };
        vec![
            doi,
            self.first_author_family().unwrap_or_default(),
            non_empty(&self.date).unwrap_or_default().to_string(),
            title,
        ]
    }

    fn absorb(&mut self, other: Self) {
        self.update_from(other);
    }
}

impl Entity for Work {
    type Details = Work;

    fn from_details(details: Work) -> Self {
        details
    }

    fn details(&self) -> &Work {
        self
    }

    fn details_mut(&mut self) -> &mut Work {
        self
    }
}

impl Record for AuthorDetails {
    fn id(&self) -> Option<&str> {
        self.author_id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.author_id = Some(id);
    }

    fn generate_id(&self) -> String {
        identity::author_id(self)
    }

    fn same_entity(&self, other: &Self) -> bool {
        if let Some(same) = strong_match(self.normalized_orcid(), other.normalized_orcid()) {
            return same;
        }
        if let Some(same) = strong_match(
            normalized(&self.google_scholar_id),
            normalized(&other.google_scholar_id),
        ) {
            return same;
        }
        let name = |a: &AuthorDetails| {
            a.display_name()
                .map(|n| comparable_text(&n))
                .filter(|n| !n.is_empty())
        };
        match (name(self), name(other)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    fn dedup_key(&self) -> Vec<String> {
        vec![
            id_key(self.id()),
            self.family_token().unwrap_or_default(),
            self.normalized_orcid().unwrap_or_default(),
        ]
    }

    fn absorb(&mut self, other: Self) {
        self.update_from(other);
    }
}

impl Entity for Author {
    type Details = AuthorDetails;

    fn from_details(details: AuthorDetails) -> Self {
        Self {
            details,
            ..Default::default()
        }
    }

    fn details(&self) -> &AuthorDetails {
        &self.details
    }

    fn details_mut(&mut self) -> &mut AuthorDetails {
        &mut self.details
    }

    fn merge_links(&mut self, other: &Self) {
        union_into(&mut self.publications, other.publications.clone());
        union_into(&mut self.affiliations, other.affiliations.clone());
    }
}

impl Record for FunderDetails {
    fn id(&self) -> Option<&str> {
        self.funder_id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.funder_id = Some(id);
    }

    fn generate_id(&self) -> String {
        identity::funder_id(self)
    }

    fn same_entity(&self, other: &Self) -> bool {
        if let Some(same) = strong_match(
            self.normalized_crossref_id(),
            other.normalized_crossref_id(),
        ) {
            return same;
        }
        match (comparable(&self.name), comparable(&other.name)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    fn dedup_key(&self) -> Vec<String> {
        vec![
            id_key(self.id()),
            comparable(&self.name).unwrap_or_default(),
            self.normalized_crossref_id().unwrap_or_default(),
        ]
    }

    fn absorb(&mut self, other: Self) {
        self.update_from(other);
    }
}

impl Entity for Funder {
    type Details = FunderDetails;

    fn from_details(details: FunderDetails) -> Self {
        Self {
            details,
            ..Default::default()
        }
    }

    fn details(&self) -> &FunderDetails {
        &self.details
    }

    fn details_mut(&mut self) -> &mut FunderDetails {
        &mut self.details
    }

    fn merge_links(&mut self, other: &Self) {
        union_into(&mut self.funded_works, other.funded_works.clone());
    }
}

impl Record for AffiliationDetails {
    fn id(&self) -> Option<&str> {
        self.affiliation_id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.affiliation_id = Some(id);
    }

    fn generate_id(&self) -> String {
        identity::affiliation_id(self)
    }

    fn same_entity(&self, other: &Self) -> bool {
        if let Some(same) = strong_match(normalized(&self.uri), normalized(&other.uri)) {
            return same;
        }
        let text = |a: &AffiliationDetails| {
            comparable(&a.name).map(|name| {
                format!("{}|{}", name, comparable(&a.location).unwrap_or_default())
            })
        };
        match (text(self), text(other)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    fn dedup_key(&self) -> Vec<String> {
        vec![
            id_key(self.id()),
            comparable(&self.name).unwrap_or_default(),
            normalized(&self.uri).unwrap_or_default(),
        ]
    }

    fn absorb(&mut self, other: Self) {
        self.update_from(other);
    }
}

impl Entity for Affiliation {
    type Details = AffiliationDetails;

    fn from_details(details: AffiliationDetails) -> Self {
        Self {
            details,
            ..Default::default()
        }
    }

    fn details(&self) -> &AffiliationDetails {
        &self.details
    }

    fn details_mut(&mut self) -> &mut AffiliationDetails {
        &mut self.details
    }

    fn merge_links(&mut self, other: &Self) {
        union_into(&mut self.members, other.members.clone());
    }
}
