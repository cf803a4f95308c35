use crate::model::fill_text;
use serde::{Deserialize, Serialize};

/// An institution an author is affiliated with
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AffiliationDetails {
    pub affiliation_id: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    /// ROR or other persistent URI
    pub uri: Option<String>,
    pub crossref_id: Option<String>,
}

impl AffiliationDetails {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn update_from(&mut self, other: AffiliationDetails) {
        fill_text(&mut self.name, other.name);
        fill_text(&mut self.location, other.location);
        fill_text(&mut self.uri, other.uri);
        fill_text(&mut self.crossref_id, other.crossref_id);
    }
}

/// An affiliation with its member authors
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Affiliation {
    pub details: AffiliationDetails,
    /// Author IDs
    pub members: Vec<String>,
}
