use crate::identity::normalize::strip_identifier_prefixes;
use crate::model::{fill_text, non_empty, union_into};
use serde::{Deserialize, Serialize};

/// A funding body as acknowledged on a work
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunderDetails {
    pub funder_id: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    /// Crossref funder registry DOI, e.g. `10.13039/100000001`
    pub crossref_id: Option<String>,
    pub uri: Option<String>,
    #[serde(default)]
    pub awards: Vec<String>,
}

impl FunderDetails {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn normalized_crossref_id(&self) -> Option<String> {
        non_empty(&self.crossref_id).map(strip_identifier_prefixes)
    }

    pub fn update_from(&mut self, other: FunderDetails) {
        fill_text(&mut self.name, other.name);
        fill_text(&mut self.location, other.location);
        fill_text(&mut self.crossref_id, other.crossref_id);
        fill_text(&mut self.uri, other.uri);
        union_into(&mut self.awards, other.awards);
    }
}

/// A funder with the works it funded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Funder {
    pub details: FunderDetails,
    /// Work IDs
    pub funded_works: Vec<String>,
}
