use crate::identity::normalize::{name_token, strip_identifier_prefixes};
use crate::model::{fill_text, non_empty, union_into};
use serde::{Deserialize, Serialize};

/// An author as they appear on a work
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorDetails {
    pub author_id: Option<String>,
    pub full_name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub email: Option<String>,
    pub orcid: Option<String>,
    pub google_scholar_id: Option<String>,
    pub crossref_id: Option<String>,
    /// Affiliation names as printed on the work
    #[serde(default)]
    pub affiliations: Vec<String>,
}

impl AuthorDetails {
    /// Builds an author from a printed name
    ///
    /// `"Family, Given"` is split on the comma; otherwise the last word is
    /// taken as the family name.
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        let (given, family) = match name.split_once(',') {
            Some((family, given)) => (given.trim(), family.trim()),
            None => match name.rsplit_once(char::is_whitespace) {
                Some((given, family)) => (given.trim(), family.trim()),
                None => ("", name),
            },
        };

        let full_name = if given.is_empty() {
            family.to_string()
        } else {
            format!("{} {}", given, family)
        };

        Self {
            full_name: Some(full_name).filter(|n| !n.is_empty()),
            given_name: Some(given.to_string()).filter(|g| !g.is_empty()),
            family_name: Some(family.to_string()).filter(|f| !f.is_empty()),
            ..Default::default()
        }
    }

    /// Lowercased, hyphen-joined family name, derived from `full_name` if needed
    pub fn family_token(&self) -> Option<String> {
        let family = non_empty(&self.family_name).map(str::to_string).or_else(|| {
            non_empty(&self.full_name)
                .and_then(|full| Self::from_name(full).family_name)
        })?;
        Some(name_token(&family)).filter(|t| !t.is_empty())
    }

    /// First word of the given name, lowercased
    pub fn given_token(&self) -> Option<String> {
        let given = non_empty(&self.given_name).map(str::to_string).or_else(|| {
            non_empty(&self.full_name).and_then(|full| Self::from_name(full).given_name)
        })?;
        given
            .split_whitespace()
            .next()
            .map(name_token)
            .filter(|t| !t.is_empty())
    }

    /// Name used for display and for identity comparison
    pub fn display_name(&self) -> Option<String> {
        non_empty(&self.full_name).map(str::to_string).or_else(|| {
            match (non_empty(&self.given_name), non_empty(&self.family_name)) {
                (Some(given), Some(family)) => Some(format!("{} {}", given, family)),
                (None, Some(family)) => Some(family.to_string()),
                (Some(given), None) => Some(given.to_string()),
                (None, None) => None,
            }
        })
    }

    pub fn normalized_orcid(&self) -> Option<String> {
        non_empty(&self.orcid).map(strip_identifier_prefixes)
    }

    pub fn update_from(&mut self, other: AuthorDetails) {
        fill_text(&mut self.full_name, other.full_name);
        fill_text(&mut self.given_name, other.given_name);
        fill_text(&mut self.family_name, other.family_name);
        fill_text(&mut self.email, other.email);
        fill_text(&mut self.orcid, other.orcid);
        fill_text(&mut self.google_scholar_id, other.google_scholar_id);
        fill_text(&mut self.crossref_id, other.crossref_id);
        union_into(&mut self.affiliations, other.affiliations);
    }
}

/// An author with the works and affiliations they are linked to
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Author {
    pub details: AuthorDetails,
    /// Work IDs
    pub publications: Vec<String>,
    /// Affiliation IDs
    pub affiliations: Vec<String>,
}
