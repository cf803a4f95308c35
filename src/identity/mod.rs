//! Deterministic record identifiers
//!
//! An ID is a readable fingerprint built only from a record's own fields, so the
//! same metadata yields the same ID in every run. Two records that fingerprint
//! identically but are not the same entity are told apart by the registry with
//! a `#n` suffix.
//!
//! | Record | Prefix | Components |
//! |--------|--------|------------|
//! | Work | `W:` | first author family, title fingerprint, date, DOI/ISBN/ISSN/link |
//! | Author | `A:` | family name, first given name, ORCID/Scholar/Crossref id |
//! | Funder | `F:` | name fingerprint, Crossref id/URI |
//! | Affiliation | `AFFIL:` | name fingerprint, location, URI/Crossref id |

pub mod normalize;

use crate::model::{AffiliationDetails, AuthorDetails, FunderDetails, Work};
use crate::registry::Record;
use normalize::{clean_id, name_token, title_fingerprint, uid_fragment};

pub const WORK_PREFIX: &str = "W:";
pub const AUTHOR_PREFIX: &str = "A:";
pub const FUNDER_PREFIX: &str = "F:";
pub const AFFILIATION_PREFIX: &str = "AFFIL:";

/// Marker body for non-work records that had nothing to fingerprint
pub const UNIDENTIFIED_MARKER: &str = "#NA#";

/// Generates the base (unsuffixed) ID of any registry record
pub fn generate_id<R: Record>(record: &R) -> String {
    record.generate_id()
}

/// Work ID: `W:` + family + title fingerprint + date + uid fragment
///
/// An empty work yields the bare `W:` prefix.
pub fn work_id(work: &Work) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(family) = work.first_author_family() {
        parts.push(family);
    }
    if let Some(title) = work.title.as_deref().and_then(title_fingerprint) {
        parts.push(title);
    }
    if let Some(date) = present(&work.date) {
        parts.push(date.to_string());
    }
    if let Some(uid) = first_uid(&[&work.doi, &work.isbn, &work.issn, &work.link]) {
        parts.push(uid);
    }

    compose(WORK_PREFIX, &parts, "")
}

/// Author ID: `A:` + family + first given name + persistent id
pub fn author_id(author: &AuthorDetails) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(family) = author.family_token() {
        parts.push(family);
    }
    if let Some(given) = author.given_token() {
        parts.push(given);
    }
    if let Some(uid) = first_uid(&[
        &author.orcid,
        &author.google_scholar_id,
        &author.crossref_id,
        &author.email,
    ]) {
        parts.push(uid);
    }

    compose(AUTHOR_PREFIX, &parts, UNIDENTIFIED_MARKER)
}

/// Funder ID: `F:` + name fingerprint + Crossref id or URI
pub fn funder_id(funder: &FunderDetails) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(name) = funder.name.as_deref().and_then(title_fingerprint) {
        parts.push(name);
    }
    if let Some(uid) = first_uid(&[&funder.crossref_id, &funder.uri]) {
        parts.push(uid);
    }

    compose(FUNDER_PREFIX, &parts, UNIDENTIFIED_MARKER)
}

/// Affiliation ID: `AFFIL:` + name fingerprint + location + URI
pub fn affiliation_id(affiliation: &AffiliationDetails) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(name) = affiliation.name.as_deref().and_then(title_fingerprint) {
        parts.push(name);
    }
    if let Some(location) = present(&affiliation.location) {
        parts.push(name_token(location));
    }
    if let Some(uid) = first_uid(&[&affiliation.uri, &affiliation.crossref_id]) {
        parts.push(uid);
    }

    compose(AFFILIATION_PREFIX, &parts, UNIDENTIFIED_MARKER)
}

/// Strips a `#n` disambiguation suffix
pub fn base_id(id: &str) -> &str {
    match id.rsplit_once('#') {
        Some((base, suffix))
            if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) =>
        {
            base
        }
        _ => id,
    }
}

/// True for IDs generated from records with nothing to fingerprint
///
/// Such IDs are shared by every empty record of a kind and must never be used
/// as a match key.
pub fn is_unidentified(id: &str) -> bool {
    let base = base_id(id);
    let body = [AFFILIATION_PREFIX, WORK_PREFIX, AUTHOR_PREFIX, FUNDER_PREFIX]
        .iter()
        .find_map(|prefix| base.strip_prefix(prefix))
        .unwrap_or(base);
    body.is_empty() || body == UNIDENTIFIED_MARKER
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn first_uid(candidates: &[&Option<String>]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|candidate| present(candidate))
        .find_map(uid_fragment)
}

fn compose(prefix: &str, parts: &[String], empty_body: &str) -> String {
    let body = clean_id(&parts.join("-"));
    if body.is_empty() {
        format!("{}{}", prefix, empty_body)
    } else {
        format!("{}{}", prefix, body)
    }
}
