//! Bibliographic records
//!
//! Works, authors, funders and affiliations in two shapes: the flat *details*
//! record that lives in a registry row, and the richer entity object that also
//! carries graph links (an author's publications, a funder's funded works).

mod affiliation;
mod author;
mod citations;
mod funder;
mod work;

pub use affiliation::{Affiliation, AffiliationDetails};
pub use author::{Author, AuthorDetails};
pub use citations::{CitationPayload, StructuredCitation};
pub use funder::{Funder, FunderDetails};
pub use work::{Work, WorkType};

/// Returns the trimmed value if it holds any text
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Fills `slot` from `candidate` when the slot is empty or the candidate is longer
pub(crate) fn fill_text(slot: &mut Option<String>, candidate: Option<String>) {
    let Some(candidate) = candidate.map(|c| c.trim().to_string()) else {
        return;
    };
    if candidate.is_empty() {
        return;
    }

    let current_len = non_empty(slot).map(|s| s.chars().count()).unwrap_or(0);
    if candidate.chars().count() > current_len {
        *slot = Some(candidate);
    }
}

/// Appends values from `incoming` that `target` does not hold yet
pub(crate) fn union_into<T: PartialEq>(target: &mut Vec<T>, incoming: Vec<T>) {
    for item in incoming {
        if !target.contains(&item) {
            target.push(item);
        }
    }
}
