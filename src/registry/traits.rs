use std::fmt::Debug;

/// A flat record stored in a registry row
pub trait Record: Clone + Debug + PartialEq {
    /// Current ID, if one has been assigned
    fn id(&self) -> Option<&str>;

    fn set_id(&mut self, id: String);

    /// Base ID computed from the record's own fields; any existing ID is ignored
    fn generate_id(&self) -> String;

    /// True when both records describe the same real-world entity
    ///
    /// Matching strong identifiers decide when both sides have one; otherwise
    /// the identity text (names, titles, dates) must match.
    fn same_entity(&self, other: &Self) -> bool;

    /// Key used to drop duplicate rows when two registries are merged
    fn dedup_key(&self) -> Vec<String>;

    /// Folds `other` into this record without losing populated fields
    fn absorb(&mut self, other: Self);
}

/// A rich object kept in a registry's lookup, keyed by its record's ID
pub trait Entity: Clone + Debug + PartialEq {
    type Details: Record;

    fn from_details(details: Self::Details) -> Self;

    fn details(&self) -> &Self::Details;

    fn details_mut(&mut self) -> &mut Self::Details;

    /// Carries graph links from a duplicate object being dropped in a merge
    fn merge_links(&mut self, _other: &Self) {}
}
