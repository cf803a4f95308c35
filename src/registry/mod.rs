//! Identity-keyed record tables
//!
//! A [`Registry`] keeps records of one kind in two synchronized views: an ordered
//! table of flat rows (addressable by position, which the crawl frontier relies
//! on) and a lookup of rich objects keyed by ID. Every insert computes the
//! record's deterministic ID; a record that fingerprints like an existing row is
//! either folded into it (same entity) or stored under a `#n` suffix.

mod records;
mod traits;

pub use traits::{Entity, Record};

use crate::identity::{base_id, is_unidentified};
use crate::model::{Affiliation, Author, Funder, Work};
use crate::RegistryError;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::trace;

pub type Works = Registry<Work>;
pub type Authors = Registry<Author>;
pub type Funders = Registry<Funder>;
pub type Affiliations = Registry<Affiliation>;

/// Where an inserted record ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    /// Row position of the record
    pub index: usize,
    pub id: String,
    /// True when the record was folded into an existing row
    pub merged: bool,
}

/// Ordered table plus ID lookup for one kind of record
#[derive(Debug, Clone, PartialEq)]
pub struct Registry<E: Entity> {
    table: Vec<E::Details>,
    positions: HashMap<String, usize>,
    lookup: BTreeMap<String, E>,
    dirty_rows: BTreeSet<usize>,
    dirty_objects: BTreeSet<String>,
    version: u64,
}

impl<E: Entity> Default for Registry<E> {
    fn default() -> Self {
        Self {
            table: Vec::new(),
            positions: HashMap::new(),
            lookup: BTreeMap::new(),
            dirty_rows: BTreeSet::new(),
            dirty_objects: BTreeSet::new(),
            version: 0,
        }
    }
}

/// True if `id` is `base` or `base#n`
fn in_family(id: &str, base: &str) -> bool {
    match id.strip_prefix(base) {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix('#')
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit())),
        None => false,
    }
}

/// `base` if free, otherwise `base#n` with n one past the size of the ID family
fn next_free_id<'a>(base: &str, ids: impl IntoIterator<Item = &'a str>) -> String {
    let family: HashSet<&str> = ids.into_iter().filter(|id| in_family(id, base)).collect();
    if !family.contains(base) {
        return base.to_string();
    }

    let mut n = family.len() + 1;
    loop {
        let candidate = format!("{}#{}", base, n);
        if !family.contains(candidate.as_str()) {
            return candidate;
        }
        n += 1;
    }
}

impl<E: Entity> Registry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Incremented on every mutation that changes the table or lookup
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Inserts a record, computing its ID
    ///
    /// If a row describes the same entity, the record is folded into that row
    /// and no row is added. Rows sharing the record's base ID are checked
    /// first, then the rest of the table, so a row re-keyed after enrichment
    /// still absorbs its earlier form. Records with an unidentified base ID
    /// are never folded.
    pub fn insert(&mut self, mut record: E::Details) -> Insertion {
        let base = record.generate_id();

        if !is_unidentified(&base) {
            let mut family: Vec<usize> = self
                .positions
                .iter()
                .filter(|(id, _)| in_family(id, &base))
                .map(|(_, &index)| index)
                .collect();
            family.sort_unstable();

            let found = family
                .into_iter()
                .find(|&index| self.table[index].same_entity(&record))
                .or_else(|| {
                    self.table
                        .iter()
                        .position(|row| row.id().is_some() && row.same_entity(&record))
                });

            if let Some(index) = found {
                let row = &mut self.table[index];
                row.absorb(record);
                let id = row.id().unwrap_or(&base).to_string();
                let row = row.clone();
                if let Some(object) = self.lookup.get_mut(&id) {
                    *object.details_mut() = row;
                }
                self.version += 1;
                trace!("Folded record into existing row {} ({})", index, id);
                return Insertion {
                    index,
                    id,
                    merged: true,
                };
            }
        }

        let id = next_free_id(&base, self.positions.keys().map(String::as_str));
        record.set_id(id.clone());

        let index = self.table.len();
        self.positions.insert(id.clone(), index);
        self.lookup.insert(id.clone(), E::from_details(record.clone()));
        self.table.push(record);
        self.version += 1;

        Insertion {
            index,
            id,
            merged: false,
        }
    }

    /// Appends a row as-is; it gets an ID and a lookup entry at the next [`sync`](Self::sync)
    pub fn push_row(&mut self, record: E::Details) -> usize {
        let index = self.table.len();
        self.table.push(record);
        self.dirty_rows.insert(index);
        self.version += 1;
        index
    }

    /// Re-adds a previously stored object under its stored ID
    ///
    /// A missing or already-taken ID is regenerated.
    pub fn restore(&mut self, mut object: E) -> String {
        let stored = object
            .details()
            .id()
            .filter(|id| !id.is_empty() && !self.positions.contains_key(*id))
            .map(str::to_string);
        let id = stored.unwrap_or_else(|| {
            let base = object.details().generate_id();
            next_free_id(&base, self.positions.keys().map(String::as_str))
        });
        object.details_mut().set_id(id.clone());

        self.positions.insert(id.clone(), self.table.len());
        self.table.push(object.details().clone());
        self.lookup.insert(id.clone(), object);
        self.version += 1;
        id
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lookup.contains_key(id)
    }

    /// Looks up the object stored under `id`
    pub fn get(&self, id: &str) -> Result<&E, RegistryError> {
        self.lookup.get(id).ok_or_else(|| RegistryError::NotFound { id: id.to_string() })
    }

    /// Mutable access to an object; changes reach the table at the next sync
    pub fn get_mut(&mut self, id: &str) -> Result<&mut E, RegistryError> {
        match self.lookup.get_mut(id) {
            Some(object) => {
                self.dirty_objects.insert(id.to_string());
                self.version += 1;
                Ok(object)
            }
            None => Err(RegistryError::NotFound { id: id.to_string() }),
        }
    }

    /// Row position of `id`, current as of the last mutation or sync
    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn row(&self, index: usize) -> Option<&E::Details> {
        self.table.get(index)
    }

    /// Mutable access to a row; changes reach the lookup at the next sync
    pub fn row_mut(&mut self, index: usize) -> Option<&mut E::Details> {
        let row = self.table.get_mut(index)?;
        self.dirty_rows.insert(index);
        self.version += 1;
        Some(row)
    }

    pub fn rows(&self) -> impl Iterator<Item = &E::Details> {
        self.table.iter()
    }

    pub fn objects(&self) -> impl Iterator<Item = (&str, &E)> {
        self.lookup.iter().map(|(id, object)| (id.as_str(), object))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.table.iter().filter_map(|row| row.id())
    }

    pub fn into_rows(self) -> Vec<E::Details> {
        self.table
    }

    /// Overwrites the row at `index`, refreshing its ID
    ///
    /// The row keeps its ID while its base fingerprint is unchanged; otherwise
    /// it moves to a fresh (possibly suffixed) ID and its lookup object follows.
    pub fn replace(&mut self, index: usize, mut record: E::Details) -> Result<String, RegistryError> {
        let len = self.table.len();
        let old_id = self
            .table
            .get(index)
            .ok_or(RegistryError::RowOutOfRange { index, len })?
            .id()
            .map(str::to_string);

        let base = record.generate_id();
        let id = match old_id.as_deref() {
            Some(old) if base_id(old) == base => old.to_string(),
            old => next_free_id(
                &base,
                self.positions
                    .keys()
                    .map(String::as_str)
                    .filter(|id| Some(*id) != old),
            ),
        };
        record.set_id(id.clone());

        let mut object = None;
        if let Some(old) = old_id.as_deref().filter(|old| *old != id) {
            self.positions.remove(old);
            object = self.lookup.remove(old);
            if self.dirty_objects.remove(old) {
                self.dirty_objects.insert(id.clone());
            }
            trace!("Row {} re-keyed from {} to {}", index, old, id);
        }

        let mut object = object
            .or_else(|| self.lookup.remove(&id))
            .unwrap_or_else(|| E::from_details(record.clone()));
        *object.details_mut() = record.clone();

        self.positions.insert(id.clone(), index);
        self.lookup.insert(id.clone(), object);
        self.table[index] = record;
        self.version += 1;

        Ok(id)
    }

    /// Folds `other` into this registry
    ///
    /// Both sides are synced first. Rows of `other` whose dedup key matches a row
    /// already present are dropped in favour of this side (their graph links are
    /// kept); the rest are appended, re-keyed if their ID is taken. Rows of this
    /// registry are never removed or reordered.
    pub fn merge(&mut self, mut other: Registry<E>) {
        self.sync();
        other.sync();

        let mut seen: HashMap<Vec<String>, String> = self
            .table
            .iter()
            .filter_map(|row| row.id().map(|id| (row.dedup_key(), id.to_string())))
            .collect();

        let mut appended = 0usize;
        for row in other.table {
            let other_id = row.id().unwrap_or_default().to_string();
            let object = other.lookup.remove(&other_id);
            let key = row.dedup_key();

            if let Some(existing) = seen.get(&key) {
                if let (Some(kept), Some(dropped)) = (self.lookup.get_mut(existing), object.as_ref()) {
                    kept.merge_links(dropped);
                }
                continue;
            }

            let id = if other_id.is_empty() || self.positions.contains_key(&other_id) {
                next_free_id(&row.generate_id(), self.positions.keys().map(String::as_str))
            } else {
                other_id
            };

            let mut row = row;
            row.set_id(id.clone());
            let mut object = object.unwrap_or_else(|| E::from_details(row.clone()));
            *object.details_mut() = row.clone();

            self.positions.insert(id.clone(), self.table.len());
            self.lookup.insert(id.clone(), object);
            self.table.push(row);
            seen.insert(key, id);
            appended += 1;
        }

        self.version += 1;
        trace!("Merged registry: {} rows appended, {} total", appended, self.table.len());
    }

    /// Reconciles the table and the lookup
    ///
    /// Afterwards every row has a unique ID and the set of table IDs equals the
    /// set of lookup keys. Edited rows are pushed into their objects first, then
    /// edited objects into their rows, so an object edit wins over a row edit of
    /// the same record.
    pub fn sync(&mut self) {
        let mut taken: HashSet<String> = HashSet::with_capacity(self.table.len());
        for index in 0..self.table.len() {
            let current = self.table[index]
                .id()
                .filter(|id| !id.is_empty() && !taken.contains(*id))
                .map(str::to_string);
            let id = match current {
                Some(id) => id,
                None => {
                    let base = self.table[index].generate_id();
                    self.dirty_rows.insert(index);
                    next_free_id(&base, taken.iter().map(String::as_str))
                }
            };
            self.table[index].set_id(id.clone());
            taken.insert(id);
        }

        self.positions = self
            .table
            .iter()
            .enumerate()
            .filter_map(|(index, row)| row.id().map(|id| (id.to_string(), index)))
            .collect();

        // Rows into objects
        for (index, row) in self.table.iter().enumerate() {
            let Some(id) = row.id() else { continue };
            match self.lookup.get_mut(id) {
                Some(object) => {
                    let stale = object.details() != row && !self.dirty_objects.contains(id);
                    if self.dirty_rows.contains(&index) || stale {
                        *object.details_mut() = row.clone();
                    }
                }
                None => {
                    self.lookup.insert(id.to_string(), E::from_details(row.clone()));
                }
            }
        }

        // Objects into rows
        let dirty_objects = std::mem::take(&mut self.dirty_objects);
        let mut orphans = Vec::new();
        for (id, object) in self.lookup.iter_mut() {
            let dirty = dirty_objects.contains(id);
            match self.positions.get(id) {
                Some(&index) if dirty => {
                    object.details_mut().set_id(id.clone());
                    self.table[index] = object.details().clone();
                }
                Some(_) => {}
                None if dirty => {
                    object.details_mut().set_id(id.clone());
                    self.positions.insert(id.clone(), self.table.len());
                    self.table.push(object.details().clone());
                }
                None => orphans.push(id.clone()),
            }
        }
        for id in orphans {
            self.lookup.remove(&id);
        }

        self.dirty_rows.clear();
        self.version += 1;
    }
}

impl<E: Entity> FromIterator<E::Details> for Registry<E> {
    fn from_iter<I: IntoIterator<Item = E::Details>>(iter: I) -> Self {
        let mut registry = Self::new();
        for record in iter {
            registry.insert(record);
        }
        registry
    }
}
