//! Deduplicating dimension stores.
//!
//! Both registries keep records in first-seen order and never overwrite a stored
//! record: the first row carrying a key defines the entity.

use std::collections::HashMap;

use crate::constants::COMPOSITE_KEY_DELIMITER;
use crate::schema::Table;

/// Dimension keyed by an identifier taken straight from the source.
#[derive(Debug)]
pub struct NaturalRegistry<R> {
    table: Table,
    index: HashMap<String, usize>,
    records: Vec<R>,
    conflicts: usize,
}

impl<R: PartialEq> NaturalRegistry<R> {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            index: HashMap::new(),
            records: Vec::new(),
            conflicts: 0,
        }
    }

    /// Registers `candidate` under `key` unless the key is already known.
    ///
    /// Returns whether `key` refers to a stored record after the call. A `None`
    /// candidate means the row carries nothing worth materializing; it still
    /// resolves when an earlier row already created the entity. A candidate that
    /// differs from the stored record is counted as a conflict and dropped.
    pub fn upsert(&mut self, key: &str, candidate: Option<R>) -> bool {
        if let Some(&position) = self.index.get(key) {
            if let Some(candidate) = candidate {
                if self.records[position] != candidate {
                    self.conflicts += 1;
                    tracing::debug!(
                        table = %self.table,
                        key,
                        "later row disagrees with first-seen record; keeping the first"
                    );
                }
            }
            return true;
        }

        match candidate {
            Some(record) => {
                self.index.insert(key.to_string(), self.records.len());
                self.records.push(record);
                true
            }
            None => false,
        }
    }

    pub fn conflicts(&self) -> usize {
        self.conflicts
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut R> {
        self.records.iter_mut()
    }

    pub fn into_records(self) -> Vec<R> {
        self.records
    }
}

/// How many composite-key parts must be non-empty for an entity to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPresence {
    /// Every part is required; a single blank part leaves the row unassigned.
    All,
    /// One non-blank part is enough.
    Any,
}

impl KeyPresence {
    fn is_satisfied(self, parts: &[&str]) -> bool {
        match self {
            KeyPresence::All => parts.iter().all(|part| !part.is_empty()),
            KeyPresence::Any => parts.iter().any(|part| !part.is_empty()),
        }
    }
}

pub fn composite_key(parts: &[&str]) -> String {
    let mut key = String::with_capacity(parts.iter().map(|part| part.len() + 1).sum());
    for (idx, part) in parts.iter().enumerate() {
        if idx > 0 {
            key.push(COMPOSITE_KEY_DELIMITER);
        }
        key.push_str(part);
    }
    key
}

/// Dimension identified by a composite of source fields, numbered 1, 2, 3, ...
/// in order of first appearance.
#[derive(Debug)]
pub struct SurrogateRegistry<R> {
    presence: KeyPresence,
    lookup: HashMap<String, u64>,
    records: Vec<R>,
}

impl<R> SurrogateRegistry<R> {
    pub fn new(presence: KeyPresence) -> Self {
        Self {
            presence,
            lookup: HashMap::new(),
            records: Vec::new(),
        }
    }

    /// Resolves `parts` to a surrogate id, creating the entity with `build` on
    /// first sight. Returns `None` when the presence rule is not met.
    pub fn resolve(&mut self, parts: &[&str], build: impl FnOnce(u64) -> R) -> Option<u64> {
        if !self.presence.is_satisfied(parts) {
            return None;
        }

        let key = composite_key(parts);
        if let Some(&id) = self.lookup.get(&key) {
            return Some(id);
        }

        let id = next_surrogate_id(self.records.len());
        self.lookup.insert(key, id);
        self.records.push(build(id));
        Some(id)
    }

    pub fn into_records(self) -> Vec<R> {
        self.records
    }
}

fn next_surrogate_id(current_len: usize) -> u64 {
    current_len as u64 + 1
}
