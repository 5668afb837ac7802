//! Arena storage for chain objects.
//!
//! A `Table` keeps rows under stable, never-reused integer ids and enforces
//! one unique composite key per row. Ordered maps keep iteration order (and
//! therefore every derived value) identical on every node.
//!
//! Tables support a single undo session: `begin` records the original value
//! of every row touched afterwards, `rollback` restores them and drops rows
//! created inside the session, `commit` forgets the undo state.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::RangeBounds;
use thiserror::Error;

/// A row type storable in a `Table`.
pub trait Record: Clone {
    type Id: Copy + Ord + From<u64> + Into<u64> + fmt::Display + fmt::Debug;
    /// Unique secondary key. Must not change after insert.
    type Key: Ord + Clone + fmt::Debug;

    fn id(&self) -> Self::Id;
    fn key(&self) -> Self::Key;
}

/// Insert rejected because another row already holds the key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("duplicate key")]
pub struct DuplicateKey;

#[derive(Clone, Debug)]
struct UndoState<T: Record> {
    next_id: u64,
    originals: BTreeMap<T::Id, T>,
    created: BTreeSet<T::Id>,
}

#[derive(Clone, Debug)]
pub struct Table<T: Record> {
    rows: BTreeMap<T::Id, T>,
    by_key: BTreeMap<T::Key, T::Id>,
    next_id: u64,
    undo: Option<UndoState<T>>,
}

impl<T: Record> Default for Table<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> Table<T> {
    pub fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            by_key: BTreeMap::new(),
            next_id: 0,
            undo: None,
        }
    }

    /// Rebuild a table from persisted rows. Indexes are derived, not stored.
    pub fn from_rows(rows: impl IntoIterator<Item = T>, next_id: u64) -> Self {
        let mut table = Self::new();
        for row in rows {
            table.by_key.insert(row.key(), row.id());
            table.rows.insert(row.id(), row);
        }
        table.next_id = next_id;
        table
    }

    // ── Reads ────────────────────────────────────────────────────────────────

    pub fn get(&self, id: T::Id) -> Option<&T> {
        self.rows.get(&id)
    }

    pub fn find(&self, key: &T::Key) -> Option<&T> {
        self.by_key.get(key).and_then(|id| self.rows.get(id))
    }

    pub fn contains_key(&self, key: &T::Key) -> bool {
        self.by_key.contains_key(key)
    }

    /// Rows whose key falls in `range`, in key order.
    pub fn range<R: RangeBounds<T::Key>>(&self, range: R) -> impl Iterator<Item = &T> + '_ {
        self.by_key.range(range).filter_map(|(_, id)| self.rows.get(id))
    }

    /// All rows in id order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    // ── Writes ───────────────────────────────────────────────────────────────

    /// Insert the row built by `build` under the next id.
    pub fn insert(&mut self, build: impl FnOnce(T::Id) -> T) -> Result<T::Id, DuplicateKey> {
        let id = T::Id::from(self.next_id);
        let row = build(id);
        debug_assert!(row.id() == id, "row built with foreign id {}", row.id());
        let key = row.key();
        if self.by_key.contains_key(&key) {
            return Err(DuplicateKey);
        }
        self.next_id += 1;
        if let Some(undo) = self.undo.as_mut() {
            undo.created.insert(id);
        }
        self.by_key.insert(key, id);
        self.rows.insert(id, row);
        Ok(id)
    }

    /// Mutate a row in place. Returns `None` if the id is unknown.
    pub fn modify(&mut self, id: T::Id, f: impl FnOnce(&mut T)) -> Option<&T> {
        let row = self.rows.get_mut(&id)?;
        if let Some(undo) = self.undo.as_mut() {
            if !undo.created.contains(&id) && !undo.originals.contains_key(&id) {
                undo.originals.insert(id, row.clone());
            }
        }
        let key_before = row.key();
        f(row);
        debug_assert!(row.key() == key_before, "key of {} changed in modify", id);
        Some(&*row)
    }

    // ── Undo sessions ────────────────────────────────────────────────────────

    pub fn begin(&mut self) {
        debug_assert!(self.undo.is_none(), "nested undo session");
        self.undo = Some(UndoState {
            next_id: self.next_id,
            originals: BTreeMap::new(),
            created: BTreeSet::new(),
        });
    }

    pub fn commit(&mut self) {
        self.undo = None;
    }

    pub fn rollback(&mut self) {
        let Some(undo) = self.undo.take() else {
            return;
        };
        for id in undo.created {
            if let Some(row) = self.rows.remove(&id) {
                self.by_key.remove(&row.key());
            }
        }
        for (id, original) in undo.originals {
            self.rows.insert(id, original);
        }
        self.next_id = undo.next_id;
    }

    pub fn in_session(&self) -> bool {
        self.undo.is_some()
    }
}
