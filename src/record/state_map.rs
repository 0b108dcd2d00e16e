//! String-keyed map with per-entry change state
//!
//! Entries and states are kept separately:
//! - a key present in the map but absent from the state table is `Unchanged`
//! - `put` marks the key `Updated`
//! - `remove` marks the key `Deleted`, whether or not it was loaded
//! - `clear` marks every visible key `Deleted` and empties the map
//!
//! Equality and hashing look at entries only.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use super::value::Value;

/// Per-key change state of a map entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EntryState {
    Unchanged,
    Updated,
    Deleted,
}

impl EntryState {
    /// Wire tag
    pub fn tag(&self) -> u8 {
        match self {
            EntryState::Unchanged => 0,
            EntryState::Updated => 1,
            EntryState::Deleted => 2,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(EntryState::Unchanged),
            1 => Some(EntryState::Updated),
            2 => Some(EntryState::Deleted),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryState::Unchanged => "unchanged",
            EntryState::Updated => "updated",
            EntryState::Deleted => "deleted",
        }
    }
}

/// Map value with a per-key state side table
#[derive(Debug, Clone, Default)]
pub struct StateMap {
    entries: BTreeMap<String, Value>,
    states: BTreeMap<String, EntryState>,
}

impl StateMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Visible entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Inserts or replaces an entry and marks it `Updated`
    pub fn put(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        self.states.insert(key.clone(), EntryState::Updated);
        self.entries.insert(key, value)
    }

    /// Removes an entry and marks its key `Deleted`
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.states.insert(key.to_string(), EntryState::Deleted);
        self.entries.remove(key)
    }

    /// Marks every visible key `Deleted` and empties the map
    pub fn clear(&mut self) {
        for key in self.entries.keys() {
            self.states.insert(key.clone(), EntryState::Deleted);
        }
        self.entries.clear();
    }

    /// State of a key: explicit state first, then `Unchanged` for visible keys
    pub fn state(&self, key: &str) -> Option<EntryState> {
        match self.states.get(key) {
            Some(state) => Some(*state),
            None if self.entries.contains_key(key) => Some(EntryState::Unchanged),
            None => None,
        }
    }

    /// Explicit state table in key order
    pub fn states(&self) -> impl Iterator<Item = (&String, EntryState)> {
        self.states.iter().map(|(k, s)| (k, *s))
    }

    /// Number of explicit state entries
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Seeds the state of one key without touching the entries
    pub fn set_state(&mut self, key: impl Into<String>, state: EntryState) {
        self.states.insert(key.into(), state);
    }

    /// Inserts an entry without recording a state change
    pub fn load(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    /// Forgets all entry states; every visible key becomes `Unchanged`
    pub fn clear_states(&mut self) {
        self.states.clear();
    }

    /// Drops entries and states
    pub fn reset(&mut self) {
        self.entries.clear();
        self.states.clear();
    }
}

impl PartialEq for StateMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for StateMap {}

impl Hash for StateMap {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entries.hash(state);
    }
}

impl FromIterator<(String, Value)> for StateMap {
    /// Collects entries as loaded, with no state changes
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut map = StateMap::new();
        for (key, value) in iter {
            map.load(key, value);
        }
        map
    }
}
