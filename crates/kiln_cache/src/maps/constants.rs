//! Compile-time constant snapshots per unit.

use std::collections::BTreeMap;

use kiln_common::UnitName;

use crate::changes::ChangeRecord;
use crate::scan::ConstantSnapshot;
use crate::store::KeyedStore;

use super::impl_cache_map;

/// Unit name to its constants. An absent entry is the empty snapshot.
pub struct ConstantMap {
    store: Box<dyn KeyedStore<UnitName, ConstantSnapshot>>,
}

impl ConstantMap {
    /// Store file name.
    pub const NAME: &'static str = "constants";

    /// Wraps an opened store.
    pub fn new(store: Box<dyn KeyedStore<UnitName, ConstantSnapshot>>) -> Self {
        Self { store }
    }

    /// Records the unit's constants and reports whether any value changed.
    ///
    /// Consumers may have inlined constant values at their use sites, so any
    /// difference counts, not just additions and removals.
    pub fn process(&mut self, name: &UnitName, constants: ConstantSnapshot) -> ChangeRecord {
        let unchanged = match self.store.get(name) {
            Some(old) => *old == constants,
            None => constants.is_empty(),
        };
        if unchanged {
            return ChangeRecord::NONE;
        }

        if constants.is_empty() {
            self.store.remove(name);
        } else {
            self.store.put(name.clone(), constants);
        }
        ChangeRecord::constants(true)
    }

    /// Returns `true` if the unit has any stored constants.
    pub fn contains(&self, name: &UnitName) -> bool {
        self.store.contains_key(name)
    }

    /// Returns the stored constants of `name`.
    pub fn get(&self, name: &UnitName) -> Option<&ConstantSnapshot> {
        self.store.get(name)
    }

    /// Deletes the entry of `name`.
    pub fn remove(&mut self, name: &UnitName) {
        self.store.remove(name);
    }

    /// Rendered constants per unit.
    pub fn dump(&self) -> BTreeMap<String, BTreeMap<String, String>> {
        self.store
            .keys()
            .into_iter()
            .filter_map(|k| {
                let values = self.store.get(&k)?;
                let rendered = values
                    .iter()
                    .map(|(field, value)| (field.clone(), value.to_string()))
                    .collect();
                Some((k.to_string(), rendered))
            })
            .collect()
    }
}

impl_cache_map!(ConstantMap);
