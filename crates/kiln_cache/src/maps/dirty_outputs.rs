//! Outputs whose source was recompiled or removed and not yet reconciled.

use kiln_common::UnitName;

use crate::store::KeyedStore;

use super::impl_cache_map;

/// Set of dirty unit names.
pub struct DirtyOutputsMap {
    store: Box<dyn KeyedStore<UnitName, ()>>,
}

impl DirtyOutputsMap {
    /// Store file name.
    pub const NAME: &'static str = "dirty-outputs";

    /// Wraps an opened store.
    pub fn new(store: Box<dyn KeyedStore<UnitName, ()>>) -> Self {
        Self { store }
    }

    /// Flags `name` as dirty.
    pub fn mark_dirty(&mut self, name: &UnitName) {
        if !self.store.contains_key(name) {
            self.store.put(name.clone(), ());
        }
    }

    /// Clears the dirty flag of `name`.
    pub fn not_dirty(&mut self, name: &UnitName) {
        self.store.remove(name);
    }

    /// Every dirty unit, ordered by name.
    pub fn dirty_outputs(&self) -> Vec<UnitName> {
        self.store.keys()
    }

    /// Clears every dirty flag.
    pub fn clear(&mut self) {
        for key in self.store.keys() {
            self.store.remove(&key);
        }
    }

    /// Dirty unit names.
    pub fn dump(&self) -> Vec<String> {
        self.dirty_outputs().iter().map(ToString::to_string).collect()
    }
}

impl_cache_map!(DirtyOutputsMap);
