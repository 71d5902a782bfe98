//! Inline functions whose body changed and whose call sites are not yet reinlined.

use std::collections::BTreeMap;

use kiln_common::UnitName;

use crate::store::KeyedStore;

use super::impl_cache_map;

/// Unit name to the signatures of its changed inline functions.
pub struct DirtyInlineFunctionsMap {
    store: Box<dyn KeyedStore<UnitName, Vec<String>>>,
}

impl DirtyInlineFunctionsMap {
    /// Store file name.
    pub const NAME: &'static str = "dirty-inline-functions";

    /// Wraps an opened store.
    pub fn new(store: Box<dyn KeyedStore<UnitName, Vec<String>>>) -> Self {
        Self { store }
    }

    /// Replaces the changed signatures recorded for `name`.
    pub fn put(&mut self, name: &UnitName, signatures: Vec<String>) {
        self.store.put(name.clone(), signatures);
    }

    /// Every pending entry, ordered by unit name.
    pub fn entries(&self) -> Vec<(UnitName, Vec<String>)> {
        self.store
            .keys()
            .into_iter()
            .filter_map(|k| {
                let signatures = self.store.get(&k)?.clone();
                Some((k, signatures))
            })
            .collect()
    }

    /// Drops every pending entry.
    pub fn clear(&mut self) {
        for key in self.store.keys() {
            self.store.remove(&key);
        }
    }

    /// Pending signatures per unit.
    pub fn dump(&self) -> BTreeMap<String, Vec<String>> {
        self.entries()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }
}

impl_cache_map!(DirtyInlineFunctionsMap);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maps::memory_store;

    #[test]
    fn put_replaces_and_clear_empties() {
        let mut map = DirtyInlineFunctionsMap::new(memory_store());
        let unit = UnitName::new("A");
        map.put(&unit, vec!["f()V".to_string()]);
        map.put(&unit, vec!["g()V".to_string()]);
        assert_eq!(map.entries(), vec![(unit, vec!["g()V".to_string()])]);

        map.clear();
        assert!(map.entries().is_empty());
    }
}
