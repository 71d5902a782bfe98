//! Source file to the units compiled from it.

use std::collections::BTreeMap;

use kiln_common::{PathKey, UnitName};

use crate::store::{AppendStore, KeyedStore};

use super::impl_cache_map;

/// Source path to the ordered set of units it produced.
pub struct SourceToOutputsMap {
    store: Box<dyn KeyedStore<PathKey, Vec<UnitName>>>,
}

impl SourceToOutputsMap {
    /// Store file name.
    pub const NAME: &'static str = "source-to-outputs";

    /// Wraps an opened store.
    pub fn new(store: Box<dyn KeyedStore<PathKey, Vec<UnitName>>>) -> Self {
        Self { store }
    }

    /// Records that `source` produced `name`. Re-adding is a no-op.
    pub fn add(&mut self, source: &PathKey, name: &UnitName) {
        let known = self
            .store
            .get(source)
            .is_some_and(|outputs| outputs.contains(name));
        if !known {
            self.store.append(source.clone(), name.clone());
        }
    }

    /// Units produced by `source`, in the order they were recorded.
    pub fn get(&self, source: &PathKey) -> Vec<UnitName> {
        self.store.get(source).cloned().unwrap_or_default()
    }

    /// Forgets every output of `source`.
    pub fn clear_outputs_for_source(&mut self, source: &PathKey) {
        self.store.remove(source);
    }

    /// Outputs per source path.
    pub fn dump(&self) -> BTreeMap<String, Vec<String>> {
        self.store
            .keys()
            .into_iter()
            .map(|k| {
                let outputs = self.get(&k).iter().map(ToString::to_string).collect();
                (k.to_string(), outputs)
            })
            .collect()
    }
}

impl_cache_map!(SourceToOutputsMap);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maps::memory_store;

    #[test]
    fn outputs_keep_insertion_order_without_duplicates() {
        let mut map = SourceToOutputsMap::new(memory_store());
        let src = PathKey::from("/src/Foo.kt");
        map.add(&src, &UnitName::new("Foo"));
        map.add(&src, &UnitName::new("Foo$Inner"));
        map.add(&src, &UnitName::new("Foo"));
        assert_eq!(
            map.get(&src),
            vec![UnitName::new("Foo"), UnitName::new("Foo$Inner")]
        );
    }

    #[test]
    fn equivalent_paths_share_an_entry() {
        let mut map = SourceToOutputsMap::new(memory_store());
        map.add(&PathKey::from("/src/./Foo.kt"), &UnitName::new("Foo"));
        assert_eq!(map.get(&PathKey::from("/src/Foo.kt")).len(), 1);
    }

    #[test]
    fn clear_forgets_source() {
        let mut map = SourceToOutputsMap::new(memory_store());
        let src = PathKey::from("/src/Foo.kt");
        map.add(&src, &UnitName::new("Foo"));
        map.clear_outputs_for_source(&src);
        assert!(map.get(&src).is_empty());
    }
}
