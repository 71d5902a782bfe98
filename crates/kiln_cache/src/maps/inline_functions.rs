//! Inline function body hashes per unit.

use std::collections::{BTreeMap, BTreeSet};

use kiln_common::UnitName;

use crate::changes::ChangeRecord;
use crate::scan::InlineSnapshot;
use crate::store::KeyedStore;

use super::dirty_inline::DirtyInlineFunctionsMap;
use super::impl_cache_map;

/// Unit name to its inline functions' signatures and body hashes.
pub struct InlineFunctionMap {
    store: Box<dyn KeyedStore<UnitName, InlineSnapshot>>,
}

impl InlineFunctionMap {
    /// Store file name.
    pub const NAME: &'static str = "inline-functions";

    /// Wraps an opened store.
    pub fn new(store: Box<dyn KeyedStore<UnitName, InlineSnapshot>>) -> Self {
        Self { store }
    }

    /// Records the unit's inline functions and classifies each signature.
    ///
    /// A signature missing from the old snapshot is *added*; one present in
    /// both with a different hash is *changed*. Removed signatures only drop
    /// out of storage. Changed signatures are queued in `dirty` so that their
    /// call sites can be found by the next reinline query.
    pub fn process(
        &mut self,
        name: &UnitName,
        snapshot: InlineSnapshot,
        dirty: &mut DirtyInlineFunctionsMap,
    ) -> ChangeRecord {
        let empty = InlineSnapshot::new();
        let old = self.store.get(name).unwrap_or(&empty);

        let mut added = BTreeSet::new();
        let mut changed = BTreeSet::new();
        for signature in old.keys().chain(snapshot.keys()) {
            match (old.get(signature), snapshot.get(signature)) {
                (None, Some(_)) => {
                    added.insert(signature.clone());
                }
                (Some(old_hash), Some(new_hash)) if old_hash != new_hash => {
                    changed.insert(signature.clone());
                }
                _ => {}
            }
        }

        if snapshot.is_empty() {
            self.store.remove(name);
        } else if self.store.get(name) != Some(&snapshot) {
            self.store.put(name.clone(), snapshot);
        }

        if !changed.is_empty() {
            dirty.put(name, changed.iter().cloned().collect());
        }

        ChangeRecord {
            inline_changed: !changed.is_empty(),
            inline_added: !added.is_empty(),
            ..ChangeRecord::NONE
        }
    }

    /// Returns the stored snapshot of `name`.
    pub fn get(&self, name: &UnitName) -> Option<&InlineSnapshot> {
        self.store.get(name)
    }

    /// Deletes the entry of `name`.
    pub fn remove(&mut self, name: &UnitName) {
        self.store.remove(name);
    }

    /// Body hash per signature per unit.
    pub fn dump(&self) -> BTreeMap<String, BTreeMap<String, String>> {
        self.store
            .keys()
            .into_iter()
            .filter_map(|k| {
                let functions = self.store.get(&k)?;
                let rendered = functions
                    .iter()
                    .map(|(sig, hash)| (sig.clone(), hash.to_string()))
                    .collect();
                Some((k.to_string(), rendered))
            })
            .collect()
    }
}

impl_cache_map!(InlineFunctionMap);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maps::memory_store;
    use kiln_common::ContentHash;

    fn snapshot(entries: &[(&str, &[u8])]) -> InlineSnapshot {
        entries
            .iter()
            .map(|(sig, body)| (sig.to_string(), ContentHash::from_bytes(body)))
            .collect()
    }

    fn maps() -> (InlineFunctionMap, DirtyInlineFunctionsMap) {
        (
            InlineFunctionMap::new(memory_store()),
            DirtyInlineFunctionsMap::new(memory_store()),
        )
    }

    #[test]
    fn new_signature_is_added_not_changed() {
        let (mut map, mut dirty) = maps();
        let unit = UnitName::new("A");
        let record = map.process(&unit, snapshot(&[("f(I)I", b"v1")]), &mut dirty);
        assert!(record.inline_added);
        assert!(!record.inline_changed);
        assert!(dirty.entries().is_empty());
    }

    #[test]
    fn changed_hash_marks_dirty() {
        let (mut map, mut dirty) = maps();
        let unit = UnitName::new("A");
        map.process(&unit, snapshot(&[("f(I)I", b"v1"), ("g()V", b"g")]), &mut dirty);
        let record = map.process(&unit, snapshot(&[("f(I)I", b"v2"), ("g()V", b"g")]), &mut dirty);
        assert!(record.inline_changed);
        assert!(!record.inline_added);
        assert_eq!(
            dirty.entries(),
            vec![(unit.clone(), vec!["f(I)I".to_string()])]
        );
    }

    #[test]
    fn unchanged_snapshot_is_no_change() {
        let (mut map, mut dirty) = maps();
        let unit = UnitName::new("A");
        map.process(&unit, snapshot(&[("f(I)I", b"v1")]), &mut dirty);
        let record = map.process(&unit, snapshot(&[("f(I)I", b"v1")]), &mut dirty);
        assert!(!record.has_changes());
    }

    #[test]
    fn removed_signature_only_updates_storage() {
        let (mut map, mut dirty) = maps();
        let unit = UnitName::new("A");
        map.process(&unit, snapshot(&[("f(I)I", b"v1"), ("g()V", b"g")]), &mut dirty);
        let record = map.process(&unit, snapshot(&[("g()V", b"g")]), &mut dirty);
        assert!(!record.has_changes());
        assert_eq!(map.get(&unit).unwrap().len(), 1);
        assert!(dirty.entries().is_empty());
    }

    #[test]
    fn empty_snapshot_deletes_entry() {
        let (mut map, mut dirty) = maps();
        let unit = UnitName::new("A");
        map.process(&unit, snapshot(&[("f(I)I", b"v1")]), &mut dirty);
        map.process(&unit, InlineSnapshot::new(), &mut dirty);
        assert!(map.get(&unit).is_none());
    }
}
