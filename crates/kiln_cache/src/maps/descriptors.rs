//! Descriptor snapshots per unit.

use std::collections::BTreeMap;

use kiln_common::{ContentHash, UnitName};

use crate::changes::ChangeRecord;
use crate::descriptor::{difference, DescriptorValue, DifferenceKind};
use crate::store::KeyedStore;

use super::impl_cache_map;

/// Unit name to descriptor bytes plus the package-facade flag.
pub struct DescriptorMap {
    store: Box<dyn KeyedStore<UnitName, DescriptorValue>>,
}

impl DescriptorMap {
    /// Store file name.
    pub const NAME: &'static str = "descriptors";

    /// Wraps an opened store.
    pub fn new(store: Box<dyn KeyedStore<UnitName, DescriptorValue>>) -> Self {
        Self { store }
    }

    /// Records the unit's descriptor and classifies the change.
    ///
    /// Storage is overwritten when the entry is absent, the bytes differ, or
    /// the facade flag differs. The descriptor counts as changed when it is
    /// new, or when `check_signature` is set and the structural signature
    /// differs. Opaque blobs pass `check_signature = false`.
    pub fn process(
        &mut self,
        name: &UnitName,
        bytes: &[u8],
        is_package_facade: bool,
        check_signature: bool,
    ) -> ChangeRecord {
        let new = DescriptorValue {
            is_package_facade,
            bytes: bytes.to_vec(),
        };
        let old = self.store.get(name);

        let changed = match old {
            None => true,
            Some(old) => check_signature && difference(old, &new) != DifferenceKind::None,
        };
        if old != Some(&new) {
            self.store.put(name.clone(), new);
        }
        ChangeRecord::descriptor(changed)
    }

    /// Returns the stored snapshot of `name`.
    pub fn get(&self, name: &UnitName) -> Option<&DescriptorValue> {
        self.store.get(name)
    }

    /// Returns `true` if `name` has a stored descriptor.
    pub fn contains(&self, name: &UnitName) -> bool {
        self.store.contains_key(name)
    }

    /// Deletes the entry of `name`.
    pub fn remove(&mut self, name: &UnitName) {
        self.store.remove(name);
    }

    /// Returns every unit stored with the package-facade flag.
    pub fn package_facades(&self) -> Vec<UnitName> {
        self.store
            .keys()
            .into_iter()
            .filter(|k| self.store.get(k).is_some_and(|v| v.is_package_facade))
            .collect()
    }

    /// Facade flag and a short content fingerprint per unit.
    pub fn dump(&self) -> BTreeMap<String, String> {
        self.store
            .keys()
            .into_iter()
            .filter_map(|k| {
                let v = self.store.get(&k)?;
                let flag = if v.is_package_facade { "1" } else { "0" };
                Some((k.to_string(), format!("{flag}{}", ContentHash::from_bytes(&v.bytes))))
            })
            .collect()
    }
}

impl_cache_map!(DescriptorMap);
