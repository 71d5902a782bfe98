//! Package-part membership.

use kiln_common::UnitName;

use crate::store::KeyedStore;

use super::impl_cache_map;

/// Set of units whose declarations merge into a package facade.
pub struct PackagePartMap {
    store: Box<dyn KeyedStore<UnitName, bool>>,
}

impl PackagePartMap {
    /// Store file name.
    pub const NAME: &'static str = "package-parts";

    /// Wraps an opened store.
    pub fn new(store: Box<dyn KeyedStore<UnitName, bool>>) -> Self {
        Self { store }
    }

    /// Registers `name` as a package part.
    pub fn add(&mut self, name: &UnitName) {
        if !self.is_package_part(name) {
            self.store.put(name.clone(), true);
        }
    }

    /// Unregisters `name`.
    pub fn remove(&mut self, name: &UnitName) {
        self.store.remove(name);
    }

    /// Returns `true` if `name` is a registered package part.
    pub fn is_package_part(&self, name: &UnitName) -> bool {
        self.store.get(name).copied().unwrap_or(false)
    }

    /// Registered package parts, ordered by name.
    pub fn dump(&self) -> Vec<String> {
        self.store
            .keys()
            .into_iter()
            .filter(|k| self.is_package_part(k))
            .map(|k| k.to_string())
            .collect()
    }
}

impl_cache_map!(PackagePartMap);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maps::memory_store;

    #[test]
    fn add_and_remove() {
        let mut map = PackagePartMap::new(memory_store());
        let part = UnitName::new("p/FileKt");
        assert!(!map.is_package_part(&part));
        map.add(&part);
        assert!(map.is_package_part(&part));
        assert_eq!(map.dump(), vec!["p/FileKt".to_string()]);
        map.remove(&part);
        assert!(!map.is_package_part(&part));
    }
}
