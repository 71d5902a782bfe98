//! Package part lookup across compiled and cached modules.
//!
//! The compiler resolves a package's top-level declarations by asking a
//! [`PackagePartProvider`] which package parts make up the package. During an
//! incremental build the answer combines the module mappings stored in the
//! caches with whatever the parent provider (usually the previous build's
//! output on the class path) reports, except for packages whose parts are
//! being recompiled.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::IncrementalCache;
use crate::error::CacheError;

/// Encoding version of a serialized [`ModuleMapping`].
pub const MODULE_MAPPING_FORMAT: u32 = 1;

/// Answers which package parts make up a package.
pub trait PackagePartProvider {
    /// Names of the package parts of `package`, in lookup order.
    fn find_package_parts(&self, package: &str) -> Vec<String>;
}

/// Package name to the package parts compiled into one module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleMapping {
    packages: BTreeMap<String, BTreeSet<String>>,
}

impl ModuleMapping {
    /// Decodes a stored mapping.
    ///
    /// Absent data, another encoding version, or bytes that do not decode all
    /// yield the empty mapping.
    pub fn create(data: Option<&[u8]>) -> Self {
        let Some(data) = data else {
            return Self::default();
        };
        let decoded: Result<((u32, ModuleMapping), usize), _> =
            bincode::serde::decode_from_slice(data, bincode::config::standard());
        match decoded {
            Ok(((MODULE_MAPPING_FORMAT, mapping), _)) => mapping,
            Ok(((format, _), _)) => {
                debug!(format, "ignoring module mapping with another format version");
                Self::default()
            }
            Err(e) => {
                debug!(error = %e, "ignoring undecodable module mapping");
                Self::default()
            }
        }
    }

    /// Records `part` as a package part of `package`.
    pub fn add_part(&mut self, package: impl Into<String>, part: impl Into<String>) {
        self.packages
            .entry(package.into())
            .or_default()
            .insert(part.into());
    }

    /// Parts of `package`, `None` if the module has none.
    pub fn parts(&self, package: &str) -> Option<&BTreeSet<String>> {
        self.packages.get(package)
    }

    /// Returns `true` if no package has parts.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Encodes the mapping with its format version, as accepted by
    /// [`ModuleMapping::create`] and stored by
    /// [`IncrementalCache::save_module_mapping`].
    pub fn to_bytes(&self) -> Result<Vec<u8>, CacheError> {
        bincode::serde::encode_to_vec(
            (MODULE_MAPPING_FORMAT, self),
            bincode::config::standard(),
        )
        .map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })
    }
}

impl PackagePartProvider for ModuleMapping {
    fn find_package_parts(&self, package: &str) -> Vec<String> {
        self.parts(package)
            .map(|parts| parts.iter().cloned().collect())
            .unwrap_or_default()
    }
}

/// Provider that prefers the package parts recorded in incremental caches.
///
/// Packages containing an obsolete package part, or explicitly listed as
/// being recompiled, are answered by the parent alone: the cached mapping
/// still lists parts that are about to be replaced.
pub struct IncrementalPackagePartProvider<'a, P: PackagePartProvider + ?Sized> {
    parent: &'a P,
    mappings: Vec<ModuleMapping>,
    packages_to_ignore: BTreeSet<String>,
}

impl<'a, P: PackagePartProvider + ?Sized> IncrementalPackagePartProvider<'a, P> {
    /// Builds the provider over `caches`.
    ///
    /// Must be created after the round's dirty outputs are marked, so that
    /// obsolete package parts are known.
    pub fn new<S: AsRef<str>>(
        parent: &'a P,
        caches: &[&IncrementalCache],
        recompiled_packages: &[S],
    ) -> Self {
        let mappings = caches
            .iter()
            .map(|cache| ModuleMapping::create(cache.module_mapping_data()))
            .collect();

        let mut packages_to_ignore: BTreeSet<String> = recompiled_packages
            .iter()
            .map(|p| p.as_ref().to_string())
            .collect();
        for cache in caches {
            for part in cache.get_obsolete_package_parts() {
                packages_to_ignore.insert(part.package().to_string());
            }
        }

        Self {
            parent,
            mappings,
            packages_to_ignore,
        }
    }
}

impl<P: PackagePartProvider + ?Sized> PackagePartProvider for IncrementalPackagePartProvider<'_, P> {
    fn find_package_parts(&self, package: &str) -> Vec<String> {
        let from_parent = self.parent.find_package_parts(package);
        if self.packages_to_ignore.contains(package) {
            return from_parent;
        }

        let mut seen = BTreeSet::new();
        self.mappings
            .iter()
            .filter_map(|mapping| mapping.parts(package))
            .flatten()
            .cloned()
            .chain(from_parent)
            .filter(|part| seen.insert(part.clone()))
            .collect()
    }
}
