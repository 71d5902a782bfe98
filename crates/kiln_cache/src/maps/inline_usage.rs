//! Reverse edges from inline functions to the files their bodies were copied into.

use std::collections::{BTreeMap, BTreeSet};

use kiln_common::PathKey;
use serde::{Deserialize, Serialize};

use crate::store::{AppendStore, KeyedStore};

use super::impl_cache_map;

/// An inline function identified by the artifact that declares it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InlineSite {
    /// Artifact path of the declaring unit (the facade's path for package parts).
    pub artifact: PathKey,
    /// Inline function signature.
    pub signature: String,
}

/// `(artifact, signature)` to the set of files containing an inlined copy.
pub struct InlineUsageMap {
    store: Box<dyn KeyedStore<InlineSite, Vec<PathKey>>>,
}

impl InlineUsageMap {
    /// Store file name.
    pub const NAME: &'static str = "inlined-to";

    /// Wraps an opened store.
    pub fn new(store: Box<dyn KeyedStore<InlineSite, Vec<PathKey>>>) -> Self {
        Self { store }
    }

    /// Records that the body of `signature` from `artifact` was inlined into `target`.
    pub fn add(&mut self, artifact: PathKey, signature: &str, target: PathKey) {
        let site = InlineSite {
            artifact,
            signature: signature.to_string(),
        };
        let known = self
            .store
            .get(&site)
            .is_some_and(|targets| targets.contains(&target));
        if !known {
            self.store.append(site, target);
        }
    }

    /// Files that inlined `signature` from `artifact`.
    pub fn get(&self, artifact: &PathKey, signature: &str) -> BTreeSet<PathKey> {
        let site = InlineSite {
            artifact: artifact.clone(),
            signature: signature.to_string(),
        };
        self.store
            .get(&site)
            .map(|targets| targets.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Targets per `(artifact, signature)` edge.
    pub fn dump(&self) -> BTreeMap<String, Vec<String>> {
        self.store
            .keys()
            .into_iter()
            .map(|site| {
                let targets = self
                    .get(&site.artifact, &site.signature)
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                (format!("({}, {})", site.artifact, site.signature), targets)
            })
            .collect()
    }
}

impl_cache_map!(InlineUsageMap);
