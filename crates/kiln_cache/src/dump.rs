//! Read-only snapshot of a cache's contents for diagnostics and tests.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Every typed map of one target, rendered with sorted keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheDump {
    /// Target name.
    pub target: String,
    /// Unit to facade flag (`0`/`1`) followed by a fingerprint of the descriptor bytes.
    pub descriptors: BTreeMap<String, String>,
    /// Unit to rendered constants.
    pub constants: BTreeMap<String, BTreeMap<String, String>>,
    /// Unit to inline signature to body hash.
    pub inline_functions: BTreeMap<String, BTreeMap<String, String>>,
    /// Registered package parts.
    pub package_parts: Vec<String>,
    /// Source path to produced units.
    pub source_outputs: BTreeMap<String, Vec<String>>,
    /// Dirty units.
    pub dirty_outputs: Vec<String>,
    /// Unit to changed inline signatures awaiting reinline.
    pub dirty_inline_functions: BTreeMap<String, Vec<String>>,
    /// `(artifact, signature)` to files holding an inlined copy.
    pub inlined_to: BTreeMap<String, Vec<String>>,
}

impl CacheDump {
    /// Renders the dump as pretty-printed JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

impl fmt::Display for CacheDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}
