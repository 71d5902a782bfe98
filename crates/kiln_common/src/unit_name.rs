//! Stable names for compiled output units.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The internal name of one compiled output unit, e.g. `com/acme/Widget`.
///
/// Segments are separated by `/`; everything before the last segment is the
/// unit's package. The name is the primary key of every typed map.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitName(String);

impl UnitName {
    /// Creates a unit name from its internal (`/`-separated) form.
    pub fn new(internal_name: impl Into<String>) -> Self {
        Self(internal_name.into())
    }

    /// Returns the internal (`/`-separated) form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the package portion of the name, `""` for the root package.
    pub fn package(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[..idx],
            None => "",
        }
    }
}

impl fmt::Display for UnitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for UnitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnitName({})", self.0)
    }
}

impl From<&str> for UnitName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UnitName {
    fn from(s: String) -> Self {
        Self(s)
    }
}
