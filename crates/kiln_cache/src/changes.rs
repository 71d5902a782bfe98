//! Change records produced by the typed maps.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// What changed about one unit (or a batch of units) in the current round.
///
/// The four facets are independent. Records from several maps are combined
/// with `|`, which ORs each facet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeRecord {
    /// The descriptor is new or its structural signature changed.
    pub descriptor_changed: bool,
    /// Some compile-time constant appeared, disappeared, or changed value.
    pub constants_changed: bool,
    /// Some inline function body hash changed.
    pub inline_changed: bool,
    /// Some inline function was added.
    pub inline_added: bool,
}

impl ChangeRecord {
    /// The record with every facet unset.
    pub const NONE: ChangeRecord = ChangeRecord {
        descriptor_changed: false,
        constants_changed: false,
        inline_changed: false,
        inline_added: false,
    };

    /// Returns `true` if any facet is set.
    pub fn has_changes(&self) -> bool {
        *self != Self::NONE
    }

    pub(crate) fn descriptor(changed: bool) -> Self {
        Self {
            descriptor_changed: changed,
            ..Self::NONE
        }
    }

    pub(crate) fn constants(changed: bool) -> Self {
        Self {
            constants_changed: changed,
            ..Self::NONE
        }
    }
}

impl BitOr for ChangeRecord {
    type Output = ChangeRecord;

    fn bitor(self, other: ChangeRecord) -> ChangeRecord {
        ChangeRecord {
            descriptor_changed: self.descriptor_changed || other.descriptor_changed,
            constants_changed: self.constants_changed || other.constants_changed,
            inline_changed: self.inline_changed || other.inline_changed,
            inline_added: self.inline_added || other.inline_added,
        }
    }
}

impl BitOrAssign for ChangeRecord {
    fn bitor_assign(&mut self, other: ChangeRecord) {
        *self = *self | other;
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let facets = [
            (self.descriptor_changed, "descriptor"),
            (self.constants_changed, "constants"),
            (self.inline_changed, "inline-changed"),
            (self.inline_added, "inline-added"),
        ];
        let set: Vec<&str> = facets
            .iter()
            .filter(|(on, _)| *on)
            .map(|(_, name)| *name)
            .collect();
        if set.is_empty() {
            f.write_str("no changes")
        } else {
            f.write_str(&set.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_none() {
        assert_eq!(ChangeRecord::default(), ChangeRecord::NONE);
        assert!(!ChangeRecord::NONE.has_changes());
    }

    #[test]
    fn or_combines_each_facet() {
        let a = ChangeRecord::descriptor(true);
        let b = ChangeRecord {
            inline_added: true,
            ..ChangeRecord::NONE
        };
        let combined = a | b;
        assert!(combined.descriptor_changed);
        assert!(combined.inline_added);
        assert!(!combined.constants_changed);
        assert!(!combined.inline_changed);
    }

    #[test]
    fn or_assign_accumulates() {
        let mut acc = ChangeRecord::NONE;
        acc |= ChangeRecord::constants(true);
        acc |= ChangeRecord::NONE;
        assert_eq!(acc, ChangeRecord::constants(true));
    }

    #[test]
    fn display_lists_set_facets() {
        let record = ChangeRecord::descriptor(true) | ChangeRecord::constants(true);
        assert_eq!(record.to_string(), "descriptor, constants");
        assert_eq!(ChangeRecord::NONE.to_string(), "no changes");
    }
}
