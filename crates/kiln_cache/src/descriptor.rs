//! Unit descriptors and structural signature comparison.
//!
//! The descriptor of a unit is an opaque byte blob to most of the cache. When
//! it decodes as a [`Descriptor`], [`difference`] compares the parts that
//! callers can observe (supertypes and non-private members) so that edits to
//! private members do not cascade into dependents.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Stored descriptor snapshot of one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorValue {
    /// Whether the unit is stored as a package facade.
    pub is_package_facade: bool,
    /// Serialized descriptor bytes.
    pub bytes: Vec<u8>,
}

/// Decoded type and signature metadata of a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    /// Internal names of direct supertypes.
    pub supertypes: Vec<String>,
    /// Declared members.
    pub members: Vec<MemberSignature>,
}

/// One member as seen by callers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberSignature {
    /// Member name.
    pub name: String,
    /// Type signature.
    pub signature: String,
    /// Visibility.
    pub visibility: Visibility,
}

/// Member visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Visibility {
    /// Visible everywhere.
    Public,
    /// Visible to subtypes.
    Protected,
    /// Visible inside the module.
    Internal,
    /// Visible inside the unit only.
    Private,
}

impl Descriptor {
    /// Encodes the descriptor into the bytes stored by the cache.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CacheError> {
        bincode::serde::encode_to_vec(self, bincode::config::standard()).map_err(|e| {
            CacheError::Serialization {
                reason: e.to_string(),
            }
        })
    }

    /// Decodes descriptor bytes; `None` if they are not a descriptor.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let (descriptor, read) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard()).ok()?;
        (read == bytes.len()).then_some(descriptor)
    }

    fn visible_members(&self) -> BTreeSet<&MemberSignature> {
        self.members
            .iter()
            .filter(|m| m.visibility != Visibility::Private)
            .collect()
    }
}

/// How two descriptor snapshots differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DifferenceKind {
    /// No caller-visible difference.
    None,
    /// The unit's own signature changed (kind or supertypes), or the bytes
    /// could not be compared structurally.
    ClassSignature,
    /// Only the named caller-visible members changed.
    Members(BTreeSet<String>),
}

/// Compares two descriptor snapshots structurally.
pub fn difference(old: &DescriptorValue, new: &DescriptorValue) -> DifferenceKind {
    if old.is_package_facade != new.is_package_facade {
        return DifferenceKind::ClassSignature;
    }
    if old.bytes == new.bytes {
        return DifferenceKind::None;
    }

    let (Some(old_desc), Some(new_desc)) = (
        Descriptor::from_bytes(&old.bytes),
        Descriptor::from_bytes(&new.bytes),
    ) else {
        return DifferenceKind::ClassSignature;
    };

    let old_supers: BTreeSet<&String> = old_desc.supertypes.iter().collect();
    let new_supers: BTreeSet<&String> = new_desc.supertypes.iter().collect();
    if old_supers != new_supers {
        return DifferenceKind::ClassSignature;
    }

    let old_members = old_desc.visible_members();
    let new_members = new_desc.visible_members();
    let changed: BTreeSet<String> = old_members
        .symmetric_difference(&new_members)
        .map(|m| m.name.clone())
        .collect();

    if changed.is_empty() {
        DifferenceKind::None
    } else {
        DifferenceKind::Members(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str, signature: &str, visibility: Visibility) -> MemberSignature {
        MemberSignature {
            name: name.to_string(),
            signature: signature.to_string(),
            visibility,
        }
    }

    fn value(desc: &Descriptor) -> DescriptorValue {
        DescriptorValue {
            is_package_facade: false,
            bytes: desc.to_bytes().unwrap(),
        }
    }

    fn base() -> Descriptor {
        Descriptor {
            supertypes: vec!["java/lang/Object".to_string()],
            members: vec![
                member("run", "()V", Visibility::Public),
                member("helper", "()I", Visibility::Private),
            ],
        }
    }

    #[test]
    fn identical_bytes_no_difference() {
        assert_eq!(difference(&value(&base()), &value(&base())), DifferenceKind::None);
    }

    #[test]
    fn private_member_change_is_invisible() {
        let mut changed = base();
        changed.members[1].signature = "()J".to_string();
        assert_eq!(difference(&value(&base()), &value(&changed)), DifferenceKind::None);
    }

    #[test]
    fn member_order_is_irrelevant() {
        let mut reordered = base();
        reordered.members.reverse();
        assert_eq!(difference(&value(&base()), &value(&reordered)), DifferenceKind::None);
    }

    #[test]
    fn public_member_change_is_reported_by_name() {
        let mut changed = base();
        changed.members[0].signature = "(I)V".to_string();
        changed.members.push(member("added", "()V", Visibility::Internal));
        let expected: BTreeSet<String> = ["added".to_string(), "run".to_string()].into();
        assert_eq!(
            difference(&value(&base()), &value(&changed)),
            DifferenceKind::Members(expected)
        );
    }

    #[test]
    fn supertype_change_is_class_signature() {
        let mut changed = base();
        changed.supertypes.push("java/io/Serializable".to_string());
        assert_eq!(
            difference(&value(&base()), &value(&changed)),
            DifferenceKind::ClassSignature
        );
    }

    #[test]
    fn facade_flag_change_is_class_signature() {
        let old = value(&base());
        let mut new = old.clone();
        new.is_package_facade = true;
        assert_eq!(difference(&old, &new), DifferenceKind::ClassSignature);
    }

    #[test]
    fn opaque_bytes_fall_back_to_inequality() {
        let old = DescriptorValue {
            is_package_facade: false,
            bytes: vec![0xff, 0x01],
        };
        let new = DescriptorValue {
            is_package_facade: false,
            bytes: vec![0xff, 0x02],
        };
        assert_eq!(difference(&old, &new), DifferenceKind::ClassSignature);
        assert_eq!(difference(&old, &old.clone()), DifferenceKind::None);
    }
}
