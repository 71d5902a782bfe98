//! Snapshot derivation from unit bodies.
//!
//! Two snapshots are derived per unit: the compile-time constants (static final
//! fields with a literal initializer) and the inline functions with a content
//! hash of each body. Inline hashes are computed over a canonical form that
//! drops debug records, so recompiling an unchanged body after unrelated line
//! shifts yields the same hash.

use std::collections::BTreeMap;
use std::fmt;

use kiln_common::{ContentHash, ContentHasher, InternalError, KilnResult};
use serde::{Deserialize, Serialize};

use crate::unit::{Instruction, Literal, MethodDecl, UnitBody};

/// Constants of one unit: field name to value.
pub type ConstantSnapshot = BTreeMap<String, ConstantValue>;

/// Inline functions of one unit: signature to body hash.
pub type InlineSnapshot = BTreeMap<String, ContentHash>;

/// A compile-time scalar constant.
///
/// Equality is structural. Floating-point values compare by bit pattern, so a
/// `NaN` constant equals itself and `0.0` differs from `-0.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConstantValue {
    /// 32-bit integer.
    Int(i32),
    /// 32-bit float.
    Float(f32),
    /// 64-bit integer.
    Long(i64),
    /// 64-bit float.
    Double(f64),
    /// String.
    Str(String),
}

impl PartialEq for ConstantValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (Self::Str(a), Self::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ConstantValue {}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}f"),
            Self::Long(v) => write!(f, "{v}L"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v:?}"),
        }
    }
}

impl TryFrom<&Literal> for ConstantValue {
    type Error = InternalError;

    fn try_from(literal: &Literal) -> Result<Self, Self::Error> {
        Ok(match literal {
            Literal::Int(v) => Self::Int(*v),
            Literal::Float(v) => Self::Float(*v),
            Literal::Long(v) => Self::Long(*v),
            Literal::Double(v) => Self::Double(*v),
            Literal::Str(v) => Self::Str(v.clone()),
            other => {
                return Err(InternalError::new(format!(
                    "unexpected constant kind: {other:?}"
                )))
            }
        })
    }
}

/// Collects the unit's compile-time constants.
///
/// Only `static final` fields with an initializer count. An initializer of a
/// kind the compiler never emits for constants is an internal error.
pub fn scan_constants(body: &UnitBody) -> KilnResult<ConstantSnapshot> {
    let mut constants = ConstantSnapshot::new();
    for field in &body.fields {
        if !(field.is_static && field.is_final) {
            continue;
        }
        if let Some(literal) = &field.initializer {
            let value = ConstantValue::try_from(literal).map_err(|e| {
                InternalError::new(format!("field '{}': {}", field.name, e.message))
            })?;
            constants.insert(field.name.clone(), value);
        }
    }
    Ok(constants)
}

/// Collects the unit's inline functions keyed by signature.
pub fn scan_inline_functions(body: &UnitBody) -> InlineSnapshot {
    body.methods
        .iter()
        .filter(|m| m.is_inline)
        .map(|m| (m.signature(), inline_body_hash(m)))
        .collect()
}

const TAG_CODE: u8 = 0;
const TAG_LABEL: u8 = 1;

/// Hashes the canonical form of a method: name, descriptor, exceptions, and
/// the non-debug instructions in order.
pub fn inline_body_hash(method: &MethodDecl) -> ContentHash {
    let mut hasher = ContentHasher::new();
    hasher
        .update(method.name.as_bytes())
        .update(method.descriptor.as_bytes())
        .update(&(method.exceptions.len() as u32).to_le_bytes());
    for exception in &method.exceptions {
        hasher.update(exception.as_bytes());
    }
    for instruction in method.instructions.iter().filter(|i| !i.is_debug()) {
        match instruction {
            Instruction::Code(bytes) => {
                hasher.update(&[TAG_CODE]).update(bytes);
            }
            Instruction::Label(id) => {
                hasher.update(&[TAG_LABEL]).update(&id.to_le_bytes());
            }
            _ => {}
        }
    }
    hasher.finish()
}
