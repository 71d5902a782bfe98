//! Compiled unit records fed to the cache by the compiler.
//!
//! A [`CompiledUnit`] carries the unit's name and kind, its serialized
//! descriptor, the source files it was produced from, and a decoded
//! [`UnitBody`] that the cache scans for compile-time constants and inline
//! function bodies.

use std::path::PathBuf;

use kiln_common::UnitName;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// How a compiled unit participates in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitKind {
    /// Synthetic unit aggregating a package's declarations under one entry point.
    PackageFacade,
    /// Facade for the top-level declarations of a single source file; a package part.
    FileFacade,
    /// A regular class-like unit.
    Class,
    /// A package part with no descriptor of its own.
    SyntheticPackagePart,
    /// Any other output (lambdas, annotations, ...); not tracked.
    Other,
}

impl UnitKind {
    /// Returns `true` for kinds whose declarations merge into a package facade.
    pub fn is_package_part(self) -> bool {
        matches!(self, UnitKind::FileFacade | UnitKind::SyntheticPackagePart)
    }
}

/// One compiled output unit.
#[derive(Debug, Clone)]
pub struct CompiledUnit {
    /// The unit's internal name.
    pub name: UnitName,
    /// The unit's kind.
    pub kind: UnitKind,
    /// Serialized descriptor (type and signature metadata).
    pub descriptor: Vec<u8>,
    /// Decoded unit body.
    pub body: UnitBody,
    /// Absolute paths of the sources this unit was compiled from.
    pub source_files: Vec<PathBuf>,
}

/// The members of a compiled unit that matter for change detection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitBody {
    /// Field declarations in declaration order.
    pub fields: Vec<FieldDecl>,
    /// Method declarations in declaration order.
    pub methods: Vec<MethodDecl>,
}

impl UnitBody {
    /// Encodes the body into its flat byte form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CacheError> {
        bincode::serde::encode_to_vec(self, bincode::config::standard()).map_err(|e| {
            CacheError::Serialization {
                reason: e.to_string(),
            }
        })
    }

    /// Decodes a body from its flat byte form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CacheError> {
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map(|(body, _)| body)
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })
    }
}

/// A field declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    /// The field name.
    pub name: String,
    /// Whether the field is static.
    pub is_static: bool,
    /// Whether the field is final.
    pub is_final: bool,
    /// The literal initializer, if the compiler emitted one.
    pub initializer: Option<Literal>,
}

impl FieldDecl {
    /// A `static final` field with a literal initializer.
    pub fn constant(name: impl Into<String>, value: Literal) -> Self {
        Self {
            name: name.into(),
            is_static: true,
            is_final: true,
            initializer: Some(value),
        }
    }
}

/// A literal initializer value as emitted by the compiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
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
    /// Boolean.
    Bool(bool),
    /// Character.
    Char(char),
    /// Class reference.
    Class(String),
}

/// A method declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    /// The method name.
    pub name: String,
    /// The method descriptor, e.g. `(I)I`.
    pub descriptor: String,
    /// Declared exception types.
    pub exceptions: Vec<String>,
    /// Whether the method is an inline function.
    pub is_inline: bool,
    /// The method body.
    pub instructions: Vec<Instruction>,
}

impl MethodDecl {
    /// An inline method with the given code.
    pub fn inline(
        name: impl Into<String>,
        descriptor: impl Into<String>,
        instructions: Vec<Instruction>,
    ) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            exceptions: Vec::new(),
            is_inline: true,
            instructions,
        }
    }

    /// The signature used as the inline-function key: name followed by descriptor.
    pub fn signature(&self) -> String {
        format!("{}{}", self.name, self.descriptor)
    }
}

/// One element of a method body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    /// An encoded executable instruction.
    Code(Vec<u8>),
    /// A jump target.
    Label(u32),
    /// Debug line number attached to a label.
    LineNumber {
        /// Source line.
        line: u32,
        /// Label the line starts at.
        label: u32,
    },
    /// Debug local variable table entry.
    LocalVariable {
        /// Variable name.
        name: String,
        /// Variable type descriptor.
        descriptor: String,
        /// First label of the variable's scope.
        start: u32,
        /// Last label of the variable's scope.
        end: u32,
        /// Slot index.
        index: u16,
    },
}

impl Instruction {
    /// Returns `true` for debug-only records that do not affect execution.
    pub fn is_debug(&self) -> bool {
        matches!(
            self,
            Instruction::LineNumber { .. } | Instruction::LocalVariable { .. }
        )
    }
}
