//! Incremental compilation cache.
//!
//! Records, per compiled unit, enough fingerprint data to classify exactly what
//! changed after a source edit and which other units (including call sites in
//! other targets that inlined a changed function body) must be rebuilt.
//!
//! The entry point is [`IncrementalCache`], one per build target. It owns a set
//! of typed maps, each backed by a [`KeyedStore`], and a format version stamp
//! that invalidates the whole directory on layout changes.

#![warn(missing_docs)]

pub mod cache;
pub mod changes;
pub mod descriptor;
pub mod dump;
pub mod error;
pub mod maps;
pub mod package_parts;
pub mod scan;
pub mod store;
pub mod unit;
pub mod version;

pub use cache::{CacheOptions, IncrementalCache, MODULE_MAPPING_UNIT};
pub use changes::ChangeRecord;
pub use descriptor::{
    difference, Descriptor, DescriptorValue, DifferenceKind, MemberSignature, Visibility,
};
pub use dump::CacheDump;
pub use error::CacheError;
pub use package_parts::{IncrementalPackagePartProvider, ModuleMapping, PackagePartProvider};
pub use scan::{ConstantSnapshot, ConstantValue, InlineSnapshot};
pub use store::{AppendStore, FileStore, KeyedStore, MemoryStore};
pub use unit::{CompiledUnit, FieldDecl, Instruction, Literal, MethodDecl, UnitBody, UnitKind};
pub use version::{CacheFormatVersion, CACHE_FORMAT_VERSION};
