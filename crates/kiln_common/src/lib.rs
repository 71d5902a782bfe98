//! Shared foundational types used across the kiln incremental cache.
//!
//! This crate provides content hashing, unit names, normalized path keys,
//! and the common internal error type.

#![warn(missing_docs)]

pub mod hash;
pub mod path_key;
pub mod result;
pub mod unit_name;

pub use hash::{ContentHash, ContentHasher};
pub use path_key::PathKey;
pub use result::{InternalError, KilnResult};
pub use unit_name::UnitName;
