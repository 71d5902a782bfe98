//! Typed maps over durable keyed stores.
//!
//! Each map owns one store and one concern. Maps that classify change
//! compare the incoming snapshot against the stored one and only write when
//! they differ, so a round interrupted between two maps is repaired by the
//! next round's comparisons.

use std::path::Path;

use kiln_config::StoreBackend;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CacheError;
use crate::store::{FileStore, KeyedStore, MemoryStore};
use crate::version::MAP_FILE_EXT;

mod constants;
mod descriptors;
mod dirty_inline;
mod dirty_outputs;
mod inline_functions;
mod inline_usage;
mod package_parts;
mod source_outputs;

pub use constants::ConstantMap;
pub use descriptors::DescriptorMap;
pub use dirty_inline::DirtyInlineFunctionsMap;
pub use dirty_outputs::DirtyOutputsMap;
pub use inline_functions::InlineFunctionMap;
pub use inline_usage::{InlineSite, InlineUsageMap};
pub use package_parts::PackagePartMap;
pub use source_outputs::SourceToOutputsMap;

/// Lifecycle shared by every typed map.
pub trait CacheMap {
    /// Persists buffered writes; see [`KeyedStore::flush`].
    fn flush(&mut self, memory_only: bool) -> Result<(), CacheError>;

    /// Discards all state.
    fn clean(&mut self) -> Result<(), CacheError>;

    /// Flushes durably and releases the underlying store.
    fn close(&mut self) -> Result<(), CacheError>;
}

/// Implements [`CacheMap`] by delegating to the map's `store` field.
macro_rules! impl_cache_map {
    ($map:ty) => {
        impl $crate::maps::CacheMap for $map {
            fn flush(&mut self, memory_only: bool) -> Result<(), $crate::error::CacheError> {
                self.store.flush(memory_only)
            }

            fn clean(&mut self) -> Result<(), $crate::error::CacheError> {
                self.store.clean()
            }

            fn close(&mut self) -> Result<(), $crate::error::CacheError> {
                self.store.close()
            }
        }
    };
}
pub(crate) use impl_cache_map;

/// Opens the store for one map file under `cache_dir`.
pub(crate) fn open_store<K, V>(
    backend: StoreBackend,
    cache_dir: &Path,
    name: &str,
) -> Result<Box<dyn KeyedStore<K, V>>, CacheError>
where
    K: Ord + Clone + Serialize + DeserializeOwned + 'static,
    V: Serialize + DeserializeOwned + 'static,
{
    Ok(match backend {
        StoreBackend::Disk => {
            let path = cache_dir.join(format!("{name}.{MAP_FILE_EXT}"));
            Box::new(FileStore::open(&path)?)
        }
        StoreBackend::Memory => Box::new(MemoryStore::new()),
    })
}

#[cfg(test)]
pub(crate) fn memory_store<K, V>() -> Box<dyn KeyedStore<K, V>>
where
    K: Ord + Clone + 'static,
    V: 'static,
{
    Box::new(MemoryStore::new())
}
