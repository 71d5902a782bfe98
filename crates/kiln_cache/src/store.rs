//! Durable keyed stores backing the typed maps.
//!
//! A store is a mapping from a key to a serializable value with point lookup,
//! upsert, delete, key enumeration, and explicit flush. Each typed map owns
//! exactly one store; with the disk backend that is one file.
//!
//! On-disk layout of a [`FileStore`]:
//!
//! ```text
//! b"KILN" | u32 store format | u32 record count | record*
//! record = u32 key length | key bytes | u32 value length | value bytes
//! ```
//!
//! Keys and values are bincode-encoded. All integers are little-endian.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CacheError;

/// Magic bytes identifying a kiln store file.
const STORE_MAGIC: [u8; 4] = *b"KILN";

/// Current store file format. Increment on breaking changes to the record layout.
const STORE_FORMAT_VERSION: u32 = 1;

/// Size of the fixed file header: magic, format version, record count.
const HEADER_LEN: usize = 12;

/// A persistent key/value mapping used by one typed map.
///
/// Only a single writer is ever active on a store; implementations do no
/// locking of their own.
pub trait KeyedStore<K, V> {
    /// Returns the value stored under `key`.
    fn get(&self, key: &K) -> Option<&V>;

    /// Inserts or replaces the value under `key`.
    fn put(&mut self, key: K, value: V);

    /// Removes `key`, returning whether it was present.
    fn remove(&mut self, key: &K) -> bool;

    /// Returns `true` if a value is stored under `key`.
    fn contains_key(&self, key: &K) -> bool;

    /// Returns every stored key in ascending order.
    fn keys(&self) -> Vec<K>;

    /// Persists buffered writes. With `memory_only` the write skips the
    /// durability barrier (no fsync).
    fn flush(&mut self, memory_only: bool) -> Result<(), CacheError>;

    /// Discards all stored state, including anything already persisted.
    fn clean(&mut self) -> Result<(), CacheError>;

    /// Flushes durably and releases the store.
    fn close(&mut self) -> Result<(), CacheError>;
}

/// Append-to-list on stores whose values are lists.
pub trait AppendStore<K, T> {
    /// Appends `item` to the list under `key`, creating the list if absent.
    fn append(&mut self, key: K, item: T);
}

impl<K, T, S> AppendStore<K, T> for S
where
    S: KeyedStore<K, Vec<T>> + ?Sized,
    T: Clone,
{
    fn append(&mut self, key: K, item: T) {
        let mut list = self.get(&key).cloned().unwrap_or_default();
        list.push(item);
        self.put(key, list);
    }
}

/// A store held entirely in memory and never persisted.
#[derive(Debug)]
pub struct MemoryStore<K, V> {
    entries: BTreeMap<K, V>,
}

impl<K: Ord, V> MemoryStore<K, V> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<K: Ord, V> Default for MemoryStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone, V> KeyedStore<K, V> for MemoryStore<K, V> {
    fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    fn put(&mut self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    fn remove(&mut self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    fn keys(&self) -> Vec<K> {
        self.entries.keys().cloned().collect()
    }

    fn flush(&mut self, _memory_only: bool) -> Result<(), CacheError> {
        Ok(())
    }

    fn clean(&mut self) -> Result<(), CacheError> {
        self.entries.clear();
        Ok(())
    }

    fn close(&mut self) -> Result<(), CacheError> {
        Ok(())
    }
}

/// A store persisted as a single file.
///
/// The file is read eagerly at open and rewritten whole on flush, through a
/// temporary sibling that is renamed into place.
#[derive(Debug)]
pub struct FileStore<K, V> {
    path: PathBuf,
    entries: BTreeMap<K, V>,
    dirty: bool,
}

impl<K, V> FileStore<K, V>
where
    K: Ord + Clone + Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
{
    /// Opens the store at `path`, loading every record.
    ///
    /// A missing file is an empty store. A file with a bad header or a record
    /// that fails to decode is an error: the whole cache must be rebuilt.
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        let entries = match std::fs::read(path) {
            Ok(raw) => decode_records(path, &raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(CacheError::io(path, e)),
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries,
            dirty: false,
        })
    }

    fn write_file(&self, sync: bool) -> Result<(), CacheError> {
        if self.entries.is_empty() {
            return remove_if_exists(&self.path);
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;
        }

        let bytes = encode_records(&self.entries)?;
        let tmp = temp_path(&self.path);
        let mut file = File::create(&tmp).map_err(|e| CacheError::io(&tmp, e))?;
        file.write_all(&bytes).map_err(|e| CacheError::io(&tmp, e))?;
        if sync {
            file.sync_all().map_err(|e| CacheError::io(&tmp, e))?;
        }
        drop(file);
        std::fs::rename(&tmp, &self.path).map_err(|e| CacheError::io(&self.path, e))
    }
}

impl<K, V> KeyedStore<K, V> for FileStore<K, V>
where
    K: Ord + Clone + Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
{
    fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    fn put(&mut self, key: K, value: V) {
        self.entries.insert(key, value);
        self.dirty = true;
    }

    fn remove(&mut self, key: &K) -> bool {
        let removed = self.entries.remove(key).is_some();
        self.dirty |= removed;
        removed
    }

    fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    fn keys(&self) -> Vec<K> {
        self.entries.keys().cloned().collect()
    }

    fn flush(&mut self, memory_only: bool) -> Result<(), CacheError> {
        if !self.dirty {
            return Ok(());
        }
        self.write_file(!memory_only)?;
        self.dirty = false;
        Ok(())
    }

    fn clean(&mut self) -> Result<(), CacheError> {
        self.entries.clear();
        self.dirty = false;
        remove_if_exists(&self.path)?;
        remove_if_exists(&temp_path(&self.path))
    }

    fn close(&mut self) -> Result<(), CacheError> {
        self.flush(false)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

fn remove_if_exists(path: &Path) -> Result<(), CacheError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CacheError::io(path, e)),
    }
}

fn encode_records<K: Serialize, V: Serialize>(
    entries: &BTreeMap<K, V>,
) -> Result<Vec<u8>, CacheError> {
    let mut output = Vec::with_capacity(HEADER_LEN + entries.len() * 32);
    output.extend_from_slice(&STORE_MAGIC);
    output.extend_from_slice(&STORE_FORMAT_VERSION.to_le_bytes());
    output.extend_from_slice(&(entries.len() as u32).to_le_bytes());

    for (key, value) in entries {
        write_chunk(&mut output, &encode(key)?);
        write_chunk(&mut output, &encode(value)?);
    }
    Ok(output)
}

fn decode_records<K, V>(path: &Path, raw: &[u8]) -> Result<BTreeMap<K, V>, CacheError>
where
    K: Ord + DeserializeOwned,
    V: DeserializeOwned,
{
    let invalid_header = |reason: &str| CacheError::InvalidHeader {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };
    let malformed = |reason: String| CacheError::MalformedRecord {
        path: path.to_path_buf(),
        reason,
    };

    if raw.len() < HEADER_LEN {
        return Err(invalid_header("file shorter than header"));
    }
    if raw[..4] != STORE_MAGIC {
        return Err(invalid_header("missing magic bytes"));
    }
    let format = read_u32(raw, 4).ok_or_else(|| invalid_header("truncated format version"))?;
    if format != STORE_FORMAT_VERSION {
        return Err(invalid_header(&format!(
            "store format {format}, expected {STORE_FORMAT_VERSION}"
        )));
    }
    let count = read_u32(raw, 8).ok_or_else(|| invalid_header("truncated record count"))?;

    let mut entries = BTreeMap::new();
    let mut offset = HEADER_LEN;
    for index in 0..count {
        let key_bytes = read_chunk(raw, &mut offset)
            .ok_or_else(|| malformed(format!("record {index}: truncated key")))?;
        let value_bytes = read_chunk(raw, &mut offset)
            .ok_or_else(|| malformed(format!("record {index}: truncated value")))?;
        let key: K = decode(key_bytes)
            .map_err(|reason| malformed(format!("record {index}: bad key: {reason}")))?;
        let value: V = decode(value_bytes)
            .map_err(|reason| malformed(format!("record {index}: bad value: {reason}")))?;
        entries.insert(key, value);
    }

    if offset != raw.len() {
        return Err(malformed(format!(
            "{} trailing bytes after {count} records",
            raw.len() - offset
        )));
    }
    Ok(entries)
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CacheError> {
    bincode::serde::encode_to_vec(value, bincode::config::standard()).map_err(|e| {
        CacheError::Serialization {
            reason: e.to_string(),
        }
    })
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, String> {
    let (value, read) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map_err(|e| e.to_string())?;
    if read != bytes.len() {
        return Err(format!("{} unread bytes", bytes.len() - read));
    }
    Ok(value)
}

fn write_chunk(output: &mut Vec<u8>, chunk: &[u8]) {
    output.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
    output.extend_from_slice(chunk);
}

fn read_u32(raw: &[u8], offset: usize) -> Option<u32> {
    let bytes = raw.get(offset..offset + 4)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

fn read_chunk<'a>(raw: &'a [u8], offset: &mut usize) -> Option<&'a [u8]> {
    let len = read_u32(raw, *offset)? as usize;
    let start = *offset + 4;
    let chunk = raw.get(start..start.checked_add(len)?)?;
    *offset = start + len;
    Some(chunk)
}
