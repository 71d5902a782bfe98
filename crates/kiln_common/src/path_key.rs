//! Normalized file path keys with platform-aware equality.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// Whether the host file system compares paths case-sensitively.
pub const CASE_SENSITIVE_PATHS: bool = !cfg!(any(windows, target_os = "macos"));

/// A file path normalized for use as a map key.
///
/// Separators are unified to `/`, `.` segments and redundant separators are
/// dropped, and `..` segments are resolved lexically without climbing above a
/// `/` or drive-letter root. On case-insensitive
/// platforms equality, ordering and hashing ignore ASCII case while the
/// original spelling is kept for display.
#[derive(Clone)]
pub struct PathKey {
    normalized: String,
}

impl PathKey {
    /// Normalizes a path into a key.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::from_str_lossy(&path.as_ref().to_string_lossy())
    }

    /// Normalizes a path string into a key.
    pub fn from_str_lossy(raw: &str) -> Self {
        let unified = raw.replace('\\', "/");
        let (root, rest) = split_root(&unified);
        let mut segments: Vec<&str> = Vec::new();
        for segment in rest.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if matches!(segments.last(), Some(last) if *last != "..") {
                        segments.pop();
                    } else if root.is_none() {
                        segments.push("..");
                    }
                }
                other => segments.push(other),
            }
        }
        let joined = segments.join("/");
        let normalized = match root {
            Some(root) => format!("{root}/{joined}"),
            None => joined,
        };
        Self { normalized }
    }

    /// Returns the normalized path string.
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// Returns the normalized path as a [`PathBuf`].
    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(&self.normalized)
    }

    fn folded_bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.normalized.bytes().map(|b| {
            if CASE_SENSITIVE_PATHS {
                b
            } else {
                b.to_ascii_lowercase()
            }
        })
    }
}

/// Splits a `/`-separated path into its root (`""` for `/`, `"C:"` for a
/// drive) and the remainder.
fn split_root(path: &str) -> (Option<&str>, &str) {
    if let Some(rest) = path.strip_prefix('/') {
        return (Some(""), rest);
    }
    let bytes = path.as_bytes();
    let is_drive = bytes.len() >= 2
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes.len() == 2 || bytes[2] == b'/');
    if is_drive {
        (Some(&path[..2]), &path[2..])
    } else {
        (None, path)
    }
}

impl PartialEq for PathKey {
    fn eq(&self, other: &Self) -> bool {
        self.normalized.len() == other.normalized.len()
            && self.folded_bytes().eq(other.folded_bytes())
    }
}

impl Eq for PathKey {}

impl Hash for PathKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.folded_bytes() {
            state.write_u8(b);
        }
        state.write_usize(self.normalized.len());
    }
}

impl PartialOrd for PathKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PathKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded_bytes().cmp(other.folded_bytes())
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized)
    }
}

impl fmt::Debug for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PathKey({})", self.normalized)
    }
}

impl Serialize for PathKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.normalized)
    }
}

impl<'de> Deserialize<'de> for PathKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_str_lossy(&raw))
    }
}

impl From<&str> for PathKey {
    fn from(raw: &str) -> Self {
        Self::from_str_lossy(raw)
    }
}

impl From<&Path> for PathKey {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn collapses_dot_segments() {
        let key = PathKey::from("/out/./classes//a/../B.class");
        assert_eq!(key.as_str(), "/out/classes/B.class");
    }

    #[test]
    fn unifies_backslashes() {
        let key = PathKey::from("C:\\out\\A.class");
        assert_eq!(key.as_str(), "C:/out/A.class");
    }

    #[test]
    fn parent_of_drive_root_stays_at_drive() {
        assert_eq!(PathKey::from("C:\\..\\x").as_str(), "C:/x");
        assert_eq!(PathKey::from("d:/out/../A.class").as_str(), "d:/A.class");
        assert_eq!(PathKey::from("C:").as_str(), "C:/");
    }

    #[test]
    fn drive_letter_needs_separator() {
        assert_eq!(PathKey::from("C:file/../x").as_str(), "x");
    }

    #[test]
    fn parent_of_root_stays_at_root() {
        let key = PathKey::from("/../x");
        assert_eq!(key.as_str(), "/x");
    }

    #[test]
    fn relative_leading_parent_is_kept() {
        let key = PathKey::from("../x/./y");
        assert_eq!(key.as_str(), "../x/y");
    }

    #[test]
    fn equivalent_spellings_hash_together() {
        let mut set = HashSet::new();
        set.insert(PathKey::from("/out/A.class"));
        set.insert(PathKey::from("/out/./A.class"));
        set.insert(PathKey::from("/out//A.class"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn case_handling_follows_platform() {
        let lower = PathKey::from("/out/a.class");
        let upper = PathKey::from("/out/A.class");
        assert_eq!(lower == upper, !CASE_SENSITIVE_PATHS);
    }

    #[test]
    fn serde_normalizes_on_read() {
        let key: PathKey = serde_json::from_str("\"/a/./b\"").unwrap();
        assert_eq!(key.as_str(), "/a/b");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"/a/b\"");
    }
}
