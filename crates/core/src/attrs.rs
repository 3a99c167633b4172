//! Per-path key/value attribute stores
//!
//! The engine caches identities and content hashes in a side channel scoped to
//! each path. On most Unix filesystems that channel is extended attributes; on
//! others writes are simply rejected. Every operation reports failure through
//! [`AttrError`] and callers treat it as "absent" or "not written".

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Key holding the cached entity id
pub const KEY_UUID: &str = "uuid";
/// Key holding the cached creation-time marker
pub const KEY_CTIME: &str = "ctime";
/// Key holding the cached content id
pub const KEY_CID: &str = "cid";

/// An attribute-store call did not succeed
#[derive(Error, Debug)]
pub enum AttrError {
    #[error("attributes unsupported for {}: {source}", path.display())]
    Unsupported {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("attribute store is read-only")]
    ReadOnly,
}

pub type AttrResult<T> = std::result::Result<T, AttrError>;

/// Narrow capability over a per-path key/value store
pub trait AttributeStore {
    /// Read `key` for `path`. `Ok(None)` means the key is not set.
    fn get(&self, path: &Path, key: &str) -> AttrResult<Option<String>>;

    fn set(&self, path: &Path, key: &str, value: &str) -> AttrResult<()>;

    fn remove(&self, path: &Path, key: &str) -> AttrResult<()>;

    /// Read a key, folding every failure into "absent"
    fn lookup(&self, path: &Path, key: &str) -> Option<String> {
        match self.get(path, key) {
            Ok(value) => value,
            Err(e) => {
                tracing::trace!("attr get {} failed: {}", key, e);
                None
            }
        }
    }

    /// Write a key, returning whether the store accepted it
    fn store(&self, path: &Path, key: &str, value: &str) -> bool {
        match self.set(path, key, value) {
            Ok(()) => true,
            Err(e) => {
                tracing::trace!("attr set {} failed: {}", key, e);
                false
            }
        }
    }

    /// Remove a key, ignoring failures
    fn discard(&self, path: &Path, key: &str) {
        if let Err(e) = self.remove(path, key) {
            tracing::trace!("attr remove {} failed: {}", key, e);
        }
    }
}

impl<S: AttributeStore + ?Sized> AttributeStore for &S {
    fn get(&self, path: &Path, key: &str) -> AttrResult<Option<String>> {
        (**self).get(path, key)
    }

    fn set(&self, path: &Path, key: &str, value: &str) -> AttrResult<()> {
        (**self).set(path, key, value)
    }

    fn remove(&self, path: &Path, key: &str) -> AttrResult<()> {
        (**self).remove(path, key)
    }
}

impl<S: AttributeStore + ?Sized> AttributeStore for Arc<S> {
    fn get(&self, path: &Path, key: &str) -> AttrResult<Option<String>> {
        (**self).get(path, key)
    }

    fn set(&self, path: &Path, key: &str, value: &str) -> AttrResult<()> {
        (**self).set(path, key, value)
    }

    fn remove(&self, path: &Path, key: &str) -> AttrResult<()> {
        (**self).remove(path, key)
    }
}

/// Extended-attribute backed store
#[derive(Debug, Clone)]
pub struct XattrStore {
    namespace: String,
}

impl XattrStore {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Full attribute name for a key, e.g. `user.hyfs.uuid`
    pub fn attr_name(&self, key: &str) -> String {
        format!("{}.{}", self.namespace, key)
    }

    fn unsupported(path: &Path, source: std::io::Error) -> AttrError {
        AttrError::Unsupported {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl Default for XattrStore {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_ATTR_NAMESPACE)
    }
}

impl AttributeStore for XattrStore {
    fn get(&self, path: &Path, key: &str) -> AttrResult<Option<String>> {
        let raw = xattr::get(path, self.attr_name(key)).map_err(|e| Self::unsupported(path, e))?;
        // Values we did not write (non UTF-8) count as absent
        Ok(raw.and_then(|bytes| String::from_utf8(bytes).ok()))
    }

    fn set(&self, path: &Path, key: &str, value: &str) -> AttrResult<()> {
        xattr::set(path, self.attr_name(key), value.as_bytes())
            .map_err(|e| Self::unsupported(path, e))
    }

    fn remove(&self, path: &Path, key: &str) -> AttrResult<()> {
        xattr::remove(path, self.attr_name(key)).map_err(|e| Self::unsupported(path, e))
    }
}

/// In-process store
///
/// Useful where extended attributes are unavailable and in tests. A read-only
/// store rejects writes and removals but still serves whatever it holds.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<(PathBuf, String), String>>,
    read_only: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_only() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            read_only: true,
        }
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl AttributeStore for MemoryStore {
    fn get(&self, path: &Path, key: &str) -> AttrResult<Option<String>> {
        Ok(self
            .entries
            .read()
            .get(&(path.to_path_buf(), key.to_string()))
            .cloned())
    }

    fn set(&self, path: &Path, key: &str, value: &str) -> AttrResult<()> {
        if self.read_only {
            return Err(AttrError::ReadOnly);
        }
        self.entries
            .write()
            .insert((path.to_path_buf(), key.to_string()), value.to_string());
        Ok(())
    }

    fn remove(&self, path: &Path, key: &str) -> AttrResult<()> {
        if self.read_only {
            return Err(AttrError::ReadOnly);
        }
        self.entries
            .write()
            .remove(&(path.to_path_buf(), key.to_string()));
        Ok(())
    }
}

/// Store that rejects every call, like a filesystem without xattr support
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedStore;

impl UnsupportedStore {
    fn error(path: &Path) -> AttrError {
        AttrError::Unsupported {
            path: path.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "extended attributes not supported",
            ),
        }
    }
}

impl AttributeStore for UnsupportedStore {
    fn get(&self, path: &Path, _key: &str) -> AttrResult<Option<String>> {
        Err(Self::error(path))
    }

    fn set(&self, path: &Path, _key: &str, _value: &str) -> AttrResult<()> {
        Err(Self::error(path))
    }

    fn remove(&self, path: &Path, _key: &str) -> AttrResult<()> {
        Err(Self::error(path))
    }
}
