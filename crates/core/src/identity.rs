//! Stable entity ids for filesystem paths
//!
//! Resolution order:
//! 1. make sure a `ctime` marker is cached (computed from mtime when absent)
//! 2. return a stored `uuid` if the path already has one
//! 3. otherwise mint a fresh UUID and try to store it
//! 4. if the store rejects it, derive a deterministic id from
//!    `sha256(device:inode:ctime)`
//!
//! Step 4 keeps repeated scans stable on filesystems without extended
//! attributes, but the id does not follow the file across devices and can be
//! reused if the inode is recycled.

use crate::attrs::{AttributeStore, KEY_CTIME, KEY_UUID};
use crate::error::{HyfsError, Result};
use crate::hash::hash_bytes;
use crate::node::Eid;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;
use uuid::Uuid;

/// Source of fresh identifiers
pub trait IdGenerator: Send {
    fn next_id(&mut self) -> Uuid;
}

impl<F> IdGenerator for F
where
    F: FnMut() -> Uuid + Send,
{
    fn next_id(&mut self) -> Uuid {
        self()
    }
}

/// Random (v4) UUIDs
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&mut self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Counter-backed UUIDs, starting after `start`
#[derive(Debug, Default, Clone)]
pub struct SequentialIds {
    counter: u128,
}

impl SequentialIds {
    pub fn starting_at(start: u128) -> Self {
        Self { counter: start }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> Uuid {
        self.counter = self.counter.wrapping_add(1);
        Uuid::from_u128(self.counter)
    }
}

/// The stat fields identity resolution depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub device: u64,
    pub inode: u64,
    pub modified: SystemTime,
}

impl FileStat {
    pub fn from_metadata(meta: &std::fs::Metadata) -> std::io::Result<Self> {
        #[cfg(unix)]
        let (device, inode) = {
            use std::os::unix::fs::MetadataExt;
            (meta.dev(), meta.ino())
        };
        #[cfg(not(unix))]
        let (device, inode) = (0, 0);

        Ok(Self {
            device,
            inode,
            modified: meta.modified()?,
        })
    }

    pub fn of(path: &Path) -> Result<Self> {
        let meta = std::fs::metadata(path).map_err(|e| HyfsError::io(path, e))?;
        Self::from_metadata(&meta).map_err(|e| HyfsError::io(path, e))
    }

    /// Modification time as fractional seconds since the epoch, e.g. `1700000000.25`
    pub fn mtime_marker(&self) -> String {
        let secs = match self.modified.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs_f64(),
            Err(e) => -e.duration().as_secs_f64(),
        };
        format!("{secs:?}")
    }
}

/// Deterministic UUID-shaped id from `sha256("{device}:{inode}:{ctime}")`
pub fn fallback_eid(device: u64, inode: u64, ctime: &str) -> Eid {
    let hex = hash_bytes(format!("{device}:{inode}:{ctime}").as_bytes()).to_hex();
    Eid::new(format!(
        "{}-{}-{}-{}-{}",
        &hex[..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    ))
}

/// Resolves paths to stable entity ids
pub struct IdentityResolver<S> {
    store: S,
    ids: Box<dyn IdGenerator>,
}

impl<S: AttributeStore> IdentityResolver<S> {
    pub fn new(store: S) -> Self {
        Self::with_ids(store, RandomIds)
    }

    pub fn with_ids(store: S, ids: impl IdGenerator + 'static) -> Self {
        Self {
            store,
            ids: Box::new(ids),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve the eid for `path`
    ///
    /// Only a failing `stat` is an error; attribute-store failures fall
    /// through to the next strategy.
    pub fn resolve(&mut self, path: &Path) -> Result<Eid> {
        let stat = FileStat::of(path)?;
        Ok(self.resolve_with_stat(path, &stat))
    }

    /// Resolve using stat fields the caller already holds
    pub fn resolve_with_stat(&mut self, path: &Path, stat: &FileStat) -> Eid {
        let ctime = self.ensure_ctime(path, stat);

        // An empty value is treated as unset
        if let Some(existing) = self.store.lookup(path, KEY_UUID).filter(|v| !v.is_empty()) {
            return Eid::new(existing);
        }

        let fresh = self.ids.next_id().hyphenated().to_string();
        if self.store.store(path, KEY_UUID, &fresh) {
            return Eid::new(fresh);
        }

        let eid = fallback_eid(stat.device, stat.inode, &ctime);
        debug!("uuid not storable for {}, using fallback eid {}", path.display(), eid.short());
        eid
    }

    /// Cached `ctime` marker, computing and caching it from mtime when absent
    fn ensure_ctime(&self, path: &Path, stat: &FileStat) -> String {
        if let Some(ctime) = self.store.lookup(path, KEY_CTIME).filter(|v| !v.is_empty()) {
            return ctime;
        }
        let ctime = stat.mtime_marker();
        // Not fatal: the computed marker is still used for this call
        self.store.store(path, KEY_CTIME, &ctime);
        ctime
    }
}
