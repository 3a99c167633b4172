//! Content ids for file nodes, cached in the attribute store

use crate::attrs::{AttributeStore, KEY_CID};
use crate::config::DEFAULT_HASH_CHUNK_SIZE;
use crate::error::Result;
use crate::hash::hash_file_chunked;
use crate::node::NodeKind;
use std::path::Path;
use tracing::debug;

/// Computes SHA-256 content ids and caches them per path
///
/// A cached `cid` is trusted as-is; nothing checks it against the current
/// size or mtime. Call [`ContentHasher::invalidate`] after content changes.
pub struct ContentHasher<S> {
    store: S,
    chunk_size: usize,
}

impl<S: AttributeStore> ContentHasher<S> {
    pub fn new(store: S) -> Self {
        Self::with_chunk_size(store, DEFAULT_HASH_CHUNK_SIZE)
    }

    pub fn with_chunk_size(store: S, chunk_size: usize) -> Self {
        Self {
            store,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Content id for `path`, or `None` for directories
    pub fn content_id(&self, path: &Path, kind: NodeKind) -> Result<Option<String>> {
        if !kind.is_file() {
            return Ok(None);
        }

        if let Some(cached) = self.store.lookup(path, KEY_CID).filter(|v| !v.is_empty()) {
            return Ok(Some(cached));
        }

        let cid = hash_file_chunked(path, self.chunk_size)?.to_hex();
        let cached = self.store.store(path, KEY_CID, &cid);
        debug!("computed cid for {} (cached: {})", path.display(), cached);
        Ok(Some(cid))
    }

    /// Drop the cached cid so the next access recomputes it
    pub fn invalidate(&self, path: &Path) {
        self.store.discard(path, KEY_CID);
    }
}
