//! The `Hyfs` engine: one index, one tag facet, one attribute store

use crate::attrs::{AttributeStore, XattrStore};
use crate::config::IndexConfig;
use crate::error::{HyfsError, Result};
use crate::hasher::ContentHasher;
use crate::identity::{FileStat, IdGenerator, IdentityResolver, RandomIds};
use crate::index::FlatIndex;
use crate::node::{Eid, Metadata, Node, NodeKind};
use crate::query;
use crate::tags::TagIndex;
use crate::tree::{self, TreeNode};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Summary counts for an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct IndexStats {
    pub files: usize,
    pub directories: usize,
    pub tags: usize,
}

/// In-memory filesystem index with stable identities
///
/// Single-writer: callers that share an engine across threads must
/// serialize access themselves.
pub struct Hyfs<S = XattrStore> {
    store: Arc<S>,
    resolver: IdentityResolver<Arc<S>>,
    hasher: ContentHasher<Arc<S>>,
    index: FlatIndex,
    tags: TagIndex,
}

impl Hyfs<XattrStore> {
    /// Engine backed by extended attributes in the default namespace
    pub fn new() -> Self {
        Self::with_store(XattrStore::default())
    }

    pub fn from_config(config: &IndexConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_parts(
            XattrStore::new(config.attr_namespace.clone()),
            RandomIds,
            config,
        ))
    }
}

impl Default for Hyfs<XattrStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: AttributeStore> Hyfs<S> {
    pub fn with_store(store: S) -> Self {
        Self::with_parts(store, RandomIds, &IndexConfig::default())
    }

    /// Full control over store, id source and hashing parameters
    pub fn with_parts(store: S, ids: impl IdGenerator + 'static, config: &IndexConfig) -> Self {
        let store = Arc::new(store);
        Self {
            resolver: IdentityResolver::with_ids(Arc::clone(&store), ids),
            hasher: ContentHasher::with_chunk_size(Arc::clone(&store), config.hash_chunk_size),
            store,
            index: FlatIndex::new(),
            tags: TagIndex::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn tag_index(&self) -> &TagIndex {
        &self.tags
    }

    /// Stable eid for a path without indexing it
    pub fn resolve(&mut self, path: &Path) -> Result<Eid> {
        self.resolver.resolve(path)
    }

    /// Index `path`, resolving its eid unless one is supplied
    pub fn add_node(&mut self, path: &Path, eid: Option<Eid>, metadata: Metadata) -> Result<Eid> {
        let meta = std::fs::metadata(path).map_err(|e| HyfsError::io(path, e))?;
        let kind = NodeKind::from_file_type(meta.file_type());

        let eid = match eid {
            Some(eid) => eid,
            None => {
                let stat = FileStat::from_metadata(&meta).map_err(|e| HyfsError::io(path, e))?;
                self.resolver.resolve_with_stat(path, &stat)
            }
        };

        Ok(self.index.add(path, eid, kind, metadata))
    }

    pub fn get(&self, eid: &Eid) -> Result<&Node> {
        self.index.get(eid)
    }

    pub fn find_by_path(&self, path: impl AsRef<Path>) -> Option<&Node> {
        self.index.find_by_path(path)
    }

    pub fn children_of(&self, eid: &Eid) -> BTreeSet<&Eid> {
        self.index.children_of(eid)
    }

    /// Content id of a node, materializing it on first access
    pub fn cid(&mut self, eid: &Eid) -> Result<Option<String>> {
        let node = self.index.get(eid)?;
        if let Some(cid) = node.cached_cid() {
            return Ok(Some(cid.to_string()));
        }

        let cid = self.hasher.content_id(node.path(), node.kind())?;
        if let Some(cid) = &cid {
            self.index.get_mut(eid)?.set_cid(cid.clone());
        }
        Ok(cid)
    }

    /// Forget a node's content id, in memory and in the store
    ///
    /// Nothing is recomputed until the next [`Hyfs::cid`] call.
    pub fn invalidate_cid(&mut self, eid: &Eid) -> Result<()> {
        let node = self.index.get_mut(eid)?;
        node.clear_cid();
        if node.is_file() {
            self.hasher.invalidate(node.path());
            debug!("invalidated cid for {}", node.path().display());
        }
        Ok(())
    }

    /// Invalidate and immediately recompute cids for the given nodes
    ///
    /// Directories are skipped. Returns the fresh `(eid, cid)` pairs.
    pub fn refresh_cids<'a, I>(&mut self, eids: I) -> Result<Vec<(Eid, String)>>
    where
        I: IntoIterator<Item = &'a Eid>,
    {
        let mut refreshed = Vec::new();
        for eid in eids {
            if !self.index.get(eid)?.is_file() {
                continue;
            }
            self.invalidate_cid(eid)?;
            if let Some(cid) = self.cid(eid)? {
                refreshed.push((eid.clone(), cid));
            }
        }
        Ok(refreshed)
    }

    pub fn tag(&mut self, eid: &Eid, tag: &str) {
        self.tags.tag(eid, tag);
    }

    pub fn untag(&mut self, eid: &Eid, tag: &str) {
        self.tags.untag(eid, tag);
    }

    pub fn tagged(&self, tag: &str) -> BTreeSet<&Eid> {
        self.tags.tagged(tag)
    }

    pub fn tags_of(&self, eid: &Eid) -> BTreeSet<&str> {
        self.tags.tags_of(eid)
    }

    /// All live tags
    pub fn tags(&self) -> BTreeSet<&str> {
        self.tags.tags()
    }

    /// Snapshot tree rooted at `root` or at the single ancestor-free node
    pub fn tree(&self, root: Option<&Path>) -> Result<TreeNode> {
        tree::build(&self.index, root)
    }

    pub fn filter<P>(&self, pred: P) -> Vec<&Node>
    where
        P: FnMut(&Node) -> bool,
    {
        query::filter(&self.index, pred)
    }

    pub fn find(&self, pattern: &str) -> Result<Vec<&Node>> {
        query::find(&self.index, pattern)
    }

    pub fn stats(&self) -> IndexStats {
        let (mut files, mut directories) = (0, 0);
        for node in self.index.nodes() {
            match node.kind() {
                NodeKind::File => files += 1,
                NodeKind::Directory => directories += 1,
            }
        }
        IndexStats {
            files,
            directories,
            tags: self.tags.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::{MemoryStore, UnsupportedStore, KEY_CID, KEY_UUID};
    use crate::hash::hash_bytes;
    use crate::identity::SequentialIds;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// root/{a.py, b.txt, dir/c.py}
    fn fixture() -> anyhow::Result<(TempDir, PathBuf)> {
        let temp_dir = tempfile::tempdir()?;
        let root = temp_dir.path().join("root");
        fs::create_dir_all(root.join("dir"))?;
        fs::write(root.join("a.py"), b"print('a')\n")?;
        fs::write(root.join("b.txt"), b"b\n")?;
        fs::write(root.join("dir/c.py"), b"print('c')\n")?;
        Ok((temp_dir, root))
    }

    fn index_all<S: AttributeStore>(hyfs: &mut Hyfs<S>, root: &Path) -> anyhow::Result<()> {
        for rel in ["", "a.py", "b.txt", "dir", "dir/c.py"] {
            let path = if rel.is_empty() { root.to_path_buf() } else { root.join(rel) };
            hyfs.add_node(&path, None, Metadata::new())?;
        }
        Ok(())
    }

    #[test]
    fn test_add_node_derives_kind_and_hierarchy() -> anyhow::Result<()> {
        let (_guard, root) = fixture()?;
        let mut hyfs = Hyfs::with_store(MemoryStore::new());
        index_all(&mut hyfs, &root)?;

        let root_node = hyfs.find_by_path(&root).unwrap();
        assert!(root_node.is_dir());
        let root_eid = root_node.eid().clone();
        assert_eq!(hyfs.children_of(&root_eid).len(), 3);

        let c = hyfs.find_by_path(root.join("dir/c.py")).unwrap();
        assert!(c.is_file());

        assert_eq!(
            hyfs.stats(),
            IndexStats {
                files: 3,
                directories: 2,
                tags: 0
            }
        );
        Ok(())
    }

    #[test]
    fn test_add_node_with_explicit_eid_and_metadata() -> anyhow::Result<()> {
        let (_guard, root) = fixture()?;
        let mut hyfs = Hyfs::with_store(UnsupportedStore);

        let mut metadata = Metadata::new();
        metadata.insert("source".into(), serde_json::json!("manual"));
        let eid = hyfs.add_node(&root.join("b.txt"), Some("custom".into()), metadata)?;

        assert_eq!(eid.as_str(), "custom");
        assert_eq!(hyfs.get(&eid)?.metadata["source"], "manual");
        Ok(())
    }

    #[test]
    fn test_add_missing_path_fails() {
        let mut hyfs = Hyfs::with_store(MemoryStore::new());
        let err = hyfs
            .add_node(Path::new("/nonexistent/hyfs"), None, Metadata::new())
            .unwrap_err();
        assert!(matches!(err, HyfsError::Io { .. }));
    }

    #[test]
    fn test_rescan_keeps_eids() -> anyhow::Result<()> {
        let (_guard, root) = fixture()?;
        let store = Arc::new(MemoryStore::new());

        let mut first = Hyfs::with_store(Arc::clone(&store));
        index_all(&mut first, &root)?;
        let mut second = Hyfs::with_store(Arc::clone(&store));
        index_all(&mut second, &root)?;

        for node in first.index().nodes() {
            assert_eq!(second.find_by_path(node.path()).unwrap().eid(), node.eid());
        }
        Ok(())
    }

    #[test]
    fn test_empty_stored_uuids_keep_files_distinct() -> anyhow::Result<()> {
        let (_guard, root) = fixture()?;
        let (a, b) = (root.join("a.py"), root.join("b.txt"));
        let store = MemoryStore::new();
        store.set(&a, KEY_UUID, "")?;
        store.set(&b, KEY_UUID, "")?;

        let mut hyfs = Hyfs::with_store(store);
        let ea = hyfs.add_node(&a, None, Metadata::new())?;
        let eb = hyfs.add_node(&b, None, Metadata::new())?;

        assert_ne!(ea, eb);
        assert_eq!(hyfs.index().len(), 2);
        assert_eq!(hyfs.get(&ea)?.path(), a.as_path());
        Ok(())
    }

    #[test]
    fn test_fallback_rescan_keeps_eids() -> anyhow::Result<()> {
        let (_guard, root) = fixture()?;
        let mut first = Hyfs::with_store(UnsupportedStore);
        index_all(&mut first, &root)?;
        let mut second = Hyfs::with_store(UnsupportedStore);
        index_all(&mut second, &root)?;

        for node in first.index().nodes() {
            assert_eq!(second.find_by_path(node.path()).unwrap().eid(), node.eid());
        }
        Ok(())
    }

    #[test]
    fn test_cid_lazy_invalidate_and_refresh() -> anyhow::Result<()> {
        let (_guard, root) = fixture()?;
        let mut hyfs =
            Hyfs::with_parts(MemoryStore::new(), SequentialIds::default(), &IndexConfig::default());
        index_all(&mut hyfs, &root)?;

        let b_path = root.join("b.txt");
        let b = hyfs.find_by_path(&b_path).unwrap().eid().clone();
        assert_eq!(hyfs.get(&b)?.cached_cid(), None);

        let cid = hyfs.cid(&b)?.unwrap();
        assert_eq!(cid, hash_bytes(b"b\n").to_hex());
        assert_eq!(hyfs.get(&b)?.cached_cid(), Some(cid.as_str()));
        assert_eq!(hyfs.store().lookup(&b_path, KEY_CID), Some(cid.clone()));

        fs::write(&b_path, b"changed\n")?;
        // Cached value is trusted until invalidated
        assert_eq!(hyfs.cid(&b)?.unwrap(), cid);

        hyfs.invalidate_cid(&b)?;
        assert_eq!(hyfs.get(&b)?.cached_cid(), None);
        assert_eq!(hyfs.store().lookup(&b_path, KEY_CID), None);
        assert_eq!(hyfs.cid(&b)?.unwrap(), hash_bytes(b"changed\n").to_hex());

        fs::write(&b_path, b"again\n")?;
        let dir = hyfs.find_by_path(root.join("dir")).unwrap().eid().clone();
        let refreshed = hyfs.refresh_cids([&b, &dir])?;
        assert_eq!(refreshed, vec![(b.clone(), hash_bytes(b"again\n").to_hex())]);
        Ok(())
    }

    #[test]
    fn test_directory_cid_is_none() -> anyhow::Result<()> {
        let (_guard, root) = fixture()?;
        let mut hyfs = Hyfs::with_store(MemoryStore::new());
        let eid = hyfs.add_node(&root, None, Metadata::new())?;
        assert_eq!(hyfs.cid(&eid)?, None);
        hyfs.invalidate_cid(&eid)?;
        assert!(matches!(hyfs.cid(&"missing".into()), Err(HyfsError::NotFound(_))));
        Ok(())
    }

    #[test]
    fn test_tags_tree_and_find() -> anyhow::Result<()> {
        let (_guard, root) = fixture()?;
        let mut hyfs = Hyfs::with_store(MemoryStore::new());
        index_all(&mut hyfs, &root)?;

        let py: Vec<Eid> = hyfs.find("*.py")?.iter().map(|n| n.eid().clone()).collect();
        assert_eq!(py.len(), 2);
        for eid in &py {
            hyfs.tag(eid, "code");
        }
        hyfs.tag(&py[0], "important");
        assert_eq!(hyfs.tagged("code").len(), 2);
        assert_eq!(hyfs.tags(), BTreeSet::from(["code", "important"]));

        hyfs.untag(&py[0], "important");
        assert!(hyfs.tagged("important").is_empty());
        assert_eq!(hyfs.tags_of(&py[0]), BTreeSet::from(["code"]));
        assert_eq!(hyfs.stats().tags, 1);

        let tree = hyfs.tree(None)?;
        assert_eq!(tree.path(), root.as_path());
        assert_eq!(tree.len(), 5);

        let code = hyfs.filter(|n| hyfs.tag_index().has_tag(n.eid(), "code"));
        assert_eq!(code.len(), 2);
        Ok(())
    }
}
