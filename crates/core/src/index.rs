//! Flat node storage keyed by eid
//!
//! Besides the eid → node map the index keeps two derived lookups:
//! - path → eid
//! - parent eid → child eids, derived purely from path hierarchy
//!
//! Nodes whose parent directory has not been indexed yet are parked under
//! the missing parent path and adopted as soon as that directory is added,
//! so insertion order does not change the resulting hierarchy.

use crate::error::{HyfsError, Result};
use crate::node::{Eid, Metadata, Node, NodeKind};
use ahash::{AHashMap, AHashSet};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

#[derive(Debug, Default, Clone)]
pub struct FlatIndex {
    nodes: AHashMap<Eid, Node>,
    paths: AHashMap<PathBuf, Eid>,
    children: AHashMap<Eid, AHashSet<Eid>>,
    /// Missing parent path -> nodes waiting for it
    orphans: AHashMap<PathBuf, AHashSet<Eid>>,
}

impl FlatIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node and link it into the hierarchy
    ///
    /// An existing node with the same eid or the same path is replaced.
    pub fn add(
        &mut self,
        path: impl Into<PathBuf>,
        eid: Eid,
        kind: NodeKind,
        metadata: Metadata,
    ) -> Eid {
        self.insert(Node::new(eid, path, kind, metadata))
    }

    /// Register a prebuilt node
    pub fn insert(&mut self, node: Node) -> Eid {
        let eid = node.eid().clone();
        let path = node.path().to_path_buf();
        let kind = node.kind();

        if self.detach(&eid).is_some() {
            trace!("replacing node {}", eid.short());
        }
        if let Some(stale) = self.paths.get(&path).cloned() {
            debug!("path {} re-registered, dropping eid {}", path.display(), stale.short());
            self.detach(&stale);
        }

        self.nodes.insert(eid.clone(), node);
        self.paths.insert(path.clone(), eid.clone());
        self.link_to_parent(&path, &eid);

        if kind.is_dir() {
            if let Some(waiting) = self.orphans.remove(&path) {
                debug!("adopting {} children under {}", waiting.len(), path.display());
                self.children.entry(eid.clone()).or_default().extend(waiting);
            }
        }

        eid
    }

    /// Lookup by eid
    pub fn get(&self, eid: &Eid) -> Result<&Node> {
        self.nodes
            .get(eid)
            .ok_or_else(|| HyfsError::NotFound(format!("eid {eid}")))
    }

    pub fn get_mut(&mut self, eid: &Eid) -> Result<&mut Node> {
        self.nodes
            .get_mut(eid)
            .ok_or_else(|| HyfsError::NotFound(format!("eid {eid}")))
    }

    pub fn contains(&self, eid: &Eid) -> bool {
        self.nodes.contains_key(eid)
    }

    /// Lookup by path; absence is not an error
    pub fn find_by_path(&self, path: impl AsRef<Path>) -> Option<&Node> {
        self.paths
            .get(path.as_ref())
            .and_then(|eid| self.nodes.get(eid))
    }

    /// Direct children of a directory. Empty for files and unknown eids.
    pub fn children_of(&self, eid: &Eid) -> BTreeSet<&Eid> {
        self.children
            .get(eid)
            .map(|kids| kids.iter().collect())
            .unwrap_or_default()
    }

    /// All nodes, in no particular order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes with no proper ancestor among the indexed paths
    ///
    /// Any indexed ancestor counts, including a file. A node under a file path
    /// is therefore neither a root nor anyone's child, and trees built from
    /// this index leave it out.
    pub fn roots(&self) -> Vec<&Node> {
        self.nodes
            .values()
            .filter(|node| {
                !node
                    .path()
                    .ancestors()
                    .skip(1)
                    .any(|ancestor| self.paths.contains_key(ancestor))
            })
            .collect()
    }

    fn link_to_parent(&mut self, path: &Path, eid: &Eid) {
        let Some(parent_path) = path.parent() else {
            return;
        };

        let parent_dir = self
            .paths
            .get(parent_path)
            .filter(|pe| self.nodes.get(*pe).is_some_and(Node::is_dir))
            .cloned();

        match parent_dir {
            Some(parent_eid) => {
                self.children.entry(parent_eid).or_default().insert(eid.clone());
            }
            None => {
                self.orphans
                    .entry(parent_path.to_path_buf())
                    .or_default()
                    .insert(eid.clone());
            }
        }
    }

    /// Remove a node and every derived entry that mentions it
    ///
    /// Its children go back to waiting on its path.
    fn detach(&mut self, eid: &Eid) -> Option<Node> {
        let node = self.nodes.remove(eid)?;
        let path = node.path();

        if self.paths.get(path) == Some(eid) {
            self.paths.remove(path);
        }

        if let Some(parent_path) = path.parent() {
            if let Some(parent_eid) = self.paths.get(parent_path) {
                remove_from(&mut self.children, parent_eid, eid);
            }
            remove_from(&mut self.orphans, parent_path, eid);
        }

        if let Some(kids) = self.children.remove(eid) {
            self.orphans.entry(path.to_path_buf()).or_default().extend(kids);
        }

        Some(node)
    }
}

/// Remove `member` from the set at `key`, dropping the set once empty
fn remove_from<K, Q>(map: &mut AHashMap<K, AHashSet<Eid>>, key: &Q, member: &Eid)
where
    K: std::borrow::Borrow<Q> + std::hash::Hash + Eq,
    Q: std::hash::Hash + Eq + ?Sized,
{
    if let Some(set) = map.get_mut(key) {
        set.remove(member);
        if set.is_empty() {
            map.remove(key);
        }
    }
}
