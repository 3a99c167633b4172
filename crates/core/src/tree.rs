//! Hierarchical snapshots rebuilt from the flat index

use crate::error::{HyfsError, Result};
use crate::index::FlatIndex;
use crate::node::{Eid, Node, NodeKind};
use crate::query::Pattern;
use std::path::{Path, PathBuf};

/// One node of a materialized tree
///
/// Carries a copy of the flat node. Directories own their children;
/// files have none. Siblings are ordered by path.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    node: Node,
    children: Option<Vec<TreeNode>>,
}

impl TreeNode {
    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn eid(&self) -> &Eid {
        self.node.eid()
    }

    pub fn path(&self) -> &Path {
        self.node.path()
    }

    pub fn kind(&self) -> NodeKind {
        self.node.kind()
    }

    /// Direct children (always empty for files)
    pub fn children(&self) -> &[TreeNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Total number of nodes in this subtree, including itself
    pub fn len(&self) -> usize {
        self.walk().count()
    }

    /// Never true; a tree always holds its root
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Pre-order traversal of this subtree
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    /// Subtree nodes matching `pred`, in pre-order
    pub fn filter<P>(&self, mut pred: P) -> Vec<&TreeNode>
    where
        P: FnMut(&Node) -> bool,
    {
        self.walk().filter(|t| pred(&t.node)).collect()
    }

    /// Subtree nodes whose final path component matches a glob
    pub fn find(&self, pattern: &str) -> Result<Vec<&TreeNode>> {
        let pattern = Pattern::new(pattern)?;
        Ok(self.find_pattern(&pattern))
    }

    pub fn find_pattern(&self, pattern: &Pattern) -> Vec<&TreeNode> {
        self.filter(|node| pattern.matches(node))
    }
}

/// Pre-order iterator over a [`TreeNode`]
pub struct Walk<'a> {
    stack: Vec<&'a TreeNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a TreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        // Reversed so the first child is visited first
        self.stack.extend(next.children().iter().rev());
        Some(next)
    }
}

/// Build a tree rooted at `root`, or at the single ancestor-free node
pub fn build(index: &FlatIndex, root: Option<&Path>) -> Result<TreeNode> {
    let root_node = match root {
        Some(path) => index
            .find_by_path(path)
            .ok_or_else(|| HyfsError::NotFound(format!("root path {}", path.display())))?,
        None => find_root(index)?,
    };
    Ok(materialize(index, root_node))
}

fn find_root(index: &FlatIndex) -> Result<&Node> {
    let mut roots = index.roots();
    match roots.len() {
        0 => Err(HyfsError::NotFound("root of empty index".into())),
        1 => Ok(roots.remove(0)),
        _ => {
            let mut candidates: Vec<PathBuf> =
                roots.iter().map(|n| n.path().to_path_buf()).collect();
            candidates.sort();
            Err(HyfsError::AmbiguousRoot(candidates))
        }
    }
}

fn materialize(index: &FlatIndex, node: &Node) -> TreeNode {
    let children = node.is_dir().then(|| {
        let mut kids: Vec<&Node> = index
            .children_of(node.eid())
            .into_iter()
            .filter_map(|eid| index.get(eid).ok())
            .collect();
        kids.sort_by(|a, b| a.path().cmp(b.path()));
        kids.into_iter().map(|kid| materialize(index, kid)).collect()
    });

    TreeNode {
        node: node.clone(),
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Metadata;
    use std::collections::BTreeSet;

    /// `dirs` directories each holding `files` files, under one root
    fn synthetic(dirs: usize, files: usize) -> FlatIndex {
        let mut index = FlatIndex::new();
        index.add("/root", "root".into(), NodeKind::Directory, Metadata::new());
        for d in 0..dirs {
            let dir = format!("/root/d{d}");
            index.add(&dir, format!("d{d}").into(), NodeKind::Directory, Metadata::new());
            for f in 0..files {
                index.add(
                    format!("{dir}/f{f}.txt"),
                    format!("d{d}f{f}").into(),
                    NodeKind::File,
                    Metadata::new(),
                );
            }
        }
        index
    }

    #[test]
    fn test_tree_counts_and_children_match_index() {
        let index = synthetic(4, 5);
        let tree = build(&index, None).unwrap();

        // 1 root + 4 dirs directories, 20 files
        assert_eq!(tree.len(), 1 + 4 + 20);
        assert_eq!(tree.len(), index.len());

        for t in tree.walk() {
            let from_tree: BTreeSet<&Eid> = t.children().iter().map(TreeNode::eid).collect();
            assert_eq!(from_tree, index.children_of(t.eid()));
            if t.kind().is_file() {
                assert!(t.children().is_empty());
            }
        }
    }

    #[test]
    fn test_siblings_sorted_by_path() {
        let index = synthetic(3, 2);
        let tree = build(&index, None).unwrap();
        let names: Vec<String> = tree.children().iter().map(|c| c.node().name()).collect();
        assert_eq!(names, vec!["d0", "d1", "d2"]);
    }

    #[test]
    fn test_ambiguous_root() {
        let mut index = FlatIndex::new();
        index.add("/a", "a".into(), NodeKind::Directory, Metadata::new());
        index.add("/a/x", "ax".into(), NodeKind::File, Metadata::new());
        index.add("/b", "b".into(), NodeKind::Directory, Metadata::new());
        index.add("/b/y", "by".into(), NodeKind::File, Metadata::new());

        match build(&index, None) {
            Err(HyfsError::AmbiguousRoot(paths)) => {
                assert_eq!(paths, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
            }
            other => panic!("expected AmbiguousRoot, got {other:?}"),
        }

        let a = build(&index, Some(Path::new("/a"))).unwrap();
        assert_eq!(a.len(), 2);
        let b = build(&index, Some(Path::new("/b"))).unwrap();
        assert_eq!(b.children()[0].eid().as_str(), "by");
    }

    #[test]
    fn test_unknown_root_and_empty_index() {
        let index = synthetic(1, 1);
        let err = build(&index, Some(Path::new("/elsewhere"))).unwrap_err();
        assert!(matches!(err, HyfsError::NotFound(_)));
        assert!(err.to_string().contains("/elsewhere"));

        assert!(matches!(
            build(&FlatIndex::new(), None),
            Err(HyfsError::NotFound(_))
        ));
    }

    #[test]
    fn test_node_under_file_is_left_out() {
        let mut index = synthetic(1, 1);
        index.add("/root/d0/f0.txt/stray", "stray".into(), NodeKind::File, Metadata::new());

        let tree = build(&index, None).unwrap();
        assert_eq!(tree.len(), index.len() - 1);
        assert!(tree.walk().all(|t| t.eid().as_str() != "stray"));
    }

    #[test]
    fn test_subtree_and_independent_snapshots() {
        let index = synthetic(2, 3);
        let sub = build(&index, Some(Path::new("/root/d1"))).unwrap();
        assert_eq!(sub.len(), 4);

        let first = build(&index, None).unwrap();
        let second = build(&index, None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_tree_filter_and_find() {
        let mut index = synthetic(2, 2);
        index.add("/root/d0/notes.md", "notes".into(), NodeKind::File, Metadata::new());
        let tree = build(&index, None).unwrap();

        let txt = tree.find("*.txt").unwrap();
        assert_eq!(txt.len(), 4);

        let dirs = tree.filter(|n| n.is_dir());
        assert_eq!(dirs.len(), 3);

        let sub = build(&index, Some(Path::new("/root/d0"))).unwrap();
        let md: Vec<&str> = sub.find("*.md").unwrap().iter().map(|t| t.eid().as_str()).collect();
        assert_eq!(md, vec!["notes"]);
        assert!(build(&index, Some(Path::new("/root/d1")))
            .unwrap()
            .find("*.md")
            .unwrap()
            .is_empty());
    }
}
