//! Predicate and glob queries over the flat index
//!
//! Globs use shell semantics (`*`, `?`, `[...]`, `[!...]`) and are matched
//! against the final path component only, never the full path. A backslash
//! is an ordinary character. Two departures from plain `fnmatch`: `{a,b}`
//! is an alternation, and an unclosed `[` is rejected as an invalid pattern
//! instead of matching literally.

use crate::error::{HyfsError, Result};
use crate::index::FlatIndex;
use crate::node::Node;
use globset::{GlobBuilder, GlobMatcher};
use std::ffi::OsStr;
use std::path::Path;

/// A compiled file-name glob
#[derive(Debug, Clone)]
pub struct Pattern {
    matcher: GlobMatcher,
}

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(false)
            .backslash_escape(false)
            .build()
            .map_err(|source| HyfsError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self {
            matcher: glob.compile_matcher(),
        })
    }

    pub fn as_str(&self) -> &str {
        self.matcher.glob().glob()
    }

    pub fn matches_name(&self, name: &OsStr) -> bool {
        self.matcher.is_match(Path::new(name))
    }

    /// Match the node's final path component
    pub fn matches(&self, node: &Node) -> bool {
        let name = node.path().file_name().unwrap_or_default();
        self.matches_name(name)
    }
}

/// Every node satisfying `pred`, ordered by path
pub fn filter<P>(index: &FlatIndex, mut pred: P) -> Vec<&Node>
where
    P: FnMut(&Node) -> bool,
{
    let mut hits: Vec<&Node> = index.nodes().filter(|n| pred(n)).collect();
    hits.sort_by(|a, b| a.path().cmp(b.path()));
    hits
}

/// Every node whose name matches `pattern`, at any depth
pub fn find<'a>(index: &'a FlatIndex, pattern: &str) -> Result<Vec<&'a Node>> {
    let pattern = Pattern::new(pattern)?;
    Ok(find_pattern(index, &pattern))
}

pub fn find_pattern<'a>(index: &'a FlatIndex, pattern: &Pattern) -> Vec<&'a Node> {
    filter(index, |node| pattern.matches(node))
}
