//! Bidirectional tag index
//!
//! `tag -> eids` and `eid -> tags` are kept as exact inverses. Neither map
//! ever holds an empty set: removing the last member removes the entry.
//! Tags are not checked against the flat index.

use crate::node::Eid;
use ahash::{AHashMap, AHashSet};
use std::collections::BTreeSet;

#[derive(Debug, Default, Clone)]
pub struct TagIndex {
    by_tag: AHashMap<String, AHashSet<Eid>>,
    by_eid: AHashMap<Eid, AHashSet<String>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `tag` to `eid` (idempotent)
    pub fn tag(&mut self, eid: &Eid, tag: &str) {
        self.by_tag
            .entry(tag.to_string())
            .or_default()
            .insert(eid.clone());
        self.by_eid
            .entry(eid.clone())
            .or_default()
            .insert(tag.to_string());
    }

    /// Remove `tag` from `eid` (idempotent)
    pub fn untag(&mut self, eid: &Eid, tag: &str) {
        if let Some(eids) = self.by_tag.get_mut(tag) {
            eids.remove(eid);
            if eids.is_empty() {
                self.by_tag.remove(tag);
            }
        }
        if let Some(tags) = self.by_eid.get_mut(eid) {
            tags.remove(tag);
            if tags.is_empty() {
                self.by_eid.remove(eid);
            }
        }
    }

    /// Eids carrying `tag`
    pub fn tagged(&self, tag: &str) -> BTreeSet<&Eid> {
        self.by_tag
            .get(tag)
            .map(|eids| eids.iter().collect())
            .unwrap_or_default()
    }

    /// Tags on `eid`
    pub fn tags_of(&self, eid: &Eid) -> BTreeSet<&str> {
        self.by_eid
            .get(eid)
            .map(|tags| tags.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn has_tag(&self, eid: &Eid, tag: &str) -> bool {
        self.by_tag.get(tag).is_some_and(|eids| eids.contains(eid))
    }

    /// Every tag with at least one eid
    pub fn tags(&self) -> BTreeSet<&str> {
        self.by_tag.keys().map(String::as_str).collect()
    }

    /// Number of live tags
    pub fn len(&self) -> usize {
        self.by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }

    /// Number of eids carrying at least one tag
    pub fn tagged_eid_count(&self) -> usize {
        self.by_eid.len()
    }
}
