//! HyFS Core - stable identities and a queryable in-memory index for a filesystem subtree
//!
//! This crate provides:
//! - Attribute stores (extended attributes, in-memory, unsupported)
//! - Entity id resolution with deterministic fallback
//! - SHA-256 content ids cached per path
//! - Flat node index with derived parent/child links
//! - Bidirectional tag index
//! - Tree snapshots and glob/predicate queries

pub mod attrs;
pub mod config;
pub mod engine;
pub mod error;
pub mod hash;
pub mod hasher;
pub mod identity;
pub mod index;
pub mod node;
pub mod query;
pub mod tags;
pub mod tree;

// Re-export main types for convenience
pub use attrs::{AttrError, AttributeStore, MemoryStore, UnsupportedStore, XattrStore};
pub use config::IndexConfig;
pub use engine::{Hyfs, IndexStats};
pub use error::{HyfsError, Result};
pub use hash::{hash_bytes, hash_file, Sha256Hash};
pub use hasher::ContentHasher;
pub use identity::{fallback_eid, IdGenerator, IdentityResolver, RandomIds, SequentialIds};
pub use index::FlatIndex;
pub use node::{Eid, Metadata, Node, NodeKind};
pub use query::Pattern;
pub use tags::TagIndex;
pub use tree::TreeNode;
