//! Node records stored in the flat index

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Caller-supplied attributes attached to a node at creation
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Stable entity identifier
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Eid(String);

impl Eid {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, for log lines
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl std::fmt::Display for Eid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Eid {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Eid {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for Eid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Type of filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Directory,
}

impl NodeKind {
    pub fn from_file_type(ft: std::fs::FileType) -> Self {
        if ft.is_dir() {
            Self::Directory
        } else {
            Self::File
        }
    }

    pub fn is_dir(self) -> bool {
        self == Self::Directory
    }

    pub fn is_file(self) -> bool {
        self == Self::File
    }
}

/// One filesystem entry
///
/// `eid`, `path` and `kind` are fixed at creation. The content id is a lazy
/// slot: empty until the engine materializes it, and never set on directories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    eid: Eid,
    path: PathBuf,
    kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cid: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,
}

impl Node {
    pub fn new(eid: Eid, path: impl Into<PathBuf>, kind: NodeKind, metadata: Metadata) -> Self {
        Self {
            eid,
            path: path.into(),
            kind,
            cid: None,
            metadata,
        }
    }

    pub fn eid(&self) -> &Eid {
        &self.eid
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Final path component, lossily decoded
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Content id if it has been materialized
    pub fn cached_cid(&self) -> Option<&str> {
        self.cid.as_deref()
    }

    /// Fill the content id slot. Ignored for directories.
    pub fn set_cid(&mut self, cid: impl Into<String>) {
        if self.kind.is_file() {
            self.cid = Some(cid.into());
        }
    }

    pub fn clear_cid(&mut self) {
        self.cid = None;
    }
}
