//! Engine configuration

use crate::error::{HyfsError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default extended-attribute namespace (`user.hyfs.uuid`, `user.hyfs.cid`, ...)
pub const DEFAULT_ATTR_NAMESPACE: &str = "user.hyfs";

/// Default read size for content hashing (64 KiB)
pub const DEFAULT_HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Index configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Namespace prefixed to every attribute key
    #[serde(default = "default_attr_namespace")]
    pub attr_namespace: String,

    /// Chunk size used when streaming files through the hasher
    #[serde(default = "default_hash_chunk_size")]
    pub hash_chunk_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            attr_namespace: default_attr_namespace(),
            hash_chunk_size: default_hash_chunk_size(),
        }
    }
}

impl IndexConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| HyfsError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| HyfsError::io(path, e))?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.hash_chunk_size == 0 {
            return Err(HyfsError::Config("hash_chunk_size must be greater than 0".into()));
        }
        if self.attr_namespace.is_empty() {
            return Err(HyfsError::Config("attr_namespace must not be empty".into()));
        }
        Ok(())
    }
}

fn default_attr_namespace() -> String {
    DEFAULT_ATTR_NAMESPACE.to_string()
}

fn default_hash_chunk_size() -> usize {
    DEFAULT_HASH_CHUNK_SIZE
}
