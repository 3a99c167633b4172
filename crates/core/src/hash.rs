//! SHA-256 hashing primitives for content ids

use crate::config::DEFAULT_HASH_CHUNK_SIZE;
use crate::error::{HyfsError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// A SHA-256 digest (32 bytes)
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Sha256Hash([u8; 32]);

impl Sha256Hash {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex, 64 characters
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 64-character hex string
    pub fn from_hex(s: &str) -> std::result::Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl std::fmt::Debug for Sha256Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sha256Hash({})", self.to_hex())
    }
}

impl std::fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Hash bytes using SHA-256
pub fn hash_bytes(data: &[u8]) -> Sha256Hash {
    finish(Sha256::new_with_prefix(data))
}

fn finish(hasher: Sha256) -> Sha256Hash {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hasher.finalize());
    Sha256Hash::from_bytes(bytes)
}

/// Hash a file, streaming it in `chunk_size` reads
pub fn hash_file_chunked(path: &Path, chunk_size: usize) -> Result<Sha256Hash> {
    let mut file = File::open(path).map_err(|e| HyfsError::io(path, e))?;
    let mut hasher = Sha256::new();

    let mut buffer = vec![0u8; chunk_size.max(1)];
    loop {
        let bytes_read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(HyfsError::io(path, e)),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(finish(hasher))
}

/// Hash a file with the default 64 KiB chunk size
pub fn hash_file(path: &Path) -> Result<Sha256Hash> {
    hash_file_chunked(path, DEFAULT_HASH_CHUNK_SIZE)
}
