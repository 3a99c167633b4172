//! Error types for the HyFS engine

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HyfsError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Multiple roots found ({}), specify a root path", format_paths(.0))]
    AmbiguousRoot(Vec<PathBuf>),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid glob pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Config error: {0}")]
    Config(String),
}

impl HyfsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, HyfsError>;
