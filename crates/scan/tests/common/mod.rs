//! Shared helpers for scan integration tests

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Install a test subscriber once; `RUST_LOG` controls verbosity
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Create `files` (relative path, contents) under a fresh `root` directory
pub fn fixture(files: &[(&str, &str)]) -> Result<(TempDir, PathBuf)> {
    init_tracing();
    let temp_dir = tempfile::tempdir()?;
    let root = temp_dir.path().join("root");
    fs::create_dir_all(&root)?;
    for (rel, contents) in files {
        write(&root, rel, contents)?;
    }
    Ok((temp_dir, root))
}

pub fn write(root: &Path, rel: &str, contents: &str) -> Result<()> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

/// Project-like layout: 4 files, 3 directories including the root
pub fn sample_tree() -> Result<(TempDir, PathBuf)> {
    fixture(&[
        ("a.py", "print('a')\n"),
        ("b.txt", "b\n"),
        ("dir/c.py", "print('c')\n"),
        ("dir/nested/d.md", "# d\n"),
    ])
}
