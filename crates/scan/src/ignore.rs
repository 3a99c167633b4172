//! Ignore pattern management for scans
//!
//! Supports multiple sources of ignore patterns:
//! 1. .hyfsignore patterns (hyfs-specific, optional)
//! 2. .gitignore patterns (optional, off by default so a scan sees everything)
//! 3. Config-based glob patterns

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Ignore rule manager
///
/// `.hyfsignore` is consulted before `.gitignore`, so a whitelist entry
/// (`!keep.log`) there wins over a matching `.gitignore` line.
pub struct IgnoreRules {
    /// Scan root directory
    root: PathBuf,

    /// Gitignore patterns (optional)
    gitignore: Option<Gitignore>,

    /// HyFS-specific ignore patterns (optional)
    hyfsignore: Option<Gitignore>,

    /// Compiled additional patterns
    additional: GlobSet,

    /// Configuration
    config: IgnoreConfig,
}

impl IgnoreRules {
    /// Load ignore rules for a scan root
    pub fn load(root: &Path, config: IgnoreConfig) -> Result<Self> {
        let mut rules = Self {
            root: root.to_path_buf(),
            gitignore: None,
            hyfsignore: None,
            additional: GlobSet::empty(),
            config,
        };

        rules.reload()?;
        Ok(rules)
    }

    /// Re-read ignore files and recompile config patterns
    pub fn reload(&mut self) -> Result<()> {
        self.gitignore = if self.config.use_gitignore {
            self.build_ignore_file(".gitignore")?
        } else {
            None
        };

        self.hyfsignore = if self.config.use_hyfsignore {
            self.build_ignore_file(".hyfsignore")?
        } else {
            None
        };

        let mut builder = GlobSetBuilder::new();
        for pattern in &self.config.additional_patterns {
            let glob = Glob::new(pattern.trim_end_matches('/'))
                .with_context(|| format!("Invalid ignore pattern: {pattern}"))?;
            builder.add(glob);
        }
        self.additional = builder.build()?;

        Ok(())
    }

    fn build_ignore_file(&self, name: &str) -> Result<Option<Gitignore>> {
        let path = self.root.join(name);
        if !path.exists() {
            return Ok(None);
        }
        let mut builder = GitignoreBuilder::new(&self.root);
        if let Some(err) = builder.add(&path) {
            return Err(err).with_context(|| format!("Failed to parse {}", path.display()));
        }
        Ok(Some(builder.build()?))
    }

    /// Check if a path below the root should be skipped
    pub fn should_ignore(&self, path: &Path, is_dir: bool) -> bool {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        if rel.as_os_str().is_empty() {
            // The root itself is always scanned
            return false;
        }

        if let Some(ref hyfsignore) = self.hyfsignore {
            let matched = hyfsignore.matched(rel, is_dir);
            if matched.is_ignore() {
                return true;
            }
            if matched.is_whitelist() {
                return false;
            }
        }

        if let Some(ref gitignore) = self.gitignore {
            if gitignore.matched(rel, is_dir).is_ignore() {
                return true;
            }
        }

        if !self.additional.is_empty() {
            if self.additional.is_match(rel) {
                return true;
            }
            if let Some(name) = rel.file_name() {
                return self.additional.is_match(Path::new(name));
            }
        }

        false
    }

    /// Get number of active ignore sources
    pub fn active_sources(&self) -> usize {
        let mut count = 0;
        if self.gitignore.is_some() {
            count += 1;
        }
        if self.hyfsignore.is_some() {
            count += 1;
        }
        if !self.config.additional_patterns.is_empty() {
            count += 1;
        }
        count
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Ignore configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreConfig {
    /// Use .gitignore patterns (default: false)
    #[serde(default)]
    pub use_gitignore: bool,

    /// Use .hyfsignore patterns (default: true)
    #[serde(default = "default_true")]
    pub use_hyfsignore: bool,

    /// Additional glob patterns, matched against the relative path and the file name
    #[serde(default)]
    pub additional_patterns: Vec<String>,
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            use_gitignore: false,
            use_hyfsignore: true,
            additional_patterns: vec![],
        }
    }
}

fn default_true() -> bool {
    true
}
