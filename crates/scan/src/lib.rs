//! Filesystem scanning for HyFS
//!
//! Walks a root top-down and feeds every entry to a [`Hyfs`] engine:
//! - the root first, then each directory before its contents
//! - siblings in file-name order
//! - ignore rules prune whole directories

pub mod ignore;

use crate::ignore::{IgnoreConfig, IgnoreRules};
use anyhow::{Context, Result};
use hyfs_core::{AttributeStore, Hyfs, IndexConfig, Metadata, XattrStore};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Scan configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Follow symbolic links while walking (default: false)
    #[serde(default)]
    pub follow_links: bool,

    /// Compute content ids during the scan instead of on first access
    #[serde(default)]
    pub hash_files: bool,

    #[serde(default)]
    pub ignore: IgnoreConfig,

    #[serde(default)]
    pub index: IndexConfig,
}

impl ScanOptions {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let options: Self = toml::from_str(s).context("Failed to parse scan options")?;
        options.index.validate()?;
        Ok(options)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml_str(&raw)
    }
}

/// What a scan did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Entries added to the index
    pub added: usize,
    /// Entries pruned by ignore rules
    pub ignored: usize,
    /// Entries that could not be read or indexed
    pub failed: usize,
    /// Content ids computed eagerly
    pub hashed: usize,
    pub elapsed: Duration,
}

/// Scan `root` into a fresh xattr-backed engine
pub fn scan(root: &Path, options: &ScanOptions) -> Result<Hyfs<XattrStore>> {
    let mut hyfs = Hyfs::from_config(&options.index)?;
    scan_into(&mut hyfs, root, options)?;
    Ok(hyfs)
}

/// Scan `root` into an existing engine
///
/// Entries that vanish or cannot be read mid-scan are logged and counted;
/// only a missing root aborts the scan.
pub fn scan_into<S: AttributeStore>(
    hyfs: &mut Hyfs<S>,
    root: &Path,
    options: &ScanOptions,
) -> Result<ScanReport> {
    let start = Instant::now();
    let meta = std::fs::metadata(root)
        .with_context(|| format!("Scan root not accessible: {}", root.display()))?;
    if !meta.is_dir() {
        anyhow::bail!("Scan root is not a directory: {}", root.display());
    }

    let rules = IgnoreRules::load(root, options.ignore.clone())?;
    let mut report = ScanReport::default();

    let mut ignored = 0;
    let walker = WalkDir::new(root)
        .follow_links(options.follow_links)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let skip = rules.should_ignore(entry.path(), entry.file_type().is_dir());
            if skip {
                // A pruned directory counts once; its contents are never visited
                debug!("Ignoring {}", entry.path().display());
                ignored += 1;
            }
            !skip
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                report.failed += 1;
                continue;
            }
        };

        let eid = match hyfs.add_node(entry.path(), None, Metadata::new()) {
            Ok(eid) => eid,
            Err(e) => {
                warn!("Failed to index {}: {}", entry.path().display(), e);
                report.failed += 1;
                continue;
            }
        };
        report.added += 1;

        if options.hash_files && entry.file_type().is_file() {
            match hyfs.cid(&eid) {
                Ok(Some(_)) => report.hashed += 1,
                Ok(None) => {}
                Err(e) => {
                    warn!("Failed to hash {}: {}", entry.path().display(), e);
                    report.failed += 1;
                }
            }
        }
    }

    report.ignored = ignored;
    report.elapsed = start.elapsed();

    info!(
        "Scanned {}: {} added, {} ignored, {} failed, {} hashed in {:?}",
        root.display(),
        report.added,
        report.ignored,
        report.failed,
        report.hashed,
        report.elapsed
    );

    Ok(report)
}
