//! Cleaner stage - removes build byproducts from the work dir.
//!
//! Missing paths are skipped, so running it repeatedly is harmless.

use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;

use crate::config::CleanupConfig;
use crate::error::{InstallError, Result};

/// Paths actually removed by a cleanup run
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanReport {
    pub removed: Vec<PathBuf>,
}

/// Deletes build directories and descriptor files inside a work dir
#[derive(Debug, Clone)]
pub struct Cleaner {
    work_dir: PathBuf,
    dirs: Vec<String>,
    patterns: Vec<String>,
}

impl Cleaner {
    pub fn new(work_dir: impl Into<PathBuf>, cleanup: &CleanupConfig) -> Self {
        Self {
            work_dir: work_dir.into(),
            dirs: cleanup.dirs.clone(),
            patterns: cleanup.patterns.clone(),
        }
    }

    /// Remove the configured directories and pattern matches
    pub fn clean(&self) -> Result<CleanReport> {
        let mut report = CleanReport::default();

        for dir in &self.dirs {
            let path = self.work_dir.join(dir);
            if remove_path(&path)? {
                report.removed.push(path);
            }
        }

        for pattern in &self.patterns {
            for path in self.matches(pattern)? {
                if remove_path(&path)? {
                    report.removed.push(path);
                }
            }
        }

        info!("Cleaned {} path(s) in {}", report.removed.len(), self.work_dir.display());
        Ok(report)
    }

    /// Remove the whole work dir
    pub fn purge(&self) -> Result<CleanReport> {
        let mut report = CleanReport::default();
        if remove_path(&self.work_dir)? {
            report.removed.push(self.work_dir.clone());
        }
        Ok(report)
    }

    fn matches(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let escaped = glob::Pattern::escape(&self.work_dir.to_string_lossy());
        let full = format!("{}/{}", escaped, pattern);
        let paths = glob::glob(&full).map_err(|e| InstallError::Clean(format!("Invalid pattern '{}': {}", pattern, e)))?;

        let mut found = Vec::new();
        for entry in paths {
            match entry {
                Ok(path) if path.starts_with(&self.work_dir) => found.push(path),
                Ok(path) => debug!("Ignoring match outside work dir: {}", path.display()),
                Err(e) => debug!("Unreadable glob entry: {}", e),
            }
        }
        Ok(found)
    }
}

/// Remove a file or directory tree, returning whether anything was there
fn remove_path(path: &Path) -> Result<bool> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    let removed = if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    removed.map_err(|e| InstallError::Clean(format!("Failed to remove {}: {}", path.display(), e)))?;
    debug!("Removed {}", path.display());
    Ok(true)
}
