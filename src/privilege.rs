//! Up-front authorization check for the install destinations.
//!
//! Runs before anything is fetched so a missing `sudo` fails immediately
//! instead of after a full download and build.

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{InstallError, Result};

/// Verify every destination is writable (or creatable) by the current user
pub fn check_destinations(destinations: &[PathBuf]) -> Result<()> {
    let denied: Vec<String> = destinations
        .iter()
        .filter_map(|dest| match try_write(dest) {
            Ok(()) => None,
            Err(e) => Some(format!("{} ({})", dest.display(), e)),
        })
        .collect();

    if denied.is_empty() {
        info!("All {} destination(s) are writable", destinations.len());
        return Ok(());
    }

    Err(InstallError::Privilege(format!(
        "cannot write to {}; re-run with sudo or choose other destinations",
        denied.join(", ")
    )))
}

/// Check whether `dest` could be written by touching a marker in its nearest existing ancestor
fn try_write(dest: &Path) -> std::io::Result<()> {
    let anchor = nearest_existing(dest).ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "no existing ancestor directory")
    })?;
    if !anchor.is_dir() {
        return Err(std::io::Error::other(format!("{} is not a directory", anchor.display())));
    }

    let marker = anchor.join(format!(".{}-write-check-{}", env!("CARGO_PKG_NAME"), std::process::id()));
    debug!("Checking write access with {}", marker.display());
    std::fs::OpenOptions::new().write(true).create_new(true).open(&marker)?;
    std::fs::remove_file(&marker)
}

/// Bare relative paths bottom out at the current directory
fn nearest_existing(path: &Path) -> Option<&Path> {
    path.ancestors()
        .map(|p| if p.as_os_str().is_empty() { Path::new(".") } else { p })
        .find(|p| p.exists())
}
