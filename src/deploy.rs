//! Deployer stage - copies the built executable into every install directory.
//!
//! Each destination is an independent write: a failure at one never stops
//! the attempts at the rest.

use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Serialize;

use crate::error::{InstallError, Result};

/// Mode given to installed copies
#[cfg(unix)]
const INSTALL_MODE: u32 = 0o755;

/// Outcome of copying to every destination
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeployReport {
    /// Full paths of the installed copies
    pub installed: Vec<PathBuf>,
    /// Destination directory and the reason it failed
    pub failed: Vec<(PathBuf, String)>,
}

impl DeployReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Convert into an error naming every failed destination, if any
    pub fn into_result(self) -> Result<Self> {
        if self.is_complete() {
            return Ok(self);
        }
        let details: Vec<String> = self
            .failed
            .iter()
            .map(|(dir, reason)| format!("{}: {}", dir.display(), reason))
            .collect();
        Err(InstallError::Deploy(details.join("; ")))
    }
}

/// Copies an executable into a fixed set of directories
#[derive(Debug, Clone)]
pub struct Deployer {
    destinations: Vec<PathBuf>,
}

impl Deployer {
    pub fn new(destinations: Vec<PathBuf>) -> Self {
        Self { destinations }
    }

    pub fn destinations(&self) -> &[PathBuf] {
        &self.destinations
    }

    /// Copy `executable` into each destination under `binary_name`.
    ///
    /// Never short-circuits; inspect the report or call
    /// [`DeployReport::into_result`].
    pub async fn deploy(&self, executable: &Path, binary_name: &str) -> DeployReport {
        let mut report = DeployReport::default();

        for dir in &self.destinations {
            match install_one(executable, dir, binary_name).await {
                Ok(target) => {
                    info!("Installed {}", target.display());
                    report.installed.push(target);
                }
                Err(e) => {
                    warn!("Failed to install into {}: {}", dir.display(), e);
                    report.failed.push((dir.clone(), e.to_string()));
                }
            }
        }

        report
    }
}

async fn install_one(executable: &Path, dir: &Path, binary_name: &str) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let target = dir.join(binary_name);
    tokio::fs::copy(executable, &target).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&target, std::fs::Permissions::from_mode(INSTALL_MODE)).await?;
    }

    Ok(target)
}
