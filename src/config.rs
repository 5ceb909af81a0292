use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::build::{BuildTool, CustomCommand};
use crate::workflow::FailurePolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub source: SourceConfig,
    pub work_dir: PathBuf,
    pub binary_name: String,
    pub fetch: FetchConfig,
    pub build: BuildConfig,
    pub destinations: Vec<PathBuf>,
    pub cleanup: CleanupConfig,
    pub failure_policy: FailurePolicy,
    pub privilege_check: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub url: String,
    /// Name the download is stored under inside the work dir
    pub file_name: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            file_name: "fileshare.py".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// 0 means no timeout
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub tool: BuildTool,
    pub command: Option<CustomCommand>,
    /// 0 means no timeout
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    pub enabled: bool,
    /// Directories removed recursively, relative to the work dir
    pub dirs: Vec<String>,
    /// Glob patterns of files removed, relative to the work dir
    pub patterns: Vec<String>,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dirs: vec!["build".to_string(), "dist".to_string()],
            patterns: vec!["*.spec".to_string()],
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            source: SourceConfig::default(),
            work_dir: PathBuf::from("FileShare"),
            binary_name: "fileshare".to_string(),
            fetch: FetchConfig::default(),
            build: BuildConfig::default(),
            destinations: vec![
                PathBuf::from("/usr/bin"),
                PathBuf::from("/usr/local/bin"),
                PathBuf::from("/usr/share/fileshare"),
            ],
            cleanup: CleanupConfig::default(),
            failure_policy: FailurePolicy::default(),
            privilege_check: true,
        }
    }
}

/// Values given on the command line, applied over the loaded config
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub url: Option<String>,
    pub work_dir: Option<PathBuf>,
    pub destinations: Vec<PathBuf>,
    pub tool: Option<BuildTool>,
    pub best_effort: bool,
    pub skip_privilege_check: bool,
    pub keep_artifacts: bool,
}

impl ConfigOverrides {
    /// Apply every set override to `config`
    pub fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.url {
            config.source.url = url.clone();
        }
        if let Some(work_dir) = &self.work_dir {
            config.work_dir = work_dir.clone();
        }
        if !self.destinations.is_empty() {
            config.destinations = self.destinations.clone();
        }
        if let Some(tool) = self.tool {
            config.build.tool = tool;
        }
        if self.best_effort {
            config.failure_policy = FailurePolicy::BestEffort;
        }
        if self.skip_privilege_check {
            config.privilege_check = false;
        }
        if self.keep_artifacts {
            config.cleanup.enabled = false;
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let project_name = env!("CARGO_PKG_NAME");

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Path the fetched source is written to
    pub fn source_path(&self) -> PathBuf {
        self.work_dir.join(&self.source.file_name)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.source.url.trim().is_empty() {
            eyre::bail!("source.url must be set (config file or --url)");
        }
        let url = reqwest::Url::parse(&self.source.url).context(format!("source.url is not a valid URL: {}", self.source.url))?;
        if !matches!(url.scheme(), "http" | "https") {
            eyre::bail!("source.url must use http or https, got '{}'", url.scheme());
        }
        if !is_plain_name(&self.source.file_name) {
            eyre::bail!("source.file_name must be a plain file name: '{}'", self.source.file_name);
        }
        if !is_plain_name(&self.binary_name) {
            eyre::bail!("binary_name must be a plain file name: '{}'", self.binary_name);
        }
        if self.destinations.is_empty() {
            eyre::bail!("destinations must list at least one directory");
        }
        if self.build.tool == BuildTool::Command
            && self.build.command.as_ref().is_none_or(|c| c.program.trim().is_empty())
        {
            eyre::bail!("build.tool is 'command' but build.command.program is empty");
        }
        for entry in self.cleanup.dirs.iter().chain(&self.cleanup.patterns) {
            if !stays_inside(entry) {
                eyre::bail!("cleanup entry must name a path inside the work dir: '{}'", entry);
            }
        }
        Ok(())
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains('/') && !name.contains('\\')
}

/// True if `entry` is relative, never climbs out with `..` and names
/// something below the work dir rather than the work dir itself
fn stays_inside(entry: &str) -> bool {
    let components: Vec<Component> = Path::new(entry.trim()).components().collect();
    components.iter().any(|c| matches!(c, Component::Normal(_)))
        && components.iter().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
