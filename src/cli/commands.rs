//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - install: fetch, build, deploy and clean up (the default)
//! - clean: remove build byproducts from the work dir
//! - check: verify privileges and the build tool without changing anything
//! - config: print the resolved configuration

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use fsinstall::build::BuildTool;
use fsinstall::config::ConfigOverrides;

/// fsinstall - fetch, build and deploy the FileShare tool
#[derive(Parser, Debug)]
#[command(name = "fsinstall")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute (defaults to install)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch, build and install the executable
    Install(InstallArgs),

    /// Remove build byproducts from the work dir
    Clean {
        /// Work directory to clean
        #[arg(short, long)]
        work_dir: Option<PathBuf>,

        /// Remove the whole work directory
        #[arg(short, long)]
        all: bool,
    },

    /// Check destination privileges and build tool availability
    Check(TargetArgs),

    /// Print the resolved configuration as YAML
    Config(TargetArgs),
}

/// Where to fetch from, where to build and where to install
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Source URL to download
    #[arg(short, long)]
    pub url: Option<String>,

    /// Work directory for the download and build
    #[arg(short, long)]
    pub work_dir: Option<PathBuf>,

    /// Install directory (repeatable, replaces the configured list)
    #[arg(short, long = "dest")]
    pub destinations: Vec<PathBuf>,

    /// Packaging tool
    #[arg(short, long, value_enum)]
    pub tool: Option<BuildTool>,
}

impl TargetArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            url: self.url.clone(),
            work_dir: self.work_dir.clone(),
            destinations: self.destinations.clone(),
            tool: self.tool,
            ..Default::default()
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct InstallArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Keep going after a failed stage and always report completion
    #[arg(long)]
    pub best_effort: bool,

    /// Do not verify write access to the destinations first
    #[arg(long)]
    pub skip_privilege_check: bool,

    /// Leave build byproducts in the work dir
    #[arg(long)]
    pub keep_artifacts: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

impl InstallArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            best_effort: self.best_effort,
            skip_privilege_check: self.skip_privilege_check,
            keep_artifacts: self.keep_artifacts,
            ..self.target.overrides()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_no_args() {
        // No args means install with configured defaults
        let cli = Cli::try_parse_from(["fsinstall"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::try_parse_from(["fsinstall", "-v"]).unwrap();
        assert!(cli.is_verbose());
    }

    #[test]
    fn test_cli_config_option() {
        let cli = Cli::try_parse_from(["fsinstall", "-c", "/path/to/fsinstall.yml"]).unwrap();
        assert_eq!(cli.config.as_ref(), Some(&PathBuf::from("/path/to/fsinstall.yml")));
    }

    #[test]
    fn test_install_with_overrides() {
        let cli = Cli::try_parse_from([
            "fsinstall",
            "install",
            "--url",
            "https://example.com/fileshare.py",
            "-d",
            "/opt/bin",
            "-d",
            "/opt/share",
            "--tool",
            "auto",
            "--best-effort",
            "--keep-artifacts",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Install(args)) => {
                let overrides = args.overrides();
                assert_eq!(overrides.url.as_deref(), Some("https://example.com/fileshare.py"));
                assert_eq!(overrides.destinations, vec![PathBuf::from("/opt/bin"), PathBuf::from("/opt/share")]);
                assert_eq!(overrides.tool, Some(BuildTool::Auto));
                assert!(overrides.best_effort);
                assert!(overrides.keep_artifacts);
                assert!(!overrides.skip_privilege_check);
                assert!(!args.json);
            }
            _ => panic!("Expected install command"),
        }
    }

    #[test]
    fn test_install_rejects_unknown_tool() {
        assert!(Cli::try_parse_from(["fsinstall", "install", "--tool", "cargo"]).is_err());
    }

    #[test]
    fn test_clean_command() {
        let cli = Cli::try_parse_from(["fsinstall", "clean", "--all", "-w", "/tmp/FileShare"]).unwrap();
        match cli.command {
            Some(Commands::Clean { work_dir, all }) => {
                assert!(all);
                assert_eq!(work_dir, Some(PathBuf::from("/tmp/FileShare")));
            }
            _ => panic!("Expected clean command"),
        }
    }

    #[test]
    fn test_check_command() {
        let cli = Cli::try_parse_from(["fsinstall", "check", "-d", "/usr/local/bin"]).unwrap();
        match cli.command {
            Some(Commands::Check(target)) => {
                assert_eq!(target.destinations, vec![PathBuf::from("/usr/local/bin")]);
            }
            _ => panic!("Expected check command"),
        }
    }

    #[test]
    fn test_config_command() {
        let cli = Cli::try_parse_from(["fsinstall", "config"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Config(_))));
    }

    #[test]
    fn test_help_works() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_version_flag() {
        let result = Cli::try_parse_from(["fsinstall", "--version"]);
        // Version flag causes early exit with error (expected)
        assert!(result.is_err());
    }
}
