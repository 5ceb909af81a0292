use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::{LevelFilter, info, warn};
use std::fs;
use std::path::PathBuf;

mod cli;

use cli::Cli;
use cli::commands::{Commands, InstallArgs, TargetArgs};
use fsinstall::build::Builder;
use fsinstall::clean::Cleaner;
use fsinstall::config::{Config, ConfigOverrides};
use fsinstall::privilege;
use fsinstall::workflow::{FailurePolicy, StageStatus, Workflow, WorkflowReport};

/// Default level until the config file has been read
const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Info;

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fsinstall")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("fsinstall.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // Without RUST_LOG the logger accepts everything and the max level gates
    // it, so the configured level can still be applied after config load
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("trace"))
        .target(env_logger::Target::Pipe(target))
        .init();
    if std::env::var_os("RUST_LOG").is_none() {
        log::set_max_level(DEFAULT_LOG_LEVEL);
    }

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

/// Apply `log_level` from the config file unless RUST_LOG is set
fn apply_log_level(level: Option<&str>) {
    if std::env::var_os("RUST_LOG").is_some() {
        return;
    }
    let Some(level) = level else { return };
    match level.parse::<LevelFilter>() {
        Ok(filter) => log::set_max_level(filter),
        Err(_) => warn!("Ignoring unknown log_level '{}', keeping {}", level, DEFAULT_LOG_LEVEL),
    }
}

fn resolve_config(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut config = base.clone();
    overrides.apply(&mut config);
    config
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        None => handle_install_command(&InstallArgs::default(), config).await,
        Some(Commands::Install(args)) => handle_install_command(args, config).await,
        Some(Commands::Clean { work_dir, all }) => handle_clean_command(work_dir.as_ref(), *all, config),
        Some(Commands::Check(target)) => handle_check_command(target, config),
        Some(Commands::Config(target)) => handle_config_command(target, config),
    }
}

async fn handle_install_command(args: &InstallArgs, config: &Config) -> Result<()> {
    let config = resolve_config(config, &args.overrides());
    config.validate().context("Invalid configuration")?;
    info!("Installing {} from {}", config.binary_name, config.source.url);

    if !args.json {
        println!("{} {} from {}", "Installing:".green(), config.binary_name, config.source.url);
    }

    let report = Workflow::new(config.clone())
        .quiet(args.json)
        .run()
        .await
        .context("Installation aborted")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    match config.failure_policy {
        FailurePolicy::BestEffort => {
            if !args.json {
                println!("{}", "Installation complete".green());
            }
            Ok(())
        }
        FailurePolicy::FailFast => match report.first_failure() {
            Some((stage, reason)) => eyre::bail!("Installation failed at {}: {}", stage, reason),
            None => {
                if !args.json {
                    println!("{}", "Installation complete".green());
                }
                Ok(())
            }
        },
    }
}

fn print_report(report: &WorkflowReport) {
    println!();
    for record in &report.stages {
        let status = match &record.status {
            StageStatus::Succeeded => "ok".green(),
            StageStatus::Failed(_) => "failed".red(),
            StageStatus::Skipped(_) => "skipped".yellow(),
        };
        println!("  {:<8} {:<8} {}ms", record.stage.to_string(), status, record.duration_ms);
    }
    if let Some(fetched) = &report.fetched {
        println!("  source   {} bytes, sha256 {}", fetched.bytes, fetched.sha256);
    }
    if let Some(deploy) = &report.deploy {
        for path in &deploy.installed {
            println!("  {} {}", "installed".green(), path.display());
        }
        for (dir, reason) in &deploy.failed {
            println!("  {} {}: {}", "not installed".red(), dir.display(), reason);
        }
    }
}

fn handle_clean_command(work_dir: Option<&PathBuf>, all: bool, config: &Config) -> Result<()> {
    let work_dir = work_dir.unwrap_or(&config.work_dir);
    info!("Cleaning {} (all: {})", work_dir.display(), all);
    let cleaner = Cleaner::new(work_dir, &config.cleanup);
    let report = if all { cleaner.purge() } else { cleaner.clean() }.context("Cleaning failed")?;
    for path in &report.removed {
        println!("{} {}", "Removed:".yellow(), path.display());
    }
    println!("{}", "Cleaning complete".green());
    Ok(())
}

fn handle_check_command(target: &TargetArgs, config: &Config) -> Result<()> {
    let config = resolve_config(config, &target.overrides());
    let mut problems = 0;

    match privilege::check_destinations(&config.destinations) {
        Ok(()) => println!("{} destinations writable", "ok".green()),
        Err(e) => {
            problems += 1;
            println!("{} {}", "failed".red(), e);
        }
    }

    match Builder::from_config(&config).check_tool(&config.source_path()) {
        Ok(path) => println!("{} build tool at {}", "ok".green(), path.display()),
        Err(e) => {
            problems += 1;
            println!("{} {}", "failed".red(), e);
        }
    }

    if problems > 0 {
        eyre::bail!("{} check(s) failed", problems);
    }
    Ok(())
}

fn handle_config_command(target: &TargetArgs, config: &Config) -> Result<()> {
    let config = resolve_config(config, &target.overrides());
    print!("{}", serde_yaml::to_string(&config).context("Failed to render config")?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging before config load so its warnings are recorded
    setup_logging().context("Failed to setup logging")?;

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    apply_log_level(config.log_level.as_deref());

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
