//! The install workflow: FETCH → BUILD → DEPLOY → CLEANUP.
//!
//! Stages run strictly in sequence. Under [`FailurePolicy::FailFast`] the
//! first failure skips the remaining stages, except cleanup which always
//! runs. Under [`FailurePolicy::BestEffort`] every stage is attempted and
//! failures are only recorded.

mod report;
mod stage;

pub use report::{StageRecord, WorkflowReport};
pub use stage::{FailurePolicy, Stage, StageStatus};

use std::path::PathBuf;
use std::time::Instant;

use colored::*;
use log::{error, info, warn};

use crate::build::{Builder, OUTPUT_DIR};
use crate::clean::Cleaner;
use crate::config::Config;
use crate::deploy::Deployer;
use crate::error::{InstallError, Result};
use crate::fetch::Fetcher;
use crate::privilege;

/// Runs the whole install for one resolved [`Config`]
pub struct Workflow {
    config: Config,
    quiet: bool,
}

impl Workflow {
    pub fn new(config: Config) -> Self {
        Self { config, quiet: false }
    }

    /// Suppress progress lines on stdout
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run every stage and return what happened.
    ///
    /// Only a failed privilege check aborts with `Err`; stage failures are
    /// recorded in the report.
    pub async fn run(&self) -> Result<WorkflowReport> {
        let config = &self.config;
        let policy = config.failure_policy;
        let mut report = WorkflowReport::new(policy);
        info!("Starting install workflow ({:?})", policy);

        if config.privilege_check {
            privilege::check_destinations(&config.destinations)?;
        }

        let mut halted = false;

        // FETCH
        let started = Instant::now();
        self.progress(Stage::Fetch, &format!("Fetching {}", config.source.url));
        let fetched = match Fetcher::new(config.fetch.timeout_ms) {
            Ok(fetcher) => fetcher.fetch(&config.source.url, &config.source_path()).await,
            Err(e) => Err(e),
        };
        let source = match fetched {
            Ok(fetched) => {
                let path = fetched.path.clone();
                report.fetched = Some(fetched);
                report.record(Stage::Fetch, StageStatus::Succeeded, elapsed_ms(started));
                path
            }
            Err(e) => {
                halted = self.fail(&mut report, Stage::Fetch, &e, started);
                config.source_path()
            }
        };

        // BUILD
        let builder = Builder::from_config(config).preflight(policy == FailurePolicy::FailFast);
        let executable = if halted {
            self.skip(&mut report, Stage::Build);
            None
        } else {
            let started = Instant::now();
            let label = builder.invocation(&source).map(|inv| inv.tool.label()).unwrap_or("unknown tool");
            self.progress(Stage::Build, &format!("Building with {}", label));
            match builder.build(&source).await {
                Ok(artifact) => {
                    report.artifact = Some(artifact.path.clone());
                    report.record(Stage::Build, StageStatus::Succeeded, elapsed_ms(started));
                    Some(artifact.path)
                }
                Err(e) => {
                    halted = self.fail(&mut report, Stage::Build, &e, started);
                    // best-effort still tries to deploy whatever is at the expected path
                    Some(expected_executable(config, &builder, &source))
                }
            }
        };

        // DEPLOY
        match executable.filter(|_| !halted) {
            None => self.skip(&mut report, Stage::Deploy),
            Some(executable) => {
                let started = Instant::now();
                self.progress(
                    Stage::Deploy,
                    &format!("Installing into {} location(s)", config.destinations.len()),
                );
                let deployer = Deployer::new(config.destinations.clone());
                let deployed = deployer.deploy(&executable, &config.binary_name).await;
                let outcome = deployed.clone().into_result();
                report.deploy = Some(deployed);
                match outcome {
                    Ok(_) => report.record(Stage::Deploy, StageStatus::Succeeded, elapsed_ms(started)),
                    Err(e) => {
                        self.fail(&mut report, Stage::Deploy, &e, started);
                    }
                }
            }
        }

        // CLEANUP
        if config.cleanup.enabled {
            let started = Instant::now();
            self.progress(Stage::Cleanup, "Removing build byproducts");
            match Cleaner::new(&config.work_dir, &config.cleanup).clean() {
                Ok(cleaned) => {
                    report.cleaned = cleaned.removed;
                    report.record(Stage::Cleanup, StageStatus::Succeeded, elapsed_ms(started));
                }
                Err(e) => {
                    self.fail(&mut report, Stage::Cleanup, &e, started);
                }
            }
        } else {
            info!("Cleanup disabled, keeping build byproducts");
            report.record(Stage::Cleanup, StageStatus::Skipped("cleanup disabled".to_string()), 0);
        }

        report.finish();
        if report.succeeded() {
            info!("Install workflow succeeded");
        } else {
            warn!("Install workflow finished with failures");
        }
        Ok(report)
    }

    /// Record a failure and return whether later stages must be skipped
    fn fail(&self, report: &mut WorkflowReport, stage: Stage, err: &InstallError, started: Instant) -> bool {
        error!("Stage {} failed: {}", stage, err);
        if !self.quiet {
            println!("  {} {}", "failed:".red(), err);
        }
        report.record(stage, StageStatus::Failed(err.to_string()), elapsed_ms(started));
        self.config.failure_policy == FailurePolicy::FailFast
    }

    fn skip(&self, report: &mut WorkflowReport, stage: Stage) {
        info!("Skipping stage {} after earlier failure", stage);
        report.record(stage, StageStatus::Skipped("earlier stage failed".to_string()), 0);
    }

    fn progress(&self, stage: Stage, message: &str) {
        if !self.quiet {
            println!("{} {}", format!("[{}/{}]", stage.position(), Stage::ALL.len()).cyan(), message);
        }
    }
}

/// Where the executable would be if the build had worked
fn expected_executable(config: &Config, builder: &Builder, source: &std::path::Path) -> PathBuf {
    match builder.invocation(source) {
        Ok(inv) => config.work_dir.join(inv.output),
        Err(_) => config.work_dir.join(OUTPUT_DIR).join(&config.binary_name),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
