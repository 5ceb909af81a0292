//! Per-run record of what each stage did.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::stage::{FailurePolicy, Stage, StageStatus};
use crate::deploy::DeployReport;
use crate::fetch::FetchedSource;

#[derive(Debug, Clone, Serialize)]
pub struct StageRecord {
    pub stage: Stage,
    #[serde(flatten)]
    pub status: StageStatus,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    pub policy: FailurePolicy,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stages: Vec<StageRecord>,
    pub fetched: Option<FetchedSource>,
    pub artifact: Option<PathBuf>,
    pub deploy: Option<DeployReport>,
    pub cleaned: Vec<PathBuf>,
}

impl WorkflowReport {
    pub fn new(policy: FailurePolicy) -> Self {
        Self {
            policy,
            started_at: Utc::now(),
            finished_at: None,
            stages: Vec::new(),
            fetched: None,
            artifact: None,
            deploy: None,
            cleaned: Vec::new(),
        }
    }

    pub fn record(&mut self, stage: Stage, status: StageStatus, duration_ms: u64) {
        self.stages.push(StageRecord {
            stage,
            status,
            duration_ms,
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn status_of(&self, stage: Stage) -> Option<&StageStatus> {
        self.stages.iter().find(|r| r.stage == stage).map(|r| &r.status)
    }

    /// True when no stage failed
    pub fn succeeded(&self) -> bool {
        !self.stages.iter().any(|r| r.status.is_failed())
    }

    /// The earliest failing stage and its reason
    pub fn first_failure(&self) -> Option<(Stage, &str)> {
        self.stages
            .iter()
            .find(|r| r.status.is_failed())
            .and_then(|r| r.status.reason().map(|reason| (r.stage, reason)))
    }
}
