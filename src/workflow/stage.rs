//! Stage identifiers, outcomes and the failure policy.

use serde::{Deserialize, Serialize};

/// The forward-only chain FETCH → BUILD → DEPLOY → CLEANUP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Fetch,
    Build,
    Deploy,
    Cleanup,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Fetch, Stage::Build, Stage::Deploy, Stage::Cleanup];

    /// The stage that runs after this one
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Fetch => Some(Stage::Build),
            Stage::Build => Some(Stage::Deploy),
            Stage::Deploy => Some(Stage::Cleanup),
            Stage::Cleanup => None,
        }
    }

    /// 1-based position, used in progress output
    pub fn position(&self) -> usize {
        match self {
            Stage::Fetch => 1,
            Stage::Build => 2,
            Stage::Deploy => 3,
            Stage::Cleanup => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Build => "build",
            Stage::Deploy => "deploy",
            Stage::Cleanup => "cleanup",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "kebab-case")]
pub enum StageStatus {
    Succeeded,
    Failed(String),
    Skipped(String),
}

impl StageStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, StageStatus::Failed(_))
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            StageStatus::Succeeded => None,
            StageStatus::Failed(r) | StageStatus::Skipped(r) => Some(r),
        }
    }
}

/// What happens after a stage fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Skip the remaining stages (cleanup still runs) and report failure
    #[default]
    FailFast,
    /// Run every stage regardless and always report completion
    BestEffort,
}
