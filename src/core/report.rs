use serde::Serialize;

use crate::core::{inspect::InspectionResult, os::OsFamily};

/// A check whose command ran but whose output did not match.
///
/// This is a normal test outcome, not a fault of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssertionFailure {
    pub expected: String,
    pub observed: InspectionResult,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Passed,
    Failed(AssertionFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Passed,
    Failed,
    /// Not evaluated because an earlier check failed in fail-fast mode.
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub name: String,
    pub assertion: String,
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<AssertionFailure>,
    pub duration_ms: u64,
}

impl CheckReport {
    pub fn from_outcome(
        name: impl Into<String>,
        assertion: impl Into<String>,
        outcome: CheckOutcome,
        duration_ms: u64,
    ) -> Self {
        let (status, failure) = match outcome {
            CheckOutcome::Passed => (CheckStatus::Passed, None),
            CheckOutcome::Failed(failure) => (CheckStatus::Failed, Some(failure)),
        };
        Self {
            name: name.into(),
            assertion: assertion.into(),
            status,
            failure,
            duration_ms,
        }
    }

    pub fn skipped(name: impl Into<String>, assertion: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            assertion: assertion.into(),
            status: CheckStatus::Skipped,
            failure: None,
            duration_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub run_id: String,
    pub image_id: String,
    pub os_family: OsFamily,
    /// RFC 3339, UTC.
    pub started_at: String,
    pub duration_ms: u64,
    pub checks: Vec<CheckReport>,
}

impl SuiteReport {
    fn count(&self, status: CheckStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }

    pub fn passed(&self) -> usize {
        self.count(CheckStatus::Passed)
    }

    pub fn failed(&self) -> usize {
        self.count(CheckStatus::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(CheckStatus::Skipped)
    }

    /// True iff every check ran and passed.
    pub fn success(&self) -> bool {
        self.checks.iter().all(|c| c.status == CheckStatus::Passed)
    }
}
