use serde::Serialize;

/// Captured output of one command run inside an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectionResult {
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl InspectionResult {
    pub const fn success(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }

    pub fn stdout_lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines()
    }
}

/// True iff stdout contains `substring`.
pub fn assert_contains(result: &InspectionResult, substring: &str) -> bool {
    result.stdout.contains(substring)
}
