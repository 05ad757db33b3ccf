use std::fmt;

use serde::Deserialize;

use crate::{
    core::{
        engine::ContainerEngine,
        inspect::assert_contains,
        report::{AssertionFailure, CheckOutcome},
        session::Session,
    },
    error::Result,
};

/// Declarative expectation about the running instance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum Assertion {
    /// Output of the OS version command contains the string.
    OsVersionContains(String),
    PackageInstalled(String),
    PackageNotInstalled(String),
    /// Stdout of `command` contains `substring`.
    CommandStdoutContains { command: String, substring: String },
    /// `command` exits 0.
    CommandSucceeds(String),
}

impl Assertion {
    /// Evaluate against the session's instance.
    ///
    /// # Errors
    /// Returns an error only when a command could not be run; a mismatch is
    /// reported as [`CheckOutcome::Failed`].
    pub async fn evaluate<E: ContainerEngine>(
        &self,
        session: &Session<'_, E>,
    ) -> Result<CheckOutcome> {
        let (passed, observed) = match self {
            Self::OsVersionContains(expected) => {
                let result = session.os_version().await?;
                (assert_contains(&result, expected), result)
            }
            Self::PackageInstalled(package) => session.query_package(package).await?,
            Self::PackageNotInstalled(package) => {
                let (installed, result) = session.query_package(package).await?;
                (!installed, result)
            }
            Self::CommandStdoutContains { command, substring } => {
                let result = session.run(command).await?;
                (assert_contains(&result, substring), result)
            }
            Self::CommandSucceeds(command) => {
                let result = session.run(command).await?;
                (result.success(), result)
            }
        };

        Ok(if passed {
            CheckOutcome::Passed
        } else {
            CheckOutcome::Failed(AssertionFailure {
                expected: self.to_string(),
                observed,
            })
        })
    }
}

impl fmt::Display for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OsVersionContains(s) => write!(f, "OS version contains {s:?}"),
            Self::PackageInstalled(p) => write!(f, "package {p} is installed"),
            Self::PackageNotInstalled(p) => write!(f, "package {p} is not installed"),
            Self::CommandStdoutContains { command, substring } => {
                write!(f, "stdout of `{command}` contains {substring:?}")
            }
            Self::CommandSucceeds(c) => write!(f, "`{c}` exits 0"),
        }
    }
}
