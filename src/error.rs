use std::{path::PathBuf, time::Duration};

use thiserror::Error;

/// Suite-level failures. Any of these aborts the remaining checks of a run.
///
/// A check whose command ran but whose output did not match is not an error;
/// see [`crate::core::report::AssertionFailure`].
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The image could not be built: invalid build context, missing build
    /// definition, or the build process exited non-zero.
    #[error("image build failed for {context}: {message}")]
    Build { context: PathBuf, message: String },

    /// The instance could not be started, or a command could not be invoked in it.
    #[error("execution failed: {message}")]
    Execution { message: String },

    /// A build or command exceeded its allotted time.
    #[error("{operation} timed out after {}s", .timeout.as_secs())]
    Timeout {
        operation: String,
        timeout: Duration,
    },

    /// The suite file is unreadable or malformed.
    #[error("invalid suite {path}: {message}")]
    Suite { path: PathBuf, message: String },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config { message: String },
}

impl VerifyError {
    pub(crate) fn build(context: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Build {
            context: context.into(),
            message: message.into(),
        }
    }

    pub(crate) fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }

    pub(crate) fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout,
        }
    }

    /// Process exit code the CLI uses for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Timeout { .. } => 3,
            _ => 2,
        }
    }
}

pub type Result<T> = std::result::Result<T, VerifyError>;
