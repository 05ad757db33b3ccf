use std::{path::PathBuf, time::Duration};

use crate::error::{Result, VerifyError};

pub const ENV_DOCKER: &str = "IMAGE_VERIFY_DOCKER";
pub const ENV_BUILD_TIMEOUT: &str = "IMAGE_VERIFY_BUILD_TIMEOUT_SECS";
pub const ENV_EXEC_TIMEOUT: &str = "IMAGE_VERIFY_EXEC_TIMEOUT_SECS";
pub const ENV_KEEP_IMAGE: &str = "IMAGE_VERIFY_KEEP_IMAGE";

/// Verifier configuration values sourced from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierConfig {
    /// Container runtime binary. `None` resolves `docker` from `PATH`.
    pub docker_bin: Option<PathBuf>,
    /// Upper bound for one image build.
    pub build_timeout: Duration,
    /// Upper bound for starting the instance and for each inspection command.
    pub exec_timeout: Duration,
    /// Leave the built image in place after teardown.
    pub keep_image: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            docker_bin: None,
            build_timeout: Duration::from_secs(600),
            exec_timeout: Duration::from_secs(60),
            keep_image: false,
        }
    }
}

impl VerifierConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    /// Returns an error if a variable is set to an unparsable value.
    pub fn load() -> Result<Self> {
        Self::load_from(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`; absent keys keep their defaults.
    ///
    /// # Errors
    /// Returns an error if a present value cannot be parsed.
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut out = Self::default();

        if let Some(v) = lookup(ENV_DOCKER)
            && !v.trim().is_empty()
        {
            out.docker_bin = Some(PathBuf::from(v.trim()));
        }
        if let Some(v) = lookup(ENV_BUILD_TIMEOUT) {
            out.build_timeout = parse_secs(ENV_BUILD_TIMEOUT, &v)?;
        }
        if let Some(v) = lookup(ENV_EXEC_TIMEOUT) {
            out.exec_timeout = parse_secs(ENV_EXEC_TIMEOUT, &v)?;
        }
        if let Some(v) = lookup(ENV_KEEP_IMAGE) {
            out.keep_image = parse_bool(ENV_KEEP_IMAGE, &v)?;
        }

        Ok(out)
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(VerifyError::Config {
            message: format!("{key} must be greater than zero"),
        }),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => Err(VerifyError::Config {
            message: format!("{key} is not a number of seconds: {raw:?}"),
        }),
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(VerifyError::Config {
            message: format!("{key} is not a boolean: {raw:?}"),
        }),
    }
}
