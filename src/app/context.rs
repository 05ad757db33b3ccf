use anyhow::{Context, Result};

use crate::{config::VerifierConfig, core::engine::DockerCli};

#[derive(Debug, Clone)]
pub struct AppContext {
    pub cfg: VerifierConfig,
    pub verbosity: u8,
}

impl AppContext {
    pub const fn new(cfg: VerifierConfig, verbosity: u8) -> Self {
        Self { cfg, verbosity }
    }

    /// Convenience constructor loading config from the environment.
    pub fn from_env(verbosity: u8) -> Result<Self> {
        let cfg = VerifierConfig::load().context("failed to load configuration")?;
        Ok(Self::new(cfg, verbosity))
    }

    /// Docker CLI engine for the configured runtime binary.
    pub fn engine(&self) -> Result<DockerCli> {
        Ok(DockerCli::from_config(&self.cfg)?)
    }

    /// Runtime driving the async engine calls of one command.
    pub fn runtime(&self) -> Result<tokio::runtime::Runtime> {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to build tokio runtime")
    }
}
