use std::path::Path;

use anyhow::{Context, Result};

use super::{Command, render};
use crate::{
    app::context::AppContext,
    core::{Verifier, suite::Suite},
    logging::init::flush_logs,
};

pub struct VerifyCommand<'a> {
    pub suite: &'a Path,
    pub json: bool,
    pub keep_image: bool,
}

impl Command for VerifyCommand<'_> {
    fn run(&self, ctx: &AppContext) -> Result<()> {
        let suite = Suite::load(self.suite)?;
        let mut cfg = ctx.cfg.clone();
        cfg.keep_image |= self.keep_image;
        let verifier = Verifier::new(ctx.engine()?, cfg);

        let rt = ctx.runtime()?;
        let report = rt
            .block_on(verifier.verify_suite(&suite))
            .with_context(|| format!("verification of {} aborted", self.suite.display()))?;

        if self.json {
            let json =
                serde_json::to_string_pretty(&report).context("failed to serialize report")?;
            println!("{json}");
        } else {
            print!("{}", render::suite_report(&report));
        }

        if !report.success() {
            flush_logs();
            std::process::exit(1);
        }
        Ok(())
    }
}
