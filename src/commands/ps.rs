use anyhow::Result;

use super::Command;
use crate::{app::context::AppContext, core::ContainerEngine};

pub struct PsCommand;

impl Command for PsCommand {
    fn run(&self, ctx: &AppContext) -> Result<()> {
        let engine = ctx.engine()?;
        let instances = ctx.runtime()?.block_on(engine.list_instances(None, false))?;
        for instance in &instances {
            println!("{instance}");
        }
        Ok(())
    }
}
