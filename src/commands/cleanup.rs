use anyhow::Result;
use tracing::warn;

use super::Command;
use crate::{app::context::AppContext, core::ContainerEngine};

pub struct CleanupCommand;

impl Command for CleanupCommand {
    fn run(&self, ctx: &AppContext) -> Result<()> {
        let engine = ctx.engine()?;
        let rt = ctx.runtime()?;

        let removed = rt.block_on(async {
            let mut removed = 0usize;
            for instance in engine.list_instances(None, true).await? {
                match engine.remove_instance(&instance).await {
                    Ok(()) => removed += 1,
                    Err(e) => warn!(instance = %instance, "failed to remove: {e}"),
                }
            }
            anyhow::Ok(removed)
        })?;

        println!("removed {removed} instance(s)");
        Ok(())
    }
}
