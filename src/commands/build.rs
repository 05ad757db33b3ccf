use std::path::Path;

use anyhow::Result;

use super::Command;
use crate::{
    app::context::AppContext,
    core::{ImageSpec, Verifier},
};

pub struct BuildCommand<'a> {
    pub context: &'a Path,
    pub file: &'a str,
    pub tag: Option<&'a str>,
}

impl Command for BuildCommand<'_> {
    fn run(&self, ctx: &AppContext) -> Result<()> {
        let mut spec = ImageSpec::new(self.context).with_dockerfile(self.file);
        if let Some(tag) = self.tag {
            spec = spec.with_tag(tag);
        }
        let verifier = Verifier::new(ctx.engine()?, ctx.cfg.clone());

        let image = ctx.runtime()?.block_on(verifier.build(&spec))?;
        println!("{image}");
        Ok(())
    }
}
