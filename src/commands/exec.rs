use std::{borrow::Cow, path::Path};

use anyhow::{Result, bail};
use shell_escape::unix::escape;

use super::{Command, render};
use crate::{
    app::context::AppContext,
    core::{ImageSpec, OsFamily, Verifier},
    logging::init::flush_logs,
};

pub struct ExecCommand<'a> {
    pub context: &'a Path,
    pub file: &'a str,
    pub package: Option<&'a str>,
    pub os: OsFamily,
    pub command: &'a [String],
}

impl Command for ExecCommand<'_> {
    fn run(&self, ctx: &AppContext) -> Result<()> {
        if self.package.is_none() && self.command.is_empty() {
            bail!("nothing to run: pass a command after `--` or --package <NAME>");
        }

        let spec = ImageSpec::new(self.context).with_dockerfile(self.file);
        let verifier = Verifier::new(ctx.engine()?, ctx.cfg.clone());
        let rt = ctx.runtime()?;

        let (result, installed) = rt.block_on(async {
            let session = verifier.open(&spec, self.os).await?;
            let outcome = match self.package {
                Some(package) => session
                    .query_package(package)
                    .await
                    .map(|(installed, result)| (result, Some(installed))),
                None => session.run(&shell_command(self.command)).await.map(|r| (r, None)),
            };
            session.close().await?;
            outcome
        })?;

        match installed {
            Some(installed) => {
                let package = self.package.unwrap_or_default();
                println!("{}", render::package_line(package, installed));
                if !installed {
                    flush_logs();
                    std::process::exit(1);
                }
            }
            None => {
                print!("{}", result.stdout);
                eprint!("{}", result.stderr);
                if !result.success() {
                    flush_logs();
                    std::process::exit(result.exit_code.unwrap_or(1));
                }
            }
        }
        Ok(())
    }
}

/// A single argument is taken as a shell string as-is; several arguments are
/// quoted one by one so each reaches the command unchanged.
fn shell_command(args: &[String]) -> String {
    match args {
        [script] => script.clone(),
        _ => args
            .iter()
            .map(|arg| escape(Cow::Borrowed(arg.as_str())))
            .collect::<Vec<_>>()
            .join(" "),
    }
}
