use anyhow::Result;

use crate::{
    app::context::AppContext,
    cli::{Cli, Commands},
};

pub mod build;
pub mod cleanup;
pub mod exec;
pub mod ps;
pub mod render;
pub mod verify;

/// Unified interface implemented by each subcommand handler.
pub trait Command {
    /// Execute the subcommand.
    ///
    /// # Errors
    /// Returns an error if the command fails.
    fn run(&self, ctx: &AppContext) -> Result<()>;
}

/// Central dispatcher: routes parsed CLI to subcommand handlers.
///
/// # Errors
/// Returns an error if the invoked subcommand fails.
pub fn dispatch(cli: &Cli) -> Result<()> {
    let ctx = AppContext::from_env(cli.verbose)?;

    match &cli.command {
        Commands::Verify {
            suite,
            json,
            keep_image,
        } => {
            let cmd = verify::VerifyCommand {
                suite,
                json: *json,
                keep_image: *keep_image,
            };
            cmd.run(&ctx)
        }
        Commands::Build { context, file, tag } => {
            let cmd = build::BuildCommand {
                context,
                file,
                tag: tag.as_deref(),
            };
            cmd.run(&ctx)
        }
        Commands::Exec {
            context,
            file,
            package,
            os,
            command,
        } => {
            let cmd = exec::ExecCommand {
                context,
                file,
                package: package.as_deref(),
                os: *os,
                command,
            };
            cmd.run(&ctx)
        }
        Commands::Ps => ps::PsCommand.run(&ctx),
        Commands::Cleanup => cleanup::CleanupCommand.run(&ctx),
    }
}
