use anyhow::Result;
use clap::Parser;
use image_verify::VerifyError;
use image_verify::cli::Cli;
use image_verify::logging::init::{flush_logs, init_tracing, init_tracing_with_file};
use image_verify::run;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.log_dir {
        Some(dir) => init_tracing_with_file(dir, cli.verbose)?,
        None => init_tracing(cli.verbose)?,
    }

    let result = run(&cli);
    flush_logs();

    // Suite-level failures get their own exit codes; assertion failures exit 1.
    if let Err(err) = &result
        && let Some(verify) = err.downcast_ref::<VerifyError>()
    {
        eprintln!("Error: {err:#}");
        std::process::exit(verify.exit_code());
    }
    result
}
