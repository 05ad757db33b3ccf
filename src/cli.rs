use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::core::os::OsFamily;

/// image-verify command-line interface
#[derive(Parser, Debug, Clone)]
#[command(name = "image-verify", version, about = "Build a container image and verify its environment", long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv). `RUST_LOG` overrides this.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also write logs to a daily-rotated file in this directory
    #[arg(long, value_name = "DIR", global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build the image of a suite and evaluate its checks
    Verify {
        /// Suite file (YAML)
        #[arg(value_name = "SUITE")]
        suite: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Keep the built image after the run
        #[arg(long)]
        keep_image: bool,
    },

    /// Build an image and print its id
    Build {
        /// Build context directory
        #[arg(value_name = "CONTEXT", default_value = ".")]
        context: PathBuf,

        /// Build definition, relative to the context
        #[arg(short = 'f', long, default_value = "Dockerfile")]
        file: String,

        /// Tag to apply to the image
        #[arg(short, long)]
        tag: Option<String>,
    },

    /// Build an image, run one command in a fresh instance and tear it down
    Exec {
        /// Build context directory
        #[arg(value_name = "CONTEXT")]
        context: PathBuf,

        /// Build definition, relative to the context
        #[arg(short = 'f', long, default_value = "Dockerfile")]
        file: String,

        /// Check whether this package is installed instead of running a command
        #[arg(long, value_name = "NAME", conflicts_with = "command")]
        package: Option<String>,

        /// OS family used for package queries
        #[arg(long, default_value = "auto", value_parser = clap::value_parser!(OsFamily))]
        os: OsFamily,

        /// Command to run through /bin/sh -c. A single argument is passed as a
        /// shell string; several are quoted individually
        #[arg(value_name = "COMMAND", last = true)]
        command: Vec<String>,
    },

    /// List running instances created by image-verify
    Ps,

    /// Force-remove instances created by image-verify, running or stopped
    Cleanup,
}
