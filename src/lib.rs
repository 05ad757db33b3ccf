//! Build a container image, start one ephemeral instance of it, run read-only
//! inspection commands inside it and evaluate declarative assertions against
//! the output.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;

pub use commands::dispatch as run;
pub use error::VerifyError;
