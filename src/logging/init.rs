use std::{path::Path, sync::Mutex};

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

// Global guard to keep the file appender alive
static FILE_APPENDER_GUARD: Mutex<Option<tracing_appender::non_blocking::WorkerGuard>> =
    Mutex::new(None);

pub const LOG_FILE_PREFIX: &str = "image-verify.log";

/// Flush and close the log file appender.
pub fn flush_logs() {
    // Taking the guard will drop it, which flushes pending logs
    if let Ok(mut guard_holder) = FILE_APPENDER_GUARD.lock()
        && let Some(guard) = guard_holder.take()
    {
        drop(guard);
    }
}

/// RUST_LOG (if set) takes precedence. Otherwise, -v/-vv map to "debug"/"trace".
fn filter_for(verbosity: u8) -> Result<EnvFilter> {
    let base = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| base.to_string());
    EnvFilter::try_new(filter).context("invalid RUST_LOG / filter")
}

/// Initialize tracing to stderr.
pub fn init_tracing(verbosity: u8) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*};

    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let filter_layer = filter_for(verbosity)?;

    // Allow re-init to be a no-op in tests
    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init();

    Ok(())
}

/// Initialize tracing to stderr and to a daily-rotated file under `log_dir`.
pub fn init_tracing_with_file(log_dir: &Path, verbosity: u8) -> Result<()> {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, prelude::*};

    let filter_layer = filter_for(verbosity)?;

    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let file_appender = rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Store the guard globally to keep it alive for the program duration
    if let Ok(mut guard_holder) = FILE_APPENDER_GUARD.lock() {
        *guard_holder = Some(guard);
    }

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(non_blocking);
    let console_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(file_layer)
        .with(console_layer)
        .try_init();

    Ok(())
}
