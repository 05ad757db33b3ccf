//! Plain-text rendering of verification results.

use std::fmt::Write;

use console::style;

use crate::core::report::{CheckStatus, SuiteReport};

/// Lines of captured output shown under a failed check.
const DIAGNOSTIC_LINES: usize = 10;

pub fn suite_report(report: &SuiteReport) -> String {
    let mut out = String::new();
    let image = report
        .image_id
        .strip_prefix("sha256:")
        .unwrap_or(&report.image_id);
    let _ = writeln!(
        out,
        "image {} ({}), run {}",
        image.get(..12).unwrap_or(image),
        report.os_family,
        report.run_id
    );

    for check in &report.checks {
        let tag = match check.status {
            CheckStatus::Passed => style("PASS").green().bold(),
            CheckStatus::Failed => style("FAIL").red().bold(),
            CheckStatus::Skipped => style("SKIP").yellow(),
        };
        let _ = writeln!(out, "  {tag} {} ({})", check.name, check.assertion);

        if let Some(failure) = &check.failure {
            let observed = &failure.observed;
            let _ = writeln!(
                out,
                "       $ {}  (exit {})",
                observed.command,
                observed
                    .exit_code
                    .map_or_else(|| "signal".to_string(), |c| c.to_string())
            );
            for line in observed.stdout.lines().take(DIAGNOSTIC_LINES) {
                let _ = writeln!(out, "       | {line}");
            }
            for line in observed.stderr.lines().take(DIAGNOSTIC_LINES) {
                let _ = writeln!(out, "       ! {line}");
            }
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let secs = report.duration_ms as f64 / 1000.0;
    let _ = writeln!(
        out,
        "{} passed, {} failed, {} skipped in {secs:.1}s",
        report.passed(),
        report.failed(),
        report.skipped(),
    );
    out
}

pub fn package_line(package: &str, installed: bool) -> String {
    if installed {
        format!("{} {package} is installed", style("PASS").green().bold())
    } else {
        format!("{} {package} is not installed", style("FAIL").red().bold())
    }
}
