use std::time::Instant;

use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{info, warn};

use crate::{
    config::VerifierConfig,
    core::{
        engine::ContainerEngine,
        image::{ImageHandle, ImageSpec},
        os::OsFamily,
        report::{CheckOutcome, CheckReport, SuiteReport},
        session::Session,
        suite::Suite,
    },
    error::Result,
};

/// Image environment verifier over a container engine.
pub struct Verifier<E: ContainerEngine> {
    engine: E,
    cfg: VerifierConfig,
}

impl<E: ContainerEngine> Verifier<E> {
    pub const fn new(engine: E, cfg: VerifierConfig) -> Self {
        Self { engine, cfg }
    }

    pub const fn engine(&self) -> &E {
        &self.engine
    }

    pub const fn config(&self) -> &VerifierConfig {
        &self.cfg
    }

    /// Build an image without starting it.
    ///
    /// # Errors
    /// Returns [`crate::error::VerifyError::Build`] for an invalid context or
    /// failed build, [`crate::error::VerifyError::Timeout`] if the build runs
    /// past the build timeout.
    pub async fn build(&self, spec: &ImageSpec) -> Result<ImageHandle> {
        spec.validate()?;
        self.engine.build(spec, self.cfg.build_timeout).await
    }

    /// Build `spec` and start an instance; see [`Session::open`].
    ///
    /// # Errors
    /// Returns the build, start or detection error.
    pub async fn open(&self, spec: &ImageSpec, family: OsFamily) -> Result<Session<'_, E>> {
        Session::open(&self.engine, spec, family, &self.cfg).await
    }

    /// Run every check of `suite` against one fresh instance.
    ///
    /// Build, execution and timeout errors abort the run. The instance is
    /// torn down on every path.
    ///
    /// # Errors
    /// Returns the first suite-level error.
    pub async fn verify_suite(&self, suite: &Suite) -> Result<SuiteReport> {
        let started_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        let started = Instant::now();

        let session = self.open(&suite.image_spec(), suite.os_family).await?;
        let run_id = session.run_id().to_string();
        let image_id = session.image().id().to_string();
        let os_family = session.family();

        let checks = run_checks(&session, suite).await;
        if let Err(e) = session.close().await {
            warn!(run = %run_id, "teardown failed: {e}");
        }
        let checks = checks?;

        let report = SuiteReport {
            run_id,
            image_id,
            os_family,
            started_at,
            duration_ms: elapsed_ms(started),
            checks,
        };
        info!(
            passed = report.passed(),
            failed = report.failed(),
            skipped = report.skipped(),
            "suite finished"
        );
        Ok(report)
    }
}

async fn run_checks<E: ContainerEngine>(
    session: &Session<'_, E>,
    suite: &Suite,
) -> Result<Vec<CheckReport>> {
    let mut reports = Vec::with_capacity(suite.checks.len());
    let mut stop = false;

    for check in &suite.checks {
        let assertion = check.expect.to_string();
        if stop {
            reports.push(CheckReport::skipped(&check.name, assertion));
            continue;
        }

        let started = Instant::now();
        let outcome = check.expect.evaluate(session).await?;
        let failed = matches!(outcome, CheckOutcome::Failed(_));
        if failed {
            warn!(check = %check.name, "check failed: {assertion}");
        } else {
            info!(check = %check.name, "check passed");
        }
        reports.push(CheckReport::from_outcome(
            &check.name,
            assertion,
            outcome,
            elapsed_ms(started),
        ));
        stop = failed && suite.fail_fast;
    }

    Ok(reports)
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}
