use std::{fs, path::Path, time::Duration};

use image_verify::{
    VerifyError,
    config::VerifierConfig,
    core::{
        CheckStatus, ContainerEngine, ImageSpec, OsFamily, Suite, Verifier, assert_contains,
    },
};
use tempfile::{TempDir, tempdir};

mod support;
use support::fake_engine::FakeEngine;

fn build_context() -> TempDir {
    let td = tempdir().unwrap();
    fs::write(
        td.path().join("Dockerfile"),
        "FROM ubuntu:14.04\nRUN apt-get update && apt-get install -y python\n",
    )
    .unwrap();
    td
}

fn cfg() -> VerifierConfig {
    VerifierConfig {
        exec_timeout: Duration::from_secs(5),
        ..VerifierConfig::default()
    }
}

fn suite(ctx: &Path, body: &str) -> Suite {
    Suite::from_yaml(&format!("context: {}\n{body}", ctx.display()), Path::new(".")).unwrap()
}

const DOCKERFILE_SPEC: &str = r#"
os_family: debian
checks:
  - name: installs the correct version of Ubuntu
    expect:
      os_version_contains: "Ubuntu 14"
  - name: installs required packages
    expect:
      package_installed: python
"#;

#[tokio::test]
async fn build_returns_handle_for_good_context() {
    let ctx = build_context();
    let verifier = Verifier::new(FakeEngine::trusty(), cfg());
    let image = verifier.build(&ImageSpec::new(ctx.path())).await.unwrap();
    assert!(!image.id().is_empty());
}

#[tokio::test]
async fn build_without_dockerfile_is_build_error() {
    let ctx = tempdir().unwrap();
    let verifier = Verifier::new(FakeEngine::trusty(), cfg());
    let err = verifier.build(&ImageSpec::new(ctx.path())).await.unwrap_err();
    assert!(matches!(err, VerifyError::Build { .. }));
    // The runtime is never asked to build a broken context.
    assert!(verifier.engine().built().is_empty());
}

#[tokio::test]
async fn os_version_and_package_checks_pass() {
    let ctx = build_context();
    let verifier = Verifier::new(FakeEngine::trusty(), cfg());

    let report = verifier
        .verify_suite(&suite(ctx.path(), DOCKERFILE_SPEC))
        .await
        .unwrap();

    assert!(report.success(), "{report:?}");
    assert_eq!(report.passed(), 2);
    assert_eq!(report.os_family, OsFamily::Debian);
    assert!(verifier.engine().running().is_empty());
}

#[tokio::test]
async fn session_run_and_assertions() {
    let ctx = build_context();
    let engine = FakeEngine::trusty()
        .respond("echo \"Ubuntu 14\"", "Ubuntu 14\n", 0)
        .respond("echo \"Ubuntu 16\"", "Ubuntu 16\n", 0)
        .respond(
            "dpkg-query -f '${Status} ${Version}\\n' -W nonexistent-package",
            "",
            1,
        );
    let verifier = Verifier::new(engine, cfg());
    let session = verifier
        .open(&ImageSpec::new(ctx.path()), OsFamily::Debian)
        .await
        .unwrap();

    let trusty = session.run("echo \"Ubuntu 14\"").await.unwrap();
    assert!(assert_contains(&trusty, "Ubuntu 14"));
    let xenial = session.run("echo \"Ubuntu 16\"").await.unwrap();
    assert!(!assert_contains(&xenial, "Ubuntu 14"));

    let release = session.run("lsb_release -a").await.unwrap();
    assert!(assert_contains(&release, "Ubuntu 14"));

    assert!(session.assert_package_installed("python").await.unwrap());
    assert!(
        !session
            .assert_package_installed("nonexistent-package")
            .await
            .unwrap()
    );

    // A failing command is a result, not an error.
    let missing = session.run("false-command").await.unwrap();
    assert_eq!(missing.exit_code, Some(127));

    session.close().await.unwrap();
    assert!(verifier.engine().list_instances(None, true).await.unwrap().is_empty());
}

#[tokio::test]
async fn assertion_failures_do_not_stop_later_checks() {
    let ctx = build_context();
    let verifier = Verifier::new(FakeEngine::trusty(), cfg());
    let body = r#"
os_family: debian
checks:
  - name: wrong release
    expect:
      os_version_contains: "Ubuntu 16"
  - name: python
    expect:
      package_installed: python
  - name: no apache
    expect:
      package_not_installed: apache2
"#;

    let report = verifier.verify_suite(&suite(ctx.path(), body)).await.unwrap();

    let statuses: Vec<_> = report.checks.iter().map(|c| c.status).collect();
    assert_eq!(
        statuses,
        [CheckStatus::Failed, CheckStatus::Passed, CheckStatus::Passed]
    );
    let failure = report.checks[0].failure.as_ref().unwrap();
    assert_eq!(failure.observed.command, "lsb_release -a");
    assert!(failure.observed.stdout.contains("Ubuntu 14.04"));
    assert!(verifier.engine().running().is_empty());
}

#[tokio::test]
async fn fail_fast_skips_remaining_checks() {
    let ctx = build_context();
    let verifier = Verifier::new(FakeEngine::trusty(), cfg());
    let body = r#"
os_family: debian
fail_fast: true
checks:
  - name: missing package
    expect:
      package_installed: nonexistent-package
  - name: python
    expect:
      package_installed: python
"#;

    let report = verifier.verify_suite(&suite(ctx.path(), body)).await.unwrap();

    assert_eq!(report.failed(), 1);
    assert_eq!(report.skipped(), 1);
    assert_eq!(verifier.engine().executed().len(), 1);
}

#[tokio::test]
async fn execution_error_aborts_and_tears_down() {
    let ctx = build_context();
    let engine = FakeEngine::trusty().break_on("lsb_release -a");
    let verifier = Verifier::new(engine, cfg());

    let err = verifier
        .verify_suite(&suite(ctx.path(), DOCKERFILE_SPEC))
        .await
        .unwrap_err();

    assert!(matches!(err, VerifyError::Execution { .. }));
    // The package check after the broken one never ran.
    assert_eq!(verifier.engine().executed(), ["lsb_release -a"]);
    assert!(verifier.engine().running().is_empty());
    assert_eq!(verifier.engine().removed_instances().len(), 1);
    assert_eq!(verifier.engine().removed_images().len(), 1);
}

#[tokio::test]
async fn timeout_tears_instance_down() {
    let ctx = build_context();
    let engine = FakeEngine::trusty().hang_on("lsb_release -a");
    let verifier = Verifier::new(engine, cfg());

    let err = verifier
        .verify_suite(&suite(ctx.path(), DOCKERFILE_SPEC))
        .await
        .unwrap_err();

    assert!(matches!(err, VerifyError::Timeout { .. }));
    assert!(verifier.engine().list_instances(None, true).await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_build_leaves_nothing_running() {
    let ctx = build_context();
    let verifier = Verifier::new(FakeEngine::trusty().failing_build(), cfg());

    let err = verifier
        .verify_suite(&suite(ctx.path(), DOCKERFILE_SPEC))
        .await
        .unwrap_err();

    assert!(matches!(err, VerifyError::Build { .. }));
    assert!(verifier.engine().running().is_empty());
}

#[tokio::test]
async fn failed_start_removes_built_image() {
    let ctx = build_context();
    let verifier = Verifier::new(FakeEngine::trusty().failing_start(), cfg());

    let err = verifier
        .open(&ImageSpec::new(ctx.path()), OsFamily::Debian)
        .await
        .err()
        .unwrap();

    assert!(matches!(err, VerifyError::Execution { .. }));
    assert_eq!(verifier.engine().removed_images(), verifier.engine().built());
}

#[tokio::test]
async fn failed_start_removes_created_instance() {
    let ctx = build_context();
    let verifier = Verifier::new(FakeEngine::trusty().failing_start_after_create(), cfg());

    let err = verifier
        .open(&ImageSpec::new(ctx.path()), OsFamily::Debian)
        .await
        .err()
        .unwrap();

    assert!(matches!(err, VerifyError::Execution { .. }));
    assert!(verifier.engine().list_instances(None, true).await.unwrap().is_empty());
    assert_eq!(verifier.engine().removed_instances().len(), 1);
    assert_eq!(verifier.engine().removed_images(), verifier.engine().built());
}

#[tokio::test]
async fn keep_image_skips_image_removal() {
    let ctx = build_context();
    let cfg = VerifierConfig {
        keep_image: true,
        ..cfg()
    };
    let verifier = Verifier::new(FakeEngine::trusty(), cfg);

    verifier
        .verify_suite(&suite(ctx.path(), DOCKERFILE_SPEC))
        .await
        .unwrap();

    assert!(verifier.engine().removed_images().is_empty());
    assert_eq!(verifier.engine().removed_instances().len(), 1);
}

#[tokio::test]
async fn dropped_session_is_reaped() {
    let ctx = build_context();
    let verifier = Verifier::new(FakeEngine::trusty(), cfg());

    let session = verifier
        .open(&ImageSpec::new(ctx.path()), OsFamily::Debian)
        .await
        .unwrap();
    assert_eq!(verifier.engine().running().len(), 1);
    drop(session);

    assert!(verifier.engine().running().is_empty());
    assert_eq!(verifier.engine().reaped().len(), 1);
}

#[tokio::test]
async fn each_run_gets_a_fresh_instance() {
    let ctx = build_context();
    let verifier = Verifier::new(FakeEngine::trusty(), cfg());
    let suite = suite(ctx.path(), DOCKERFILE_SPEC);

    let first = verifier.verify_suite(&suite).await.unwrap();
    let second = verifier.verify_suite(&suite).await.unwrap();

    assert_ne!(first.run_id, second.run_id);
    assert_ne!(first.image_id, second.image_id);
    assert_eq!(verifier.engine().built().len(), 2);
}

#[tokio::test]
async fn auto_detects_family_from_os_release() {
    let ctx = build_context();
    let verifier = Verifier::new(FakeEngine::trusty(), cfg());

    let session = verifier
        .open(&ImageSpec::new(ctx.path()), OsFamily::Auto)
        .await
        .unwrap();

    assert_eq!(session.family(), OsFamily::Debian);
    session.close().await.unwrap();
}

#[tokio::test]
async fn unknown_distribution_fails_and_tears_down() {
    let ctx = build_context();
    let engine = FakeEngine::new().respond("cat /etc/os-release", "ID=plan9\n", 0);
    let verifier = Verifier::new(engine, cfg());

    let err = verifier
        .open(&ImageSpec::new(ctx.path()), OsFamily::Auto)
        .await
        .err()
        .unwrap();

    assert!(matches!(err, VerifyError::Execution { .. }));
    assert!(verifier.engine().running().is_empty());
}
