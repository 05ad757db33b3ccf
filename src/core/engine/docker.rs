use std::{
    path::{Path, PathBuf},
    process::{Output, Stdio},
    time::Duration,
};

use tokio::process::Command;
use tracing::{debug, warn};

use super::{ContainerEngine, LABEL_MANAGED, LABEL_RUN};
use crate::{
    config::VerifierConfig,
    core::{
        image::{ImageHandle, ImageSpec, InstanceHandle},
        inspect::InspectionResult,
    },
    error::{Result, VerifyError},
};

/// Upper bound for housekeeping calls (`rm`, `rmi`, `ps`).
const HOUSEKEEPING_TIMEOUT: Duration = Duration::from_secs(60);

/// Shell every instance runs and every inspection command goes through.
const SHELL: &str = "/bin/sh";

/// Why a runtime invocation produced no output.
#[derive(Debug)]
enum Failure {
    Launch(String),
    TimedOut,
}

/// [`ContainerEngine`] backed by the docker CLI.
#[derive(Debug, Clone)]
pub struct DockerCli {
    bin: PathBuf,
}

impl DockerCli {
    /// Resolve the runtime binary from config, falling back to `docker` on `PATH`.
    ///
    /// # Errors
    /// Returns [`VerifyError::Execution`] if no runtime binary can be found.
    pub fn from_config(cfg: &VerifierConfig) -> Result<Self> {
        let bin = match &cfg.docker_bin {
            Some(bin) => bin.clone(),
            None => which::which("docker").map_err(|_| {
                VerifyError::execution("docker not found on PATH; set IMAGE_VERIFY_DOCKER")
            })?,
        };
        Ok(Self::with_binary(bin))
    }

    pub fn with_binary(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }

    pub fn binary(&self) -> &Path {
        &self.bin
    }

    async fn output(
        &self,
        args: &[String],
        timeout: Duration,
    ) -> std::result::Result<Output, Failure> {
        debug!(bin = %self.bin.display(), ?args, "invoking runtime");
        let child = Command::new(&self.bin)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Failure::Launch(format!("failed to run {}: {e}", self.bin.display())))?;

        // Dropping the future on timeout drops the child, which kills it.
        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(Failure::Launch(format!(
                "failed to collect output of {}: {e}",
                self.bin.display()
            ))),
            Err(_) => Err(Failure::TimedOut),
        }
    }

    async fn housekeeping(&self, args: Vec<String>, what: &str) -> Result<Output> {
        self.output(&args, HOUSEKEEPING_TIMEOUT)
            .await
            .map_err(|failure| match failure {
                Failure::Launch(message) => VerifyError::execution(message),
                Failure::TimedOut => VerifyError::timeout(what, HOUSEKEEPING_TIMEOUT),
            })
    }
}

impl ContainerEngine for DockerCli {
    async fn build(&self, spec: &ImageSpec, timeout: Duration) -> Result<ImageHandle> {
        let args = build_args(spec);
        let output = self
            .output(&args, timeout)
            .await
            .map_err(|failure| match failure {
                Failure::Launch(message) => VerifyError::build(spec.context(), message),
                Failure::TimedOut => VerifyError::timeout("image build", timeout),
            })?;

        if !output.status.success() {
            return Err(VerifyError::build(
                spec.context(),
                format!(
                    "build exited with {}: {}",
                    output.status,
                    tail(&String::from_utf8_lossy(&output.stderr), 20)
                ),
            ));
        }

        // `--quiet` prints only the image id, but some builders emit progress first.
        let stdout = String::from_utf8_lossy(&output.stdout);
        let id = stdout.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
        ImageHandle::new(spec.context(), id)
    }

    async fn start(
        &self,
        image: &ImageHandle,
        run_id: &str,
        timeout: Duration,
    ) -> Result<InstanceHandle> {
        let args = start_args(image, run_id);
        let output = self
            .output(&args, timeout)
            .await
            .map_err(|failure| match failure {
                Failure::Launch(message) => VerifyError::execution(message),
                Failure::TimedOut => VerifyError::timeout("instance start", timeout),
            })?;

        if !output.status.success() {
            return Err(VerifyError::execution(format!(
                "failed to start instance of {}: {}",
                image.short_id(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if id.is_empty() {
            return Err(VerifyError::execution("runtime returned an empty instance id"));
        }
        Ok(InstanceHandle::new(id))
    }

    async fn exec(
        &self,
        instance: &InstanceHandle,
        command: &str,
        timeout: Duration,
    ) -> Result<InspectionResult> {
        let args = vec![
            "exec".to_string(),
            instance.id().to_string(),
            SHELL.to_string(),
            "-c".to_string(),
            command.to_string(),
        ];
        let output = self
            .output(&args, timeout)
            .await
            .map_err(|failure| match failure {
                Failure::Launch(message) => VerifyError::execution(message),
                Failure::TimedOut => VerifyError::timeout(format!("command `{command}`"), timeout),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if is_runtime_error(&stderr) {
            return Err(VerifyError::execution(format!(
                "cannot run `{command}` in {}: {}",
                instance,
                stderr.trim()
            )));
        }

        Ok(InspectionResult {
            command: command.to_string(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr,
            exit_code: output.status.code(),
        })
    }

    async fn remove_instance(&self, instance: &InstanceHandle) -> Result<()> {
        let args = vec![
            "rm".to_string(),
            "--force".to_string(),
            "--volumes".to_string(),
            instance.id().to_string(),
        ];
        let output = self.housekeeping(args, "instance removal").await?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        if output.status.success() || is_missing(&stderr) {
            debug!(instance = %instance, "instance removed");
            Ok(())
        } else {
            Err(VerifyError::execution(format!(
                "failed to remove instance {instance}: {}",
                stderr.trim()
            )))
        }
    }

    async fn remove_image(&self, image: &ImageHandle) -> Result<()> {
        let args = vec!["rmi".to_string(), "--force".to_string(), image.id().to_string()];
        let output = self.housekeeping(args, "image removal").await?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        if output.status.success() || is_missing(&stderr) {
            debug!(image = %image.short_id(), "image removed");
            Ok(())
        } else {
            Err(VerifyError::execution(format!(
                "failed to remove image {}: {}",
                image.short_id(),
                stderr.trim()
            )))
        }
    }

    async fn list_instances(
        &self,
        run_id: Option<&str>,
        include_stopped: bool,
    ) -> Result<Vec<InstanceHandle>> {
        let args = list_args(run_id, include_stopped);
        let output = self.housekeeping(args, "instance listing").await?;
        if !output.status.success() {
            return Err(VerifyError::execution(format!(
                "failed to list instances: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(InstanceHandle::new)
            .collect())
    }

    async fn remove_run(&self, run_id: &str) -> Result<()> {
        // `run --detach` creates the container before starting it, so a failed
        // or timed-out start can leave one behind in any state.
        let mut first_err = None;
        for instance in self.list_instances(Some(run_id), true).await? {
            if let Err(e) = self.remove_instance(&instance).await {
                warn!(instance = %instance, run = %run_id, "failed to remove instance: {e}");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn reap(&self, instance: &InstanceHandle, image: Option<&ImageHandle>) {
        let status = std::process::Command::new(&self.bin)
            .args(["rm", "--force", "--volumes", instance.id()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match status {
            Ok(s) if s.success() => debug!(instance = %instance, "instance reaped"),
            Ok(s) => warn!(instance = %instance, "reaping instance exited with {s}"),
            Err(e) => warn!(instance = %instance, "failed to reap instance: {e}"),
        }

        if let Some(image) = image {
            let status = std::process::Command::new(&self.bin)
                .args(["rmi", "--force", image.id()])
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
            match status {
                Ok(s) if s.success() => debug!(image = %image.short_id(), "image reaped"),
                Ok(s) => warn!(image = %image.short_id(), "reaping image exited with {s}"),
                Err(e) => warn!(image = %image.short_id(), "failed to reap image: {e}"),
            }
        }
    }
}

fn build_args(spec: &ImageSpec) -> Vec<String> {
    let mut args = vec![
        "build".to_string(),
        "--quiet".to_string(),
        "--rm".to_string(),
        "--label".to_string(),
        format!("{LABEL_MANAGED}=true"),
        "--file".to_string(),
        spec.dockerfile_path().to_string_lossy().into_owned(),
    ];
    if spec.no_cache() {
        args.push("--no-cache".to_string());
    }
    if let Some(tag) = spec.tag() {
        args.push("--tag".to_string());
        args.push(tag.to_string());
    }
    for (key, value) in spec.build_args() {
        args.push("--build-arg".to_string());
        args.push(format!("{key}={value}"));
    }
    args.push(spec.context().to_string_lossy().into_owned());
    args
}

fn start_args(image: &ImageHandle, run_id: &str) -> Vec<String> {
    // An interactive shell with stdin held open keeps the instance alive
    // until it is removed, whatever the image's default command is.
    vec![
        "run".to_string(),
        "--detach".to_string(),
        "--interactive".to_string(),
        "--label".to_string(),
        format!("{LABEL_MANAGED}=true"),
        "--label".to_string(),
        format!("{LABEL_RUN}={run_id}"),
        "--entrypoint".to_string(),
        SHELL.to_string(),
        image.id().to_string(),
    ]
}

fn list_args(run_id: Option<&str>, include_stopped: bool) -> Vec<String> {
    let mut args = vec!["ps".to_string()];
    if include_stopped {
        args.push("--all".to_string());
    }
    args.extend([
        "--quiet".to_string(),
        "--no-trunc".to_string(),
        "--filter".to_string(),
        format!("label={LABEL_MANAGED}=true"),
    ]);
    if let Some(run_id) = run_id {
        args.push("--filter".to_string());
        args.push(format!("label={LABEL_RUN}={run_id}"));
    }
    args
}

/// Errors reported by the runtime itself rather than by the command it ran.
fn is_runtime_error(stderr: &str) -> bool {
    stderr.starts_with("Error response from daemon:")
        || stderr.starts_with("Error: No such container")
        || stderr.contains("OCI runtime exec failed")
}

fn is_missing(stderr: &str) -> bool {
    stderr.contains("No such container") || stderr.contains("No such image")
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}
