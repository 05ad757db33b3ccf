//! Container runtime seam.
//!
//! The verifier only talks to a runtime through [`ContainerEngine`]; the
//! production implementation shells out to the docker CLI ([`DockerCli`]).

use std::{future::Future, time::Duration};

use crate::{
    core::{
        image::{ImageHandle, ImageSpec, InstanceHandle},
        inspect::InspectionResult,
    },
    error::Result,
};

pub mod docker;

pub use docker::DockerCli;

/// Label carried by every image and instance this tool creates.
pub const LABEL_MANAGED: &str = "image-verify.managed";
/// Label carrying the run id of the session that owns an instance.
pub const LABEL_RUN: &str = "image-verify.run";

pub trait ContainerEngine: Send + Sync {
    /// Build an image from an already validated spec.
    fn build(
        &self,
        spec: &ImageSpec,
        timeout: Duration,
    ) -> impl Future<Output = Result<ImageHandle>> + Send;

    /// Start one long-lived instance of `image`, labelled with `run_id`.
    fn start(
        &self,
        image: &ImageHandle,
        run_id: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<InstanceHandle>> + Send;

    /// Run `command` through `/bin/sh -c` inside `instance`.
    ///
    /// A non-zero exit of the command is returned as a normal result.
    fn exec(
        &self,
        instance: &InstanceHandle,
        command: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<InspectionResult>> + Send;

    /// Force-remove an instance. Removing one that is already gone succeeds.
    fn remove_instance(&self, instance: &InstanceHandle)
    -> impl Future<Output = Result<()>> + Send;

    fn remove_image(&self, image: &ImageHandle) -> impl Future<Output = Result<()>> + Send;

    /// Instances created by this tool, optionally narrowed to one run.
    ///
    /// Only running instances are listed unless `include_stopped` is set, in
    /// which case created and exited ones are listed too.
    fn list_instances(
        &self,
        run_id: Option<&str>,
        include_stopped: bool,
    ) -> impl Future<Output = Result<Vec<InstanceHandle>>> + Send;

    /// Force-remove every instance labelled with `run_id`, running or not.
    fn remove_run(&self, run_id: &str) -> impl Future<Output = Result<()>> + Send;

    /// Blocking best-effort teardown, for paths that cannot await (`Drop`).
    fn reap(&self, instance: &InstanceHandle, image: Option<&ImageHandle>);
}
