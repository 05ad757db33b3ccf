use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    config::VerifierConfig,
    core::{
        engine::ContainerEngine,
        image::{ImageHandle, ImageSpec, InstanceHandle},
        inspect::InspectionResult,
        os::{OS_RELEASE_COMMAND, OsFamily, OsInspector},
    },
    error::{Result, VerifyError},
};

/// A freshly built image with one running instance.
///
/// [`Session::close`] tears both down. A session dropped without being closed
/// (early return, panic, cancelled future) is reaped synchronously in `Drop`.
pub struct Session<'e, E: ContainerEngine> {
    engine: &'e E,
    run_id: String,
    image: ImageHandle,
    instance: InstanceHandle,
    inspector: Option<&'static dyn OsInspector>,
    exec_timeout: Duration,
    keep_image: bool,
    closed: bool,
}

impl<'e, E: ContainerEngine> Session<'e, E> {
    /// Build `spec`, start an instance of it and resolve the OS inspector.
    ///
    /// # Errors
    /// Returns the build, start or detection error. Whatever was created
    /// before the failure is removed again.
    pub async fn open(
        engine: &'e E,
        spec: &ImageSpec,
        family: OsFamily,
        cfg: &VerifierConfig,
    ) -> Result<Self> {
        spec.validate()?;

        let run_id = Uuid::new_v4().simple().to_string();
        info!(context = %spec.context().display(), run = %run_id, "building image");
        let image = engine.build(spec, cfg.build_timeout).await?;
        debug!(image = %image.short_id(), "image built");

        let instance = match engine.start(&image, &run_id, cfg.exec_timeout).await {
            Ok(instance) => instance,
            Err(e) => {
                if let Err(rm) = engine.remove_run(&run_id).await {
                    warn!(run = %run_id, "failed to remove instances of failed start: {rm}");
                }
                if !cfg.keep_image
                    && let Err(rm) = engine.remove_image(&image).await
                {
                    warn!(image = %image.short_id(), "failed to remove image: {rm}");
                }
                return Err(e);
            }
        };
        info!(instance = %instance, image = %image.short_id(), "instance started");

        let mut session = Self {
            engine,
            run_id,
            image,
            instance,
            inspector: family.inspector(),
            exec_timeout: cfg.exec_timeout,
            keep_image: cfg.keep_image,
            closed: false,
        };

        if session.inspector.is_none() {
            match session.detect_inspector().await {
                Ok(inspector) => session.inspector = Some(inspector),
                Err(e) => {
                    if let Err(close) = session.close().await {
                        warn!("teardown after failed detection: {close}");
                    }
                    return Err(e);
                }
            }
        }

        Ok(session)
    }

    async fn detect_inspector(&self) -> Result<&'static dyn OsInspector> {
        let release = self.run(OS_RELEASE_COMMAND).await?;
        let family = OsFamily::detect(&release.stdout).ok_or_else(|| {
            VerifyError::execution(format!(
                "cannot determine OS family from /etc/os-release (exit {:?})",
                release.exit_code
            ))
        })?;
        debug!(%family, "detected OS family");
        family
            .inspector()
            .ok_or_else(|| VerifyError::execution("detected family has no inspector"))
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub const fn image(&self) -> &ImageHandle {
        &self.image
    }

    pub const fn instance(&self) -> &InstanceHandle {
        &self.instance
    }

    pub fn family(&self) -> OsFamily {
        self.inspector.map_or(OsFamily::Auto, |i| i.family())
    }

    fn inspector(&self) -> Result<&'static dyn OsInspector> {
        self.inspector
            .ok_or_else(|| VerifyError::execution("OS family not resolved for this session"))
    }

    /// Run `command` inside the instance.
    ///
    /// # Errors
    /// Returns [`VerifyError::Execution`] if the command cannot be invoked and
    /// [`VerifyError::Timeout`] if it exceeds the exec timeout. A non-zero
    /// exit code is not an error.
    pub async fn run(&self, command: &str) -> Result<InspectionResult> {
        debug!(instance = %self.instance, command, "running inspection command");
        let result = self
            .engine
            .exec(&self.instance, command, self.exec_timeout)
            .await?;
        debug!(exit = ?result.exit_code, "inspection command finished");
        Ok(result)
    }

    /// Output of the family's OS version command.
    ///
    /// # Errors
    /// See [`Session::run`].
    pub async fn os_version(&self) -> Result<InspectionResult> {
        let command = self.inspector()?.os_version_command();
        self.run(&command).await
    }

    /// Run the family's package query for `package` and return its result
    /// alongside the interpretation.
    ///
    /// # Errors
    /// See [`Session::run`].
    pub async fn query_package(&self, package: &str) -> Result<(bool, InspectionResult)> {
        let inspector = self.inspector()?;
        let result = self.run(&inspector.package_query_command(package)).await?;
        Ok((inspector.package_installed(package, &result), result))
    }

    /// True iff `package` is installed in the instance.
    ///
    /// # Errors
    /// See [`Session::run`].
    pub async fn assert_package_installed(&self, package: &str) -> Result<bool> {
        Ok(self.query_package(package).await?.0)
    }

    /// Remove the instance, then the image unless it is kept.
    ///
    /// # Errors
    /// Returns the first removal error; removal of the image is still
    /// attempted when removing the instance failed.
    pub async fn close(mut self) -> Result<()> {
        self.closed = true;
        let instance = self.engine.remove_instance(&self.instance).await;
        let image = if self.keep_image {
            Ok(())
        } else {
            self.engine.remove_image(&self.image).await
        };
        info!(instance = %self.instance, "session closed");
        instance.and(image)
    }
}

impl<E: ContainerEngine> Drop for Session<'_, E> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        warn!(instance = %self.instance, "session dropped without close; reaping");
        let image = (!self.keep_image).then_some(&self.image);
        self.engine.reap(&self.instance, image);
    }
}
