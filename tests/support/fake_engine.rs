// In-memory ContainerEngine that answers commands from a script and records
// every lifecycle call, so teardown can be asserted without a docker daemon.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Mutex,
    time::Duration,
};

use image_verify::{
    VerifyError,
    core::{ContainerEngine, ImageHandle, ImageSpec, InspectionResult, InstanceHandle},
    error::Result,
};

#[derive(Debug, Clone)]
pub enum Scripted {
    Output { stdout: String, exit_code: i32 },
    Hang,
    Broken,
}

#[derive(Debug, Default)]
struct State {
    next_id: usize,
    running: BTreeMap<String, String>,
    // Created but never started, like a `docker run` whose start failed.
    stopped: BTreeMap<String, String>,
    built: Vec<String>,
    removed_images: Vec<String>,
    removed_instances: Vec<String>,
    reaped: Vec<String>,
    executed: Vec<String>,
}

#[derive(Debug, Default)]
pub struct FakeEngine {
    script: HashMap<String, Scripted>,
    fail_build: bool,
    fail_start: bool,
    fail_start_after_create: bool,
    state: Mutex<State>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ubuntu 14.04 with python installed.
    pub fn trusty() -> Self {
        Self::new()
            .respond(
                "lsb_release -a",
                "Distributor ID:\tUbuntu\nDescription:\tUbuntu 14.04.6 LTS\nRelease:\t14.04\nCodename:\ttrusty\n",
                0,
            )
            .respond(
                "cat /etc/os-release",
                "NAME=\"Ubuntu\"\nVERSION=\"14.04.6 LTS, Trusty Tahr\"\nID=ubuntu\nID_LIKE=debian\n",
                0,
            )
            .respond(
                "dpkg-query -f '${Status} ${Version}\\n' -W python",
                "install ok installed 2.7.5-5ubuntu3\n",
                0,
            )
    }

    pub fn respond(mut self, command: &str, stdout: &str, exit_code: i32) -> Self {
        self.script.insert(
            command.to_string(),
            Scripted::Output {
                stdout: stdout.to_string(),
                exit_code,
            },
        );
        self
    }

    pub fn hang_on(mut self, command: &str) -> Self {
        self.script.insert(command.to_string(), Scripted::Hang);
        self
    }

    pub fn break_on(mut self, command: &str) -> Self {
        self.script.insert(command.to_string(), Scripted::Broken);
        self
    }

    pub fn failing_build(mut self) -> Self {
        self.fail_build = true;
        self
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Start creates the instance, then fails to run it.
    pub fn failing_start_after_create(mut self) -> Self {
        self.fail_start_after_create = true;
        self
    }

    pub fn running(&self) -> Vec<String> {
        self.state.lock().unwrap().running.keys().cloned().collect()
    }

    pub fn built(&self) -> Vec<String> {
        self.state.lock().unwrap().built.clone()
    }

    pub fn removed_images(&self) -> Vec<String> {
        self.state.lock().unwrap().removed_images.clone()
    }

    pub fn removed_instances(&self) -> Vec<String> {
        self.state.lock().unwrap().removed_instances.clone()
    }

    pub fn reaped(&self) -> Vec<String> {
        self.state.lock().unwrap().reaped.clone()
    }

    pub fn executed(&self) -> Vec<String> {
        self.state.lock().unwrap().executed.clone()
    }
}

impl ContainerEngine for FakeEngine {
    async fn build(&self, spec: &ImageSpec, _timeout: Duration) -> Result<ImageHandle> {
        if self.fail_build {
            return Err(VerifyError::Build {
                context: spec.context().to_path_buf(),
                message: "build exited with exit status: 1".into(),
            });
        }
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("sha256:{:064x}", state.next_id);
        state.built.push(id.clone());
        ImageHandle::new(spec.context(), id)
    }

    async fn start(
        &self,
        _image: &ImageHandle,
        run_id: &str,
        _timeout: Duration,
    ) -> Result<InstanceHandle> {
        if self.fail_start {
            return Err(VerifyError::Execution {
                message: "failed to start instance".into(),
            });
        }
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("instance-{}", state.next_id);
        if self.fail_start_after_create {
            state.stopped.insert(id, run_id.to_string());
            return Err(VerifyError::Execution {
                message: "exec: \"/bin/sh\": stat /bin/sh: no such file or directory".into(),
            });
        }
        state.running.insert(id.clone(), run_id.to_string());
        Ok(InstanceHandle::new(id))
    }

    async fn exec(
        &self,
        instance: &InstanceHandle,
        command: &str,
        timeout: Duration,
    ) -> Result<InspectionResult> {
        {
            let mut state = self.state.lock().unwrap();
            if !state.running.contains_key(instance.id()) {
                return Err(VerifyError::Execution {
                    message: format!("container {instance} is not running"),
                });
            }
            state.executed.push(command.to_string());
        }

        match self.script.get(command) {
            Some(Scripted::Output { stdout, exit_code }) => Ok(InspectionResult {
                command: command.to_string(),
                stdout: stdout.clone(),
                stderr: String::new(),
                exit_code: Some(*exit_code),
            }),
            Some(Scripted::Hang) => Err(VerifyError::Timeout {
                operation: format!("command `{command}`"),
                timeout,
            }),
            Some(Scripted::Broken) => Err(VerifyError::Execution {
                message: format!("cannot run `{command}`"),
            }),
            None => Ok(InspectionResult {
                command: command.to_string(),
                stdout: String::new(),
                stderr: format!("/bin/sh: 1: {command}: not found\n"),
                exit_code: Some(127),
            }),
        }
    }

    async fn remove_instance(&self, instance: &InstanceHandle) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.running.remove(instance.id());
        state.stopped.remove(instance.id());
        state.removed_instances.push(instance.id().to_string());
        Ok(())
    }

    async fn remove_image(&self, image: &ImageHandle) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .removed_images
            .push(image.id().to_string());
        Ok(())
    }

    async fn list_instances(
        &self,
        run_id: Option<&str>,
        include_stopped: bool,
    ) -> Result<Vec<InstanceHandle>> {
        let state = self.state.lock().unwrap();
        let stopped = state.stopped.iter().filter(|_| include_stopped);
        Ok(state
            .running
            .iter()
            .chain(stopped)
            .filter(|(_, run)| run_id.is_none_or(|r| r == run.as_str()))
            .map(|(id, _)| InstanceHandle::new(id.clone()))
            .collect())
    }

    async fn remove_run(&self, run_id: &str) -> Result<()> {
        for instance in self.list_instances(Some(run_id), true).await? {
            self.remove_instance(&instance).await?;
        }
        Ok(())
    }

    fn reap(&self, instance: &InstanceHandle, image: Option<&ImageHandle>) {
        let mut state = self.state.lock().unwrap();
        state.running.remove(instance.id());
        state.reaped.push(instance.id().to_string());
        if let Some(image) = image {
            state.removed_images.push(image.id().to_string());
        }
    }
}
