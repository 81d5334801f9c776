//! The contract the controller needs from a container runtime.

mod cli;
#[cfg(test)]
pub(crate) mod fake;

pub use cli::*;
use stacked_errors::Result;

use crate::{
    AccelerationMode, CommandResult, ControllerConfig, PortBinding, RuntimeEnvironmentPayload,
};

/// What a runtime reported for one operation. `NotFound` means the target did
/// not exist, which idempotent callers accept as success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeOutcome {
    Success,
    NotFound,
    Failure { status: Option<i32>, stderr: String },
}

impl RuntimeOutcome {
    /// Classifies a finished runtime command. A failed command counts as
    /// `NotFound` if its stderr contains any of `not_found_markers`, compared
    /// case-insensitively.
    pub fn from_command_result(comres: &CommandResult, not_found_markers: &[&str]) -> Self {
        if comres.successful() {
            return RuntimeOutcome::Success
        }
        let stderr = comres.stderr_as_utf8_lossy().trim().to_owned();
        let lowercase = stderr.to_lowercase();
        if not_found_markers
            .iter()
            .any(|marker| lowercase.contains(marker))
        {
            RuntimeOutcome::NotFound
        } else {
            RuntimeOutcome::Failure {
                status: comres.code(),
                stderr,
            }
        }
    }
}

/// Everything a run-container request carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    pub name: String,
    pub image: String,
    pub ports: PortBinding,
    pub env: Vec<(String, String)>,
    /// Request GPU passthrough
    pub gpus: bool,
    /// Have the runtime delete the container when it exits
    pub remove_on_exit: bool,
}

impl RunSpec {
    /// The run of the configured identity, with the standard environment
    /// payload and GPU passthrough depending on `acceleration`
    pub fn new(config: &ControllerConfig, acceleration: AccelerationMode) -> Self {
        let payload = RuntimeEnvironmentPayload::for_container_port(config.ports.container_port);
        Self {
            name: config.identity.name.clone(),
            image: config.identity.image.clone(),
            ports: config.ports,
            env: payload
                .to_env_vars()
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v))
                .collect(),
            gpus: acceleration == AccelerationMode::Gpu,
            remove_on_exit: true,
        }
    }
}

/// Operations of a container runtime. Each call blocks until the runtime
/// reports completion. `Err` is reserved for failing to talk to the runtime
/// at all, anything the runtime itself reports is a [RuntimeOutcome].
#[allow(async_fn_in_trait)]
pub trait ContainerRuntime {
    async fn build_image(&self, image: &str, context: &str) -> Result<RuntimeOutcome>;

    /// Runs the container attached, returning when it exits
    async fn run_container(&self, spec: &RunSpec) -> Result<RuntimeOutcome>;

    async fn stop_container(&self, name: &str) -> Result<RuntimeOutcome>;

    async fn remove_container(&self, name: &str) -> Result<RuntimeOutcome>;

    async fn remove_image(&self, image: &str) -> Result<RuntimeOutcome>;
}
