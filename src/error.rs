/// Fatal conditions of the controller. A target that does not exist is not one
/// of these, see [RuntimeOutcome::NotFound](crate::RuntimeOutcome::NotFound).
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("building image \"{image}\" failed with status {status:?}")]
    BuildFailure { image: String, status: Option<i32> },
    #[error("running container \"{container}\" failed with status {status:?}")]
    LaunchFailure {
        container: String,
        status: Option<i32>,
    },
    #[error("{action} of \"{target}\" failed with status {status:?}: {stderr}")]
    ActionFailure {
        action: &'static str,
        target: String,
        status: Option<i32>,
        stderr: String,
    },
    #[error("the container runtime could not be invoked: {0:?}")]
    Runtime(stacked_errors::Error),
}

impl From<stacked_errors::Error> for ControlError {
    fn from(e: stacked_errors::Error) -> Self {
        Self::Runtime(e)
    }
}

impl ControlError {
    /// The process exit code this error terminates the controller with. A
    /// build failure passes on the status of the build itself.
    pub fn exit_code(&self) -> u8 {
        match self {
            ControlError::BuildFailure {
                status: Some(status),
                ..
            } => u8::try_from(*status)
                .ok()
                .filter(|code| *code != 0)
                .unwrap_or(1),
            _ => 1,
        }
    }
}

/// The entrypoint could not replace itself with the server process
#[derive(Debug, thiserror::Error)]
#[error("could not execute the server program \"{program}\"")]
pub struct LaunchError {
    pub program: String,
    #[source]
    pub source: std::io::Error,
}
