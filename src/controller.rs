//! The lifecycle controller: parses operator flags into an [Invocation] and
//! carries it out against a [ContainerRuntime].

mod actions;
mod args;

pub use actions::*;
use std::ffi::OsStr;

pub use args::*;
use tracing::{debug, error, info};

use crate::{ContainerRuntime, ControlError, ControllerConfig};

/// Carries out one parsed invocation. Nothing is retried or rolled back, e.g. a
/// failed run leaves the freshly built image in place.
pub async fn dispatch<R: ContainerRuntime>(
    runtime: &R,
    config: &ControllerConfig,
    invocation: &Invocation,
) -> Result<(), ControlError> {
    match invocation.mode {
        OperationMode::StopOnly => stop_action(runtime, &config.identity).await,
        OperationMode::RemoveOnly => remove_action(runtime, &config.identity).await,
        OperationMode::BuildOnly => build_action(runtime, config).await,
        OperationMode::BuildAndRun => {
            build_action(runtime, config).await?;
            run_action(runtime, config, invocation.acceleration).await
        }
    }
}

/// Parses `args` (not including the program name), dispatches, and returns
/// the exit code for the process
pub async fn run<R, I, S>(runtime: &R, config: &ControllerConfig, args: I) -> u8
where
    R: ContainerRuntime,
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let invocation = Invocation::parse(args);
    if !invocation.ignored.is_empty() {
        debug!("ignoring unrecognized arguments {:?}", invocation.ignored);
    }
    info!(
        "{:?} for \"{}\" ({:?})",
        invocation.mode, config.identity.name, invocation.acceleration
    );
    match dispatch(runtime, config, &invocation).await {
        Ok(()) => 0,
        Err(e) => {
            error!("{e}");
            e.exit_code()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        runtime::fake::{FakeRuntime, RuntimeCall},
        RunSpec,
    };

    fn build_call() -> RuntimeCall {
        RuntimeCall::BuildImage {
            image: "omniparse".to_owned(),
            context: ".".to_owned(),
        }
    }

    #[tokio::test]
    async fn default_builds_then_runs_on_gpu() {
        let runtime = FakeRuntime::default();
        let config = ControllerConfig::default();
        assert_eq!(run(&runtime, &config, ["--unknown"]).await, 0);
        assert_eq!(runtime.calls(), vec![
            build_call(),
            RuntimeCall::StopContainer("omniparse".to_owned()),
            RuntimeCall::RemoveContainer("omniparse".to_owned()),
            RuntimeCall::RunContainer(RunSpec::new(&config, AccelerationMode::Gpu)),
        ]);
    }

    #[tokio::test]
    async fn cpu_run_has_no_gpu_request() {
        let runtime = FakeRuntime::default();
        assert_eq!(
            run(&runtime, &ControllerConfig::default(), ["--gpu", "--cpu"]).await,
            0
        );
        match runtime.calls().last() {
            Some(RuntimeCall::RunContainer(spec)) => assert!(!spec.gpus),
            other => panic!("unexpected last call {other:?}"),
        }
    }

    #[tokio::test]
    async fn build_only_never_runs() {
        let runtime = FakeRuntime::default();
        assert_eq!(
            run(&runtime, &ControllerConfig::default(), ["--build"]).await,
            0
        );
        assert_eq!(runtime.calls(), vec![build_call()]);
        assert!(runtime.has_image("omniparse"));
    }

    #[tokio::test]
    async fn build_failure_exits_nonzero_without_running() {
        let runtime = FakeRuntime {
            build_failure: Some(1),
            ..Default::default()
        };
        assert_ne!(run(&runtime, &ControllerConfig::default(), [""; 0]).await, 0);
        assert_eq!(runtime.calls(), vec![build_call()]);
    }

    #[tokio::test]
    async fn stop_only_on_absent_container() {
        let runtime = FakeRuntime::default();
        let config = ControllerConfig::default();
        assert_eq!(run(&runtime, &config, ["--stop", "--build"]).await, 0);
        assert_eq!(run(&runtime, &config, ["--stop"]).await, 0);
        assert_eq!(runtime.calls(), vec![
            RuntimeCall::StopContainer("omniparse".to_owned()),
            RuntimeCall::RemoveContainer("omniparse".to_owned()),
            RuntimeCall::StopContainer("omniparse".to_owned()),
            RuntimeCall::RemoveContainer("omniparse".to_owned()),
        ]);
    }

    #[tokio::test]
    async fn remove_only_attempts_everything() {
        let runtime = FakeRuntime::default();
        assert_eq!(run(&runtime, &ControllerConfig::default(), ["--rm"]).await, 0);
        assert_eq!(runtime.calls(), vec![
            RuntimeCall::StopContainer("omniparse".to_owned()),
            RuntimeCall::RemoveContainer("omniparse".to_owned()),
            RuntimeCall::RemoveImage("omniparse".to_owned()),
        ]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_utf8_argument_does_not_change_the_mode() {
        use std::{ffi::OsString, os::unix::ffi::OsStringExt};

        let runtime = FakeRuntime::default();
        let args = [OsString::from("--stop"), OsString::from_vec(vec![0xff])];
        assert_eq!(run(&runtime, &ControllerConfig::default(), args).await, 0);
        assert_eq!(runtime.calls(), vec![
            RuntimeCall::StopContainer("omniparse".to_owned()),
            RuntimeCall::RemoveContainer("omniparse".to_owned()),
        ]);
    }

    #[tokio::test]
    async fn failed_run_keeps_the_built_image() {
        let runtime = FakeRuntime {
            run_failure: Some(125),
            ..Default::default()
        };
        assert_eq!(run(&runtime, &ControllerConfig::default(), ["--cpu"]).await, 1);
        assert!(runtime.has_image("omniparse"));
    }
}
