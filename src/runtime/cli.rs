use std::ffi::OsStr;

use stacked_errors::{Result, StackableErr};
use tracing::{debug, warn};

use crate::{next_terminal_color, Command, ContainerRuntime, RunSpec, RuntimeOutcome};

/// Lowercase stderr fragments that mean the container did not exist. The last
/// one happens when stopping a self-removing container races its removal.
pub const CONTAINER_NOT_FOUND: &[&str] = &[
    "no such container",
    "no container with name or id",
    "is already in progress",
];

/// Lowercase stderr fragments that mean the image did not exist
pub const IMAGE_NOT_FOUND: &[&str] = &["no such image", "image not known"];

/// Exit statuses of `run` that come from the runtime itself failing to start
/// the container (daemon error, command not executable, command not found).
/// Any other status is the exit status of the container.
pub const LAUNCH_FAILURE_STATUSES: &[i32] = &[125, 126, 127];

/// A [ContainerRuntime] driven through the "docker" command line, or any
/// program accepting the same subcommands (e.g. "podman"). Build output is
/// forwarded with a line prefix, the run is attached to this process's
/// standard streams, and everything else is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliRuntime {
    pub program: String,
}

impl Default for CliRuntime {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl CliRuntime {
    pub fn new(program: impl AsRef<str>) -> Self {
        Self {
            program: program.as_ref().to_owned(),
        }
    }

    fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Command::new(&self.program).args(args)
    }

    async fn run_recorded(&self, command: Command, not_found: &[&str]) -> Result<RuntimeOutcome> {
        debug!("CliRuntime command: {command:?}");
        let comres = command
            .run_to_completion()
            .await
            .stack_err_locationless("CliRuntime -> could not run the container runtime")?;
        Ok(RuntimeOutcome::from_command_result(&comres, not_found))
    }
}

/// Reclassifies the outcome of an attached `run`. The container exiting with
/// a non-zero status (e.g. 130 after Ctrl-C stops the server) is the run
/// ending, not a launch failure.
pub fn launch_outcome(name: &str, outcome: RuntimeOutcome) -> RuntimeOutcome {
    match outcome {
        RuntimeOutcome::Failure { status, .. }
            if !status.is_some_and(|status| LAUNCH_FAILURE_STATUSES.contains(&status)) =>
        {
            warn!("container \"{name}\" exited with status {status:?}");
            RuntimeOutcome::Success
        }
        outcome => outcome,
    }
}

/// The arguments of `build` for `image` in `context`
pub fn build_args(image: &str, context: &str) -> Vec<String> {
    vec![
        "build".to_owned(),
        "-t".to_owned(),
        image.to_owned(),
        context.to_owned(),
    ]
}

/// The arguments of `run` for `spec`
pub fn run_args(spec: &RunSpec) -> Vec<String> {
    let mut args = vec!["run".to_owned()];
    if spec.remove_on_exit {
        args.push("--rm".to_owned());
    }
    args.push("--name".to_owned());
    args.push(spec.name.clone());
    args.push("-p".to_owned());
    args.push(spec.ports.to_string());
    for (key, val) in &spec.env {
        args.push("-e".to_owned());
        args.push(format!("{key}={val}"));
    }
    if spec.gpus {
        args.push("--gpus".to_owned());
        args.push("all".to_owned());
    }
    args.push(spec.image.clone());
    args
}

impl ContainerRuntime for CliRuntime {
    async fn build_image(&self, image: &str, context: &str) -> Result<RuntimeOutcome> {
        let command = self
            .command(build_args(image, context))
            .debug(true)
            .debug_line_prefix(Some(
                owo_colors::OwoColorize::color(&format!("{image} build | "), next_terminal_color())
                    .to_string(),
            ));
        self.run_recorded(command, &[])
            .await
            .stack_err_with_locationless(|| format!("CliRuntime::build_image({image}, {context})"))
    }

    async fn run_container(&self, spec: &RunSpec) -> Result<RuntimeOutcome> {
        // attached with inherited standard streams, the server logs go straight
        // to the terminal and stdin reaches the container
        let command = self.command(run_args(spec)).recording(false);
        let outcome = self
            .run_recorded(command, &[])
            .await
            .stack_err_with_locationless(|| format!("CliRuntime::run_container({})", spec.name))?;
        Ok(launch_outcome(&spec.name, outcome))
    }

    async fn stop_container(&self, name: &str) -> Result<RuntimeOutcome> {
        self.run_recorded(self.command(["stop", name]), CONTAINER_NOT_FOUND)
            .await
            .stack_err_with_locationless(|| format!("CliRuntime::stop_container({name})"))
    }

    async fn remove_container(&self, name: &str) -> Result<RuntimeOutcome> {
        self.run_recorded(self.command(["rm", name]), CONTAINER_NOT_FOUND)
            .await
            .stack_err_with_locationless(|| format!("CliRuntime::remove_container({name})"))
    }

    async fn remove_image(&self, image: &str) -> Result<RuntimeOutcome> {
        self.run_recorded(self.command(["rmi", image]), IMAGE_NOT_FOUND)
            .await
            .stack_err_with_locationless(|| format!("CliRuntime::remove_image({image})"))
    }
}
