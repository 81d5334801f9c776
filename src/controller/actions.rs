use tracing::{debug, info};

use crate::{
    AccelerationMode, ContainerIdentity, ContainerRuntime, ControlError, ControllerConfig,
    RunSpec, RuntimeOutcome,
};

/// Accepts `Success` and `NotFound`, turns anything else into an
/// `ActionFailure`
fn tolerate_absent(
    outcome: RuntimeOutcome,
    action: &'static str,
    target: &str,
) -> Result<(), ControlError> {
    match outcome {
        RuntimeOutcome::Success => Ok(()),
        RuntimeOutcome::NotFound => {
            debug!("{action}: \"{target}\" does not exist, nothing to do");
            Ok(())
        }
        RuntimeOutcome::Failure { status, stderr } => Err(ControlError::ActionFailure {
            action,
            target: target.to_owned(),
            status,
            stderr,
        }),
    }
}

/// Stops and then removes the container, succeeding if either target is
/// already gone
pub async fn stop_action<R: ContainerRuntime>(
    runtime: &R,
    identity: &ContainerIdentity,
) -> Result<(), ControlError> {
    info!("stopping container \"{}\"", identity.name);
    let outcome = runtime.stop_container(&identity.name).await?;
    tolerate_absent(outcome, "stop", &identity.name)?;
    let outcome = runtime.remove_container(&identity.name).await?;
    tolerate_absent(outcome, "container removal", &identity.name)
}

/// [stop_action] followed by deleting the image, which may also be absent
pub async fn remove_action<R: ContainerRuntime>(
    runtime: &R,
    identity: &ContainerIdentity,
) -> Result<(), ControlError> {
    stop_action(runtime, identity).await?;
    info!("removing image \"{}\"", identity.image);
    let outcome = runtime.remove_image(&identity.image).await?;
    tolerate_absent(outcome, "image removal", &identity.image)
}

/// Builds the image from the build context. Any unsuccessful build is a
/// `BuildFailure`, there are no retries.
pub async fn build_action<R: ContainerRuntime>(
    runtime: &R,
    config: &ControllerConfig,
) -> Result<(), ControlError> {
    let image = &config.identity.image;
    info!("building image \"{image}\" from \"{}\"", config.build_context);
    match runtime.build_image(image, &config.build_context).await? {
        RuntimeOutcome::Success => Ok(()),
        RuntimeOutcome::NotFound => Err(ControlError::BuildFailure {
            image: image.clone(),
            status: None,
        }),
        RuntimeOutcome::Failure { status, .. } => Err(ControlError::BuildFailure {
            image: image.clone(),
            status,
        }),
    }
}

/// Stops any previous container of the same identity, then runs a new
/// self-removing one
pub async fn run_action<R: ContainerRuntime>(
    runtime: &R,
    config: &ControllerConfig,
    acceleration: AccelerationMode,
) -> Result<(), ControlError> {
    stop_action(runtime, &config.identity).await?;
    let spec = RunSpec::new(config, acceleration);
    info!(
        "running container \"{}\" from image \"{}\" on port {} ({acceleration:?})",
        spec.name, spec.image, spec.ports
    );
    match runtime.run_container(&spec).await? {
        RuntimeOutcome::Success => Ok(()),
        RuntimeOutcome::NotFound => Err(ControlError::LaunchFailure {
            container: spec.name,
            status: None,
        }),
        RuntimeOutcome::Failure { status, .. } => Err(ControlError::LaunchFailure {
            container: spec.name,
            status,
        }),
    }
}
