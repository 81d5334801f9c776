//! Runs the controller actions against a real container runtime, using a
//! throwaway identity and a tiny image instead of the OmniParse server. Run
//! with `cargo r --bin lifecycle` (add `-- --runtime podman` for podman).

use clap::Parser;
use omniparse_launcher::{
    controller::{self, build_action, remove_action, run_action, stop_action},
    AccelerationMode, CliRuntime, ContainerIdentity, ContainerRuntime, ControllerConfig,
    PortBinding, RuntimeOutcome,
};
use stacked_errors::{ensure, ensure_eq, Result, StackableErr};
use tokio::fs;
use tracing::info;

const CONTEXT_DIR: &str = "./logs/lifecycle";
const DOCKERFILE: &str = r#"FROM alpine:3.21

# prints the environment payload and exits, the run is attached so this shows up
# in the output
CMD ["sh", "-c", "echo HOST=$HOST PORT=$PORT DOCUMENTS=$DOCUMENTS MEDIA=$MEDIA WEB=$WEB"]
"#;

#[derive(Parser, Debug)]
#[command(about)]
struct Args {
    /// The container runtime program
    #[arg(long, default_value_t = String::from("docker"))]
    runtime: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    fs::create_dir_all(CONTEXT_DIR).await.stack()?;
    fs::write(format!("{CONTEXT_DIR}/Dockerfile"), DOCKERFILE)
        .await
        .stack()?;

    let config = ControllerConfig {
        identity: ContainerIdentity::new(
            "omniparse_launcher_lifecycle",
            "omniparse_launcher_lifecycle",
        ),
        ports: PortBinding {
            host_port: 18000,
            container_port: 8000,
        },
        build_context: CONTEXT_DIR.to_owned(),
        runtime_program: args.runtime.clone(),
    };
    let runtime = CliRuntime::new(&config.runtime_program);

    info!("\n\nstopping a container that never existed, twice\n");
    stop_action(&runtime, &config.identity).await.stack()?;
    stop_action(&runtime, &config.identity).await.stack()?;

    info!("\n\nremoving an identity that never existed\n");
    remove_action(&runtime, &config.identity).await.stack()?;
    ensure_eq!(
        runtime.remove_image(&config.identity.image).await?,
        RuntimeOutcome::NotFound
    );

    info!("\n\nbuilding and running on the CPU\n");
    build_action(&runtime, &config).await.stack()?;
    run_action(&runtime, &config, AccelerationMode::Cpu)
        .await
        .stack()?;
    // the container removed itself on exit
    ensure_eq!(
        runtime.remove_container(&config.identity.name).await?,
        RuntimeOutcome::NotFound
    );

    info!("\n\nfull invocation through `controller::run`\n");
    ensure_eq!(
        controller::run(&runtime, &config, ["--cpu", "--not-a-flag"]).await,
        0
    );
    ensure_eq!(controller::run(&runtime, &config, ["--stop"]).await, 0);
    ensure_eq!(controller::run(&runtime, &config, ["--rm"]).await, 0);
    ensure_eq!(controller::run(&runtime, &config, ["--rm"]).await, 0);

    info!("\n\na broken build context fails the build\n");
    let broken = ControllerConfig {
        build_context: format!("{CONTEXT_DIR}/nonexistent"),
        ..config.clone()
    };
    ensure!(controller::run(&runtime, &broken, ["--cpu"]).await != 0);

    fs::remove_dir_all(CONTEXT_DIR).await.stack()?;
    info!("test completed successfully");
    Ok(())
}
