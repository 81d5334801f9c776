use std::process::ExitCode;

use omniparse_launcher::{controller, std_init, CliRuntime, ControllerConfig};

/// Builds, runs, stops, or removes the OmniParse container.
///
/// `omniparse-ctl [--build | --stop | --rm] [--gpu | --cpu]`, with no mode flag
/// the image is built and then run. Unrecognized arguments are ignored.
#[tokio::main]
async fn main() -> ExitCode {
    std_init();
    let config = ControllerConfig::from_process_env();
    let runtime = CliRuntime::new(&config.runtime_program);
    ExitCode::from(controller::run(&runtime, &config, std::env::args_os().skip(1)).await)
}
