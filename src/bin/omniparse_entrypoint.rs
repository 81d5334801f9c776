use clap::Parser;
use omniparse_launcher::{
    entrypoint::{translate_and_exec, EntrypointSettings, ServerInvocation},
    std_init,
};
use stacked_errors::Result;

/// Container entrypoint, reads HOST, PORT, DOCUMENTS, MEDIA, WEB, and RELOAD
/// from the environment and replaces itself with the server
#[derive(Parser, Debug)]
#[command(about)]
struct Args {
    /// Print the server command line instead of running it
    #[arg(long, env = "OMNIPARSE_ENTRYPOINT_DRY_RUN")]
    dry_run: bool,
    /// The server program and its leading arguments, "python server.py" if
    /// not given
    #[arg(last = true)]
    server_command: Vec<String>,
}

fn main() -> Result<()> {
    std_init();
    let args = Args::parse();
    let settings = EntrypointSettings::from_process_env()?;
    if args.dry_run {
        let invocation = ServerInvocation::new(&args.server_command, &settings)?;
        println!("{}", invocation.command_line());
        return Ok(())
    }
    match translate_and_exec(&settings, &args.server_command)? {}
}
