//! Lifecycle control of the OmniParse server container, and the entrypoint
//! that translates the container environment into server flags.

mod command;
mod config;
/// The lifecycle controller behind the `omniparse-ctl` binary
pub mod controller;
/// The entrypoint behind the `omniparse-entrypoint` binary
pub mod entrypoint;
pub mod environment;
mod error;
mod misc;
/// Container runtime abstraction and the command line backed implementation
pub mod runtime;
pub use command::*;
pub use config::*;
pub use controller::{AccelerationMode, Invocation, OperationMode};
pub use environment::RuntimeEnvironmentPayload;
pub use error::*;
pub use misc::*;
pub use runtime::{CliRuntime, ContainerRuntime, RunSpec, RuntimeOutcome};
/// This reexport helps with dependency wrangling
pub use stacked_errors;
