//! The fixed identity of the managed container, and the small amount of
//! configuration the controller takes from its environment.

use std::fmt;

/// The name given to the container
pub const CONTAINER_NAME: &str = "omniparse";
/// The image reference the container is built as and run from
pub const IMAGE_REFERENCE: &str = "omniparse";
/// The port the server listens on inside the container, and the host port it
/// is published on
pub const SERVER_PORT: u16 = 8000;
/// The directory passed to the image build
pub const BUILD_CONTEXT: &str = ".";
/// The container runtime program used when nothing overrides it
pub const DEFAULT_RUNTIME_PROGRAM: &str = "docker";
/// Environment variable that overrides the container runtime program (e.g.
/// "podman")
pub const RUNTIME_PROGRAM_VAR: &str = "OMNIPARSE_CONTAINER_RUNTIME";

/// The {name, image-reference} pair that stop and remove operate on
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ContainerIdentity {
    pub name: String,
    pub image: String,
}

impl ContainerIdentity {
    pub fn new(name: impl AsRef<str>, image: impl AsRef<str>) -> Self {
        Self {
            name: name.as_ref().to_owned(),
            image: image.as_ref().to_owned(),
        }
    }
}

impl Default for ContainerIdentity {
    fn default() -> Self {
        Self::new(CONTAINER_NAME, IMAGE_REFERENCE)
    }
}

/// A host port published 1:1 to a container port
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct PortBinding {
    pub host_port: u16,
    pub container_port: u16,
}

impl Default for PortBinding {
    fn default() -> Self {
        Self {
            host_port: SERVER_PORT,
            container_port: SERVER_PORT,
        }
    }
}

impl fmt::Display for PortBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host_port, self.container_port)
    }
}

/// Everything the controller needs besides the parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    pub identity: ContainerIdentity,
    pub ports: PortBinding,
    pub build_context: String,
    /// The container runtime program, "docker" by default
    pub runtime_program: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            identity: ContainerIdentity::default(),
            ports: PortBinding::default(),
            build_context: BUILD_CONTEXT.to_owned(),
            runtime_program: DEFAULT_RUNTIME_PROGRAM.to_owned(),
        }
    }
}

impl ControllerConfig {
    /// Builds the default config with overrides looked up by `lookup`. Empty
    /// values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(program) = lookup(RUNTIME_PROGRAM_VAR).filter(|s| !s.trim().is_empty()) {
            config.runtime_program = program.trim().to_owned();
        }
        config
    }

    pub fn from_process_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}
