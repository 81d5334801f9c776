use std::ffi::OsStr;

/// What a single controller invocation does
#[derive(Debug, Clone, Copy, Default, Hash, PartialEq, Eq)]
pub enum OperationMode {
    BuildOnly,
    StopOnly,
    RemoveOnly,
    #[default]
    BuildAndRun,
}

/// Whether runs request GPU passthrough
#[derive(Debug, Clone, Copy, Default, Hash, PartialEq, Eq)]
pub enum AccelerationMode {
    #[default]
    Gpu,
    Cpu,
}

/// The parsed command line of the controller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub mode: OperationMode,
    pub acceleration: AccelerationMode,
    /// Tokens that were not recognized, in order. Tokens that are not valid
    /// UTF-8 are kept lossily converted.
    pub ignored: Vec<String>,
}

impl Invocation {
    /// Parses the arguments (not including the program name) left to right.
    ///
    /// "--stop" takes priority over "--rm", which takes priority over
    /// "--build", regardless of their order. Among "--gpu" and "--cpu" the last
    /// one wins. Anything else is skipped, one token at a time, including
    /// tokens that are not valid UTF-8.
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut build = false;
        let mut stop = false;
        let mut remove = false;
        let mut acceleration = AccelerationMode::default();
        let mut ignored = vec![];
        for arg in args {
            let arg = arg.as_ref();
            match arg.to_str() {
                Some("--build") => build = true,
                Some("--stop") => stop = true,
                Some("--rm") => remove = true,
                Some("--gpu") => acceleration = AccelerationMode::Gpu,
                Some("--cpu") => acceleration = AccelerationMode::Cpu,
                _ => ignored.push(arg.to_string_lossy().into_owned()),
            }
        }
        let mode = if stop {
            OperationMode::StopOnly
        } else if remove {
            OperationMode::RemoveOnly
        } else if build {
            OperationMode::BuildOnly
        } else {
            OperationMode::BuildAndRun
        };
        Self {
            mode,
            acceleration,
            ignored,
        }
    }
}
