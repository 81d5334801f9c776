//! The container entrypoint: turns the environment into server flags and
//! replaces itself with the server process.

use std::{convert::Infallible, ffi::OsString};

use stacked_errors::{bail, Result, StackableErr};
use tracing::info;

use crate::{
    environment::{HOST, PORT, RECOGNIZED},
    LaunchError,
};

/// The server command used when the entrypoint is not given one
pub const DEFAULT_SERVER_COMMAND: [&str; 2] = ["python", "server.py"];

/// The raw string settings the entrypoint reads, defaults already applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrypointSettings {
    pub host: String,
    pub port: String,
    pub documents: String,
    pub media: String,
    pub web: String,
    pub reload: String,
}

impl Default for EntrypointSettings {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl EntrypointSettings {
    /// Reads every recognized key through `lookup`, using the default for
    /// keys that are absent or empty
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let [host, port, documents, media, web, reload] = RECOGNIZED.map(|(key, default)| {
            lookup(key)
                .filter(|val| !val.is_empty())
                .unwrap_or_else(|| default.to_owned())
        });
        Self {
            host,
            port,
            documents,
            media,
            web,
            reload,
        }
    }

    /// Like [EntrypointSettings::from_lookup] for lookups that can return
    /// values that are not valid UTF-8. Such a value for a feature key is
    /// present but not "true", a HOST or PORT that is not valid UTF-8 is an
    /// error.
    pub fn from_os_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        for key in [HOST, PORT] {
            if let Some(val) = lookup(key) {
                if val.to_str().is_none() {
                    bail!("EntrypointSettings::from_os_lookup -> {key} is not valid UTF-8: {val:?}")
                }
            }
        }
        Ok(Self::from_lookup(|key| {
            lookup(key).map(|val| val.to_string_lossy().into_owned())
        }))
    }

    pub fn from_process_env() -> Result<Self> {
        Self::from_os_lookup(|key| std::env::var_os(key))
    }
}

/// Only the exact string "true" enables a feature
fn is_enabled(val: &str) -> bool {
    val == "true"
}

/// Which presence-only flags the server gets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureFlagSet {
    pub documents: bool,
    pub media: bool,
    pub web: bool,
    pub reload: bool,
}

impl FeatureFlagSet {
    pub fn from_settings(settings: &EntrypointSettings) -> Self {
        Self {
            documents: is_enabled(&settings.documents),
            media: is_enabled(&settings.media),
            web: is_enabled(&settings.web),
            reload: is_enabled(&settings.reload),
        }
    }

    /// The enabled flags, always in documents, media, web, reload order
    pub fn tokens(&self) -> Vec<&'static str> {
        [
            (self.documents, "--documents"),
            (self.media, "--media"),
            (self.web, "--web"),
            (self.reload, "--reload"),
        ]
        .into_iter()
        .filter_map(|(enabled, token)| enabled.then_some(token))
        .collect()
    }
}

/// The fully resolved server process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl ServerInvocation {
    /// `server_command` is the program and its leading arguments, the
    /// translated flags go after them. An empty `server_command` means
    /// [DEFAULT_SERVER_COMMAND].
    pub fn new(server_command: &[String], settings: &EntrypointSettings) -> Result<Self> {
        let mut command: Vec<String> = if server_command.is_empty() {
            DEFAULT_SERVER_COMMAND.iter().map(|s| s.to_string()).collect()
        } else {
            server_command.to_vec()
        };
        if command[0].is_empty() {
            bail!("ServerInvocation::new -> the server program is empty")
        }
        let program = command.remove(0);
        let mut args = command;
        args.extend([
            "--host".to_owned(),
            settings.host.clone(),
            "--port".to_owned(),
            settings.port.clone(),
        ]);
        args.extend(
            FeatureFlagSet::from_settings(settings)
                .tokens()
                .into_iter()
                .map(str::to_owned),
        );
        Ok(Self { program, args })
    }

    pub fn command_line(&self) -> String {
        let mut s = self.program.clone();
        for arg in &self.args {
            s.push(' ');
            s += arg;
        }
        s
    }
}

/// Resolves the server invocation and replaces the current process with it.
/// Only returns if that fails.
pub fn translate_and_exec(
    settings: &EntrypointSettings,
    server_command: &[String],
) -> Result<Infallible> {
    let invocation = ServerInvocation::new(server_command, settings)?;
    info!("starting server: {}", invocation.command_line());
    exec(invocation)
}

#[cfg(unix)]
fn exec(invocation: ServerInvocation) -> Result<Infallible> {
    use std::os::unix::process::CommandExt;

    let source = std::process::Command::new(&invocation.program)
        .args(&invocation.args)
        .exec();
    Err(LaunchError {
        program: invocation.program,
        source,
    })
    .stack()
}

// no process image replacement here, so the server runs as a child whose exit
// status becomes ours
#[cfg(not(unix))]
fn exec(invocation: ServerInvocation) -> Result<Infallible> {
    let status = match std::process::Command::new(&invocation.program)
        .args(&invocation.args)
        .status()
    {
        Ok(status) => status,
        Err(source) => {
            return Err(LaunchError {
                program: invocation.program,
                source,
            })
            .stack()
        }
    };
    std::process::exit(status.code().unwrap_or(1))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(vars: &[(&str, &str)]) -> EntrypointSettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EntrypointSettings::from_lookup(|key| vars.get(key).cloned())
    }

    fn server_flags(vars: &[(&str, &str)]) -> String {
        let invocation = ServerInvocation::new(&[], &settings(vars)).unwrap();
        assert_eq!(invocation.program, "python");
        assert_eq!(invocation.args[0], "server.py");
        invocation.args[1..].join(" ")
    }

    #[test]
    fn nothing_set() {
        assert_eq!(server_flags(&[]), "--host 0.0.0.0 --port 8000 --documents");
        assert_eq!(EntrypointSettings::default(), settings(&[]));
    }

    #[test]
    fn media_enabled() {
        assert_eq!(
            server_flags(&[("MEDIA", "true")]),
            "--host 0.0.0.0 --port 8000 --documents --media"
        );
    }

    #[test]
    fn strict_equality() {
        assert_eq!(
            server_flags(&[("DOCUMENTS", "false"), ("WEB", "true"), ("RELOAD", "TRUE")]),
            "--host 0.0.0.0 --port 8000 --web"
        );
        for val in ["True", "1", "yes", " true", "true "] {
            assert_eq!(
                server_flags(&[("DOCUMENTS", "false"), ("MEDIA", val)]),
                "--host 0.0.0.0 --port 8000",
                "{val:?}"
            );
        }
    }

    #[test]
    fn fixed_flag_order() {
        assert_eq!(
            server_flags(&[
                ("RELOAD", "true"),
                ("WEB", "true"),
                ("MEDIA", "true"),
                ("HOST", "127.0.0.1"),
                ("PORT", "9000"),
            ]),
            "--host 127.0.0.1 --port 9000 --documents --media --web --reload"
        );
    }

    #[test]
    fn empty_values_fall_back_to_defaults() {
        assert_eq!(
            server_flags(&[("HOST", ""), ("PORT", ""), ("DOCUMENTS", "")]),
            "--host 0.0.0.0 --port 8000 --documents"
        );
    }

    #[test]
    fn custom_server_command() {
        let command = vec!["uvicorn".to_owned(), "app:main".to_owned()];
        let invocation = ServerInvocation::new(&command, &settings(&[("WEB", "true")])).unwrap();
        assert_eq!(
            invocation.command_line(),
            "uvicorn app:main --host 0.0.0.0 --port 8000 --documents --web"
        );
        assert!(ServerInvocation::new(&["".to_owned()], &settings(&[])).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_values() {
        use std::os::unix::ffi::OsStringExt;

        fn os_settings(vars: &[(&str, &[u8])]) -> Result<EntrypointSettings> {
            let vars: HashMap<String, OsString> = vars
                .iter()
                .map(|(k, v)| (k.to_string(), OsString::from_vec(v.to_vec())))
                .collect();
            EntrypointSettings::from_os_lookup(|key| vars.get(key).cloned())
        }

        // present but not "true", so the default does not apply
        let settings = os_settings(&[("DOCUMENTS", b"\xff"), ("MEDIA", b"tr\xffue")]).unwrap();
        let invocation = ServerInvocation::new(&[], &settings).unwrap();
        assert_eq!(
            invocation.command_line(),
            "python server.py --host 0.0.0.0 --port 8000"
        );

        let settings = os_settings(&[("HOST", b"127.0.0.1"), ("WEB", b"true")]).unwrap();
        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(FeatureFlagSet::from_settings(&settings).tokens(), vec![
            "--documents",
            "--web"
        ]);

        assert!(os_settings(&[("HOST", b"\xff")]).is_err());
        assert!(os_settings(&[("PORT", b"80\xff")]).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn missing_server_program_is_a_launch_error() {
        let command = vec!["omniparse-launcher-nonexistent-server".to_owned()];
        assert!(translate_and_exec(&settings(&[]), &command).is_err());
    }
}
