//! The environment variables that carry configuration from the controller into
//! the container, where the entrypoint reads them back.

pub const HOST: &str = "HOST";
pub const PORT: &str = "PORT";
pub const DOCUMENTS: &str = "DOCUMENTS";
pub const MEDIA: &str = "MEDIA";
pub const WEB: &str = "WEB";
/// Only read by the entrypoint, the controller never sets it
pub const RELOAD: &str = "RELOAD";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: &str = "8000";
pub const DEFAULT_DOCUMENTS: &str = "true";
pub const DEFAULT_MEDIA: &str = "false";
pub const DEFAULT_WEB: &str = "false";
pub const DEFAULT_RELOAD: &str = "false";

/// Every key the entrypoint recognizes, with its default. The entrypoint
/// settings are read in this order.
pub const RECOGNIZED: [(&str, &str); 6] = [
    (HOST, DEFAULT_HOST),
    (PORT, DEFAULT_PORT),
    (DOCUMENTS, DEFAULT_DOCUMENTS),
    (MEDIA, DEFAULT_MEDIA),
    (WEB, DEFAULT_WEB),
    (RELOAD, DEFAULT_RELOAD),
];

/// The environment the controller launches the container with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeEnvironmentPayload {
    pub host: String,
    pub port: u16,
    pub documents: bool,
    pub media: bool,
    pub web: bool,
}

impl RuntimeEnvironmentPayload {
    /// The payload used by runs: listen on all interfaces at `container_port`
    /// with only document parsing enabled
    pub fn for_container_port(container_port: u16) -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: container_port,
            documents: true,
            media: false,
            web: false,
        }
    }

    /// The key-value pairs in a fixed order
    pub fn to_env_vars(&self) -> Vec<(&'static str, String)> {
        vec![
            (HOST, self.host.clone()),
            (PORT, self.port.to_string()),
            (DOCUMENTS, self.documents.to_string()),
            (MEDIA, self.media.to_string()),
            (WEB, self.web.to_string()),
        ]
    }
}
