use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use crate::tftp::core::RetryPolicy;

pub const DEFAULT_SERVER_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
pub const DEFAULT_PORT: u16 = 69;

/// Client settings as they appear in the configuration file. Every field is
/// optional; whatever is left unset falls back to the documented default when
/// the [`Client`](super::Client) is built.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ClientConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none", with = "humantime_serde", default)]
    pub timeout: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<PathBuf>,
}

impl ClientConfig {
    /// A fully populated configuration with the default policy.
    pub fn new(server: String, port: u16) -> Self {
        Self {
            server: Some(server),
            port: Some(port),
            timeout: Some(RetryPolicy::DEFAULT_TIMEOUT),
            retries: Some(RetryPolicy::DEFAULT_MAX_RETRIES),
            download_dir: Some(PathBuf::from(".")),
        }
    }

    /// Applies command line values on top of the file values. Only arguments
    /// the user actually gave are passed in as `Some`.
    pub fn merge_cli(
        mut self,
        cli_server: Option<String>,
        cli_port: Option<u16>,
        cli_timeout_ms: Option<u64>,
        cli_retries: Option<u32>,
        cli_download_dir: Option<PathBuf>,
    ) -> Self {
        if cli_server.is_some() {
            self.server = cli_server;
        }
        if cli_port.is_some() {
            self.port = cli_port;
        }
        if let Some(ms) = cli_timeout_ms {
            self = self.with_timeout(Duration::from_millis(ms));
        }
        if let Some(retries) = cli_retries {
            self = self.with_retries(retries);
        }
        if let Some(dir) = cli_download_dir {
            self = self.with_download_dir(dir);
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn with_download_dir(mut self, dir: PathBuf) -> Self {
        self.download_dir = Some(dir);
        self
    }

    /// Retry policy with defaults filled in.
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.timeout.unwrap_or(RetryPolicy::DEFAULT_TIMEOUT),
            self.retries.unwrap_or(RetryPolicy::DEFAULT_MAX_RETRIES),
        )
    }
}
