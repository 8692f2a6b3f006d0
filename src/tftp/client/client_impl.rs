use std::fs::{self, File, OpenOptions};
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::config::{ClientConfig, DEFAULT_PORT, DEFAULT_SERVER_IP};
use super::error::TransferError;
use super::{naming, receiver, sender};
use crate::tftp::core::{RetryPolicy, Socket, bind_ephemeral};

/// What a finished transfer did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSummary {
    pub local_path: PathBuf,
    pub remote_name: String,
    pub bytes: u64,
    pub blocks: u64,
    pub elapsed: Duration,
}

/// TFTP client
///
/// Supports file upload (PUT) and download (GET) operations. Every transfer
/// runs on its own ephemeral socket, which is closed when the transfer ends
/// however it ends.
#[derive(Debug, Clone)]
pub struct Client {
    server: SocketAddr,
    policy: RetryPolicy,
    download_dir: PathBuf,
}

impl Client {
    /// Create a new TFTP client, resolving the server name if needed.
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        let policy = config.policy();
        let port = config.port.unwrap_or(DEFAULT_PORT);
        let server = match config.server.as_deref() {
            None => SocketAddr::new(DEFAULT_SERVER_IP, port),
            Some(host) => (host, port)
                .to_socket_addrs()
                .map_err(|e| anyhow::anyhow!("Invalid server address '{}': {}", host, e))?
                .next()
                .ok_or_else(|| anyhow::anyhow!("Server '{}' did not resolve", host))?,
        };

        log::debug!(
            "Using server {}, giving up on an exchange after {:?}",
            server,
            policy.ceiling()
        );
        Ok(Self {
            server,
            policy,
            download_dir: config.download_dir.unwrap_or_else(|| PathBuf::from(".")),
        })
    }

    /// A client for `server` with the default retry policy, downloading into
    /// the working directory.
    pub fn connect_to(server: SocketAddr) -> Self {
        Self {
            server,
            policy: RetryPolicy::default(),
            download_dir: PathBuf::from("."),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    pub fn server(&self) -> SocketAddr {
        self.server
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Upload a file to the server (WRQ - Write Request). The remote name is
    /// the local file name without its directories.
    pub fn send_file(&self, local_file: &Path) -> Result<TransferSummary, TransferError> {
        let mut socket = bind_ephemeral(&self.server).map_err(TransferError::SocketCreate)?;
        self.send_with(&mut socket, local_file)
    }

    /// Download a file from the server (RRQ - Read Request) into the download
    /// directory. An existing local file is never overwritten; a numbered
    /// name is picked instead.
    pub fn receive_file(&self, remote_file: &str) -> Result<TransferSummary, TransferError> {
        let mut socket = bind_ephemeral(&self.server).map_err(TransferError::SocketCreate)?;
        self.receive_with(&mut socket, remote_file)
    }

    pub(crate) fn send_with<S: Socket + ?Sized>(
        &self,
        socket: &mut S,
        local_file: &Path,
    ) -> Result<TransferSummary, TransferError> {
        let started = Instant::now();

        let remote_name = local_file
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| is_transferable_name(n))
            .ok_or_else(|| bad_name(local_file.to_path_buf()))?
            .to_string();

        let file = File::open(local_file).map_err(|source| TransferError::FileOpen {
            path: local_file.to_path_buf(),
            source,
        })?;
        // Opening a directory succeeds on Unix; only reading it fails.
        let metadata = file.metadata().map_err(|source| TransferError::FileOpen {
            path: local_file.to_path_buf(),
            source,
        })?;
        if !metadata.is_file() {
            return Err(TransferError::FileOpen {
                path: local_file.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
            });
        }

        log::info!(
            "Uploading {} to {} as {}",
            local_file.display(),
            self.server,
            remote_name
        );
        let session = sender::send_file(socket, file, &remote_name, self.server, &self.policy)?;

        let summary = TransferSummary {
            local_path: local_file.to_path_buf(),
            remote_name,
            bytes: session.bytes(),
            blocks: session.blocks(),
            elapsed: started.elapsed(),
        };
        log::info!(
            "File \"{}\" sent successfully in {:?} ({} bytes)",
            summary.remote_name,
            summary.elapsed,
            summary.bytes
        );
        Ok(summary)
    }

    pub(crate) fn receive_with<S: Socket + ?Sized>(
        &self,
        socket: &mut S,
        remote_file: &str,
    ) -> Result<TransferSummary, TransferError> {
        let started = Instant::now();

        if !is_transferable_name(remote_file) {
            return Err(bad_name(PathBuf::from(remote_file)));
        }
        let local_path = naming::download_destination(&self.download_dir, remote_file)
            .ok_or_else(|| TransferError::FileOpen {
                path: self.download_dir.join(remote_file),
                source: io::Error::new(io::ErrorKind::InvalidInput, "no usable file name"),
            })?;
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&local_path)
            .map_err(|source| TransferError::FileOpen {
                path: local_path.clone(),
                source,
            })?;

        log::info!(
            "Downloading {} from {} to {}",
            remote_file,
            self.server,
            local_path.display()
        );

        let (mut session, first) =
            match receiver::request(socket, remote_file, self.server, &self.policy) {
                Ok(accepted) => accepted,
                Err(e) => {
                    // Nothing was received, so the empty file is not kept.
                    drop(file);
                    if let Err(rm) = fs::remove_file(&local_path) {
                        log::warn!("Failed to remove {}: {}", local_path.display(), rm);
                    }
                    return Err(e);
                }
            };

        // From here on a failure leaves whatever was written in place.
        receiver::stream(socket, &mut session, first, &mut file, &self.policy)?;
        file.sync_all().map_err(TransferError::FileClose)?;

        let summary = TransferSummary {
            local_path,
            remote_name: remote_file.to_string(),
            bytes: session.bytes(),
            blocks: session.blocks(),
            elapsed: started.elapsed(),
        };
        log::info!(
            "File \"{}\" retrieved successfully in {:?} ({} bytes)",
            summary.remote_name,
            summary.elapsed,
            summary.bytes
        );
        Ok(summary)
    }
}

/// Names that fit in a request packet.
fn is_transferable_name(name: &str) -> bool {
    !name.is_empty() && name.is_ascii() && !name.contains('\0')
}

fn bad_name(path: PathBuf) -> TransferError {
    TransferError::FileOpen {
        path,
        source: io::Error::new(
            io::ErrorKind::InvalidInput,
            "file name must be non-empty ASCII without NUL bytes",
        ),
    }
}
