//! TFTP client implementation
//!
//! This module provides TFTP client functionality:
//! - File download (GET/RRQ)
//! - File upload (PUT/WRQ)
//!
//! Transfers are strictly lock-step: one block in flight, each block
//! acknowledged before the next is sent, lost packets recovered by
//! retransmitting after a timeout.
//!
//! # Usage Examples
//!
//! ## Download file
//!
//! ```rust,no_run
//! use tftpc::tftp::client::{self, describe_result};
//!
//! let code = client::receive_file("192.168.1.100".parse().unwrap(), 69, "remote.txt");
//! println!("{}", describe_result(code));
//! ```
//!
//! ## Upload file
//!
//! ```rust,no_run
//! use tftpc::tftp::client::{Client, config::ClientConfig};
//! use std::path::Path;
//!
//! let config = ClientConfig::new("192.168.1.100".to_string(), 69);
//! let client = Client::new(config).unwrap();
//! client.send_file(Path::new("local.txt")).unwrap();
//! ```
//!
//! # Command Line Usage
//!
//! ```bash
//! # Download file
//! tftpc get remote.txt --server 192.168.1.100
//!
//! # Upload file
//! tftpc put local.txt --server 192.168.1.100
//! ```

mod client_impl;
pub mod config;
mod error;
mod naming;
mod receiver;
mod sender;
mod session;

use anyhow::Result;
use clap::Subcommand;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

pub use client_impl::{Client, TransferSummary};
pub use config::{DEFAULT_PORT, DEFAULT_SERVER_IP};
pub use error::{ResultCode, SUCCESS, TransferError, describe_result, result_code};
pub use naming::{download_destination, next_available_name};

use crate::config::AppConfig;

#[derive(Subcommand)]
pub enum TftpcAction {
    /// Download a file from TFTP server (RRQ)
    Get {
        /// Remote file name on server
        remote_file: String,

        /// Server IP address or hostname [default: 127.0.0.1]
        #[arg(short, long)]
        server: Option<String>,

        /// Server port [default: 69]
        #[arg(short, long)]
        port: Option<u16>,

        /// Timeout per attempt in milliseconds [default: 500]
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Retransmissions before giving up [default: 3]
        #[arg(short, long)]
        retries: Option<u32>,

        /// Directory to save into [default: .]
        #[arg(short, long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },

    /// Upload a file to TFTP server (WRQ)
    Put {
        /// Local file path to upload
        local_file: PathBuf,

        /// Server IP address or hostname [default: 127.0.0.1]
        #[arg(short, long)]
        server: Option<String>,

        /// Server port [default: 69]
        #[arg(short, long)]
        port: Option<u16>,

        /// Timeout per attempt in milliseconds [default: 500]
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Retransmissions before giving up [default: 3]
        #[arg(short, long)]
        retries: Option<u32>,
    },
}

/// Run TFTP client command with configuration
pub fn run_with_config(action: TftpcAction, config: Option<&AppConfig>) -> Result<ResultCode> {
    let result = match action {
        TftpcAction::Get {
            remote_file,
            server,
            port,
            timeout,
            retries,
            dir,
        } => {
            let file_config = config.and_then(|c| c.get.clone()).unwrap_or_default();
            let cfg = file_config.merge_cli(server, port, timeout, retries, dir);
            let client = Client::new(cfg)?;

            client.receive_file(&remote_file)
        }

        TftpcAction::Put {
            local_file,
            server,
            port,
            timeout,
            retries,
        } => {
            let file_config = config.and_then(|c| c.put.clone()).unwrap_or_default();
            let cfg = file_config.merge_cli(server, port, timeout, retries, None);
            let client = Client::new(cfg)?;

            client.send_file(&local_file)
        }
    };

    Ok(report(result))
}

/// Send `local_path` to the server. Returns a [`ResultCode`].
pub fn send_file(server_ip: IpAddr, server_port: u16, local_path: &Path) -> ResultCode {
    report(Client::connect_to(SocketAddr::new(server_ip, server_port)).send_file(local_path))
}

/// [`send_file`] to `server_port` on the default server address.
pub fn send_file_to_port(server_port: u16, local_path: &Path) -> ResultCode {
    send_file(DEFAULT_SERVER_IP, server_port, local_path)
}

/// [`send_file`] to the default server address and port.
pub fn send_file_default(local_path: &Path) -> ResultCode {
    send_file(DEFAULT_SERVER_IP, DEFAULT_PORT, local_path)
}

/// Fetch `remote_filename` into the working directory. Returns a [`ResultCode`].
pub fn receive_file(server_ip: IpAddr, server_port: u16, remote_filename: &str) -> ResultCode {
    report(Client::connect_to(SocketAddr::new(server_ip, server_port)).receive_file(remote_filename))
}

/// [`receive_file`] from `server_port` on the default server address.
pub fn receive_file_from_port(server_port: u16, remote_filename: &str) -> ResultCode {
    receive_file(DEFAULT_SERVER_IP, server_port, remote_filename)
}

/// [`receive_file`] from the default server address and port.
pub fn receive_file_default(remote_filename: &str) -> ResultCode {
    receive_file(DEFAULT_SERVER_IP, DEFAULT_PORT, remote_filename)
}

fn report(result: std::result::Result<TransferSummary, TransferError>) -> ResultCode {
    if let Err(e) = &result {
        log::error!("Transfer failed: {}", e);
    }
    result_code(&result)
}
