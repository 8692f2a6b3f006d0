use std::{io, net::SocketAddr, path::PathBuf};

use thiserror::Error;

use crate::tftp::core::{
    ErrorCode, ExchangeError, PacketError, SERVER_ERRORS, UNKNOWN_SERVER_ERROR,
};

/// Outcome of a transfer as a stable signed integer: `0` is success, `N > 0`
/// is server error code `N - 1`, `N < 0` is local failure category `-N - 1`.
pub type ResultCode = i32;

pub const SUCCESS: ResultCode = 0;

/// Local failure categories, indexed by `-code - 1`.
const LOCAL_ERRORS: [&str; 5] = [
    "Could not create the socket.",
    "Error encountered while trying to open the file.",
    "I/O error while sending/receiving a packet.",
    "Error encountered while trying to read or write the file.",
    "I/O error while closing the file.",
];

const SUCCESS_MESSAGE: &str = "No problem occurred while sending/receiving the file.";
const NO_MESSAGE: &str = "No message was found for this error code.";

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("could not create the socket: {0}")]
    SocketCreate(#[source] io::Error),

    #[error("could not open {}: {source}", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("network I/O failed: {0}")]
    Network(#[source] io::Error),

    #[error("no response from {peer} after {attempts} attempts")]
    Timeout { peer: SocketAddr, attempts: u32 },

    #[error("file I/O failed: {0}")]
    FileIo(#[source] io::Error),

    #[error("could not close the file: {0}")]
    FileClose(#[source] io::Error),

    #[error("server error {code}: {message}")]
    Remote { code: ErrorCode, message: String },

    #[error("unexpected packet with opcode {opcode}")]
    UnexpectedPacket { opcode: u16 },

    #[error("malformed packet: {0}")]
    Malformed(#[from] PacketError),
}

impl From<ExchangeError> for TransferError {
    fn from(err: ExchangeError) -> Self {
        match err {
            ExchangeError::Timeout { peer, attempts } => TransferError::Timeout { peer, attempts },
            ExchangeError::Io(e) => TransferError::Network(e),
        }
    }
}

impl TransferError {
    /// Maps the failure into the stable result-code space.
    pub fn code(&self) -> ResultCode {
        match self {
            TransferError::SocketCreate(_) => -1,
            TransferError::FileOpen { .. } => -2,
            TransferError::Network(_) | TransferError::Timeout { .. } => -3,
            TransferError::FileIo(_) => -4,
            TransferError::FileClose(_) => -5,
            TransferError::Remote { code, .. } => code.as_u16() as ResultCode + 1,
            TransferError::UnexpectedPacket { .. } | TransferError::Malformed(_) => {
                ErrorCode::IllegalOperation.as_u16() as ResultCode + 1
            }
        }
    }
}

/// Collapses a transfer outcome into its result code.
pub fn result_code<T>(result: &Result<T, TransferError>) -> ResultCode {
    match result {
        Ok(_) => SUCCESS,
        Err(e) => e.code(),
    }
}

/// Human-readable text for any result code.
pub fn describe_result(code: ResultCode) -> &'static str {
    match code {
        SUCCESS => SUCCESS_MESSAGE,
        n if n > 0 => SERVER_ERRORS
            .get((n - 1) as usize)
            .copied()
            .unwrap_or(UNKNOWN_SERVER_ERROR),
        n => LOCAL_ERRORS
            .get((-(n as i64) - 1) as usize)
            .copied()
            .unwrap_or(NO_MESSAGE),
    }
}
