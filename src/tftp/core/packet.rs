use std::fmt;

use thiserror::Error;

/// Size of a full data block. A shorter block terminates the transfer.
pub const BLOCK_SIZE: usize = 512;
/// Largest datagram the protocol produces: opcode + block number + block.
pub const MAX_PACKET_SIZE: usize = 4 + BLOCK_SIZE;
/// The single transfer mode this client speaks.
pub const MODE: &str = "netascii";

/// Wire opcodes, always sent as two big-endian bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Opcode {
    Rrq = 1,
    Wrq = 2,
    Data = 3,
    Ack = 4,
    Error = 5,
}

impl TryFrom<u16> for Opcode {
    type Error = PacketError;

    fn try_from(value: u16) -> Result<Self, PacketError> {
        match value {
            1 => Ok(Opcode::Rrq),
            2 => Ok(Opcode::Wrq),
            3 => Ok(Opcode::Data),
            4 => Ok(Opcode::Ack),
            5 => Ok(Opcode::Error),
            other => Err(PacketError::UnknownOpcode(other)),
        }
    }
}

/// Error codes carried by ERROR packets (RFC 1350 section 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotDefined,
    FileNotFound,
    AccessViolation,
    DiskFull,
    IllegalOperation,
    UnknownTransferId,
    FileExists,
    NoSuchUser,
    /// A code outside the standard catalogue, kept verbatim.
    Unknown(u16),
}

/// Human-readable text for codes 0 through 7, in wire order.
pub(crate) const SERVER_ERRORS: [&str; 8] = [
    "Not defined, see error message (if any).",
    "File not found.",
    "Access violation (the host may have denied your request or you don't have the right to read/write the file).",
    "Disk full or allocation exceeded.",
    "Illegal TFTP operation.",
    "Unknown transfer ID.",
    "File already exists.",
    "No such user.",
];

pub(crate) const UNKNOWN_SERVER_ERROR: &str = "Unknown server error.";

impl ErrorCode {
    pub fn from_u16(code: u16) -> Self {
        match code {
            0 => ErrorCode::NotDefined,
            1 => ErrorCode::FileNotFound,
            2 => ErrorCode::AccessViolation,
            3 => ErrorCode::DiskFull,
            4 => ErrorCode::IllegalOperation,
            5 => ErrorCode::UnknownTransferId,
            6 => ErrorCode::FileExists,
            7 => ErrorCode::NoSuchUser,
            other => ErrorCode::Unknown(other),
        }
    }

    pub fn as_u16(self) -> u16 {
        match self {
            ErrorCode::NotDefined => 0,
            ErrorCode::FileNotFound => 1,
            ErrorCode::AccessViolation => 2,
            ErrorCode::DiskFull => 3,
            ErrorCode::IllegalOperation => 4,
            ErrorCode::UnknownTransferId => 5,
            ErrorCode::FileExists => 6,
            ErrorCode::NoSuchUser => 7,
            ErrorCode::Unknown(code) => code,
        }
    }

    /// Catalogue text for this code, or a generic fallback for unknown codes.
    pub fn description(self) -> &'static str {
        SERVER_ERRORS
            .get(self.as_u16() as usize)
            .copied()
            .unwrap_or(UNKNOWN_SERVER_ERROR)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_u16(), self.description())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    #[error("packet too short: {0} bytes")]
    TooShort(usize),
    #[error("unknown opcode {0}")]
    UnknownOpcode(u16),
    #[error("missing NUL terminator in {0} field")]
    MissingTerminator(&'static str),
    #[error("{0} field must be non-empty ASCII without NUL bytes")]
    InvalidString(&'static str),
    #[error("data payload of {0} bytes exceeds the block size")]
    PayloadTooLarge(usize),
}

/// A TFTP message, one variant per opcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Rrq { filename: String, mode: String },
    Wrq { filename: String, mode: String },
    Data { block_num: u16, data: Vec<u8> },
    Ack(u16),
    Error { code: ErrorCode, msg: String },
}

impl Packet {
    pub fn opcode(&self) -> Opcode {
        match self {
            Packet::Rrq { .. } => Opcode::Rrq,
            Packet::Wrq { .. } => Opcode::Wrq,
            Packet::Data { .. } => Opcode::Data,
            Packet::Ack(_) => Opcode::Ack,
            Packet::Error { .. } => Opcode::Error,
        }
    }

    /// Encodes the packet into its wire representation.
    pub fn serialize(&self) -> Result<Vec<u8>, PacketError> {
        let mut buf = Vec::with_capacity(MAX_PACKET_SIZE);
        buf.extend_from_slice(&(self.opcode() as u16).to_be_bytes());

        match self {
            Packet::Rrq { filename, mode } | Packet::Wrq { filename, mode } => {
                push_request_field(&mut buf, filename, "filename")?;
                push_request_field(&mut buf, mode, "mode")?;
            }
            Packet::Data { block_num, data } => {
                if data.len() > BLOCK_SIZE {
                    return Err(PacketError::PayloadTooLarge(data.len()));
                }
                buf.extend_from_slice(&block_num.to_be_bytes());
                buf.extend_from_slice(data);
            }
            Packet::Ack(block_num) => buf.extend_from_slice(&block_num.to_be_bytes()),
            Packet::Error { code, msg } => {
                buf.extend_from_slice(&code.as_u16().to_be_bytes());
                // Interior NULs would cut the message short on the peer.
                buf.extend(msg.bytes().filter(|&b| b != 0));
                buf.push(0);
            }
        }

        Ok(buf)
    }

    /// Decodes a received datagram.
    pub fn deserialize(buf: &[u8]) -> Result<Self, PacketError> {
        let opcode = Opcode::try_from(opcode_of(buf)?)?;
        let body = &buf[2..];

        match opcode {
            Opcode::Rrq | Opcode::Wrq => {
                let (filename, rest) = take_cstr(body, "filename")?;
                let (mode, _) = take_cstr(rest, "mode")?;
                if opcode == Opcode::Rrq {
                    Ok(Packet::Rrq { filename, mode })
                } else {
                    Ok(Packet::Wrq { filename, mode })
                }
            }
            Opcode::Data => {
                let block_num = read_u16(body).ok_or(PacketError::TooShort(buf.len()))?;
                let data = &body[2..];
                if data.len() > BLOCK_SIZE {
                    return Err(PacketError::PayloadTooLarge(data.len()));
                }
                Ok(Packet::Data {
                    block_num,
                    data: data.to_vec(),
                })
            }
            Opcode::Ack => {
                let block_num = read_u16(body).ok_or(PacketError::TooShort(buf.len()))?;
                Ok(Packet::Ack(block_num))
            }
            Opcode::Error => {
                // Codes live in the low byte; the high byte is ignored.
                let code = match body {
                    [_, lo, ..] => u16::from(*lo),
                    _ => return Err(PacketError::TooShort(buf.len())),
                };
                // Servers are not always careful about the trailing NUL.
                let text = &body[2..];
                let end = text.iter().position(|&b| b == 0).unwrap_or(text.len());
                Ok(Packet::Error {
                    code: ErrorCode::from_u16(code),
                    msg: String::from_utf8_lossy(&text[..end]).into_owned(),
                })
            }
        }
    }
}

/// Reads the 2-byte opcode field without interpreting the rest of the packet.
pub fn opcode_of(buf: &[u8]) -> Result<u16, PacketError> {
    read_u16(buf).ok_or(PacketError::TooShort(buf.len()))
}

fn read_u16(buf: &[u8]) -> Option<u16> {
    match buf {
        [hi, lo, ..] => Some(u16::from_be_bytes([*hi, *lo])),
        _ => None,
    }
}

fn push_request_field(
    buf: &mut Vec<u8>,
    value: &str,
    field: &'static str,
) -> Result<(), PacketError> {
    if value.is_empty() || !value.is_ascii() || value.contains('\0') {
        return Err(PacketError::InvalidString(field));
    }
    buf.extend_from_slice(value.as_bytes());
    buf.push(0);
    Ok(())
}

fn take_cstr<'a>(buf: &'a [u8], field: &'static str) -> Result<(String, &'a [u8]), PacketError> {
    let end = buf
        .iter()
        .position(|&b| b == 0)
        .ok_or(PacketError::MissingTerminator(field))?;
    if end == 0 || !buf[..end].is_ascii() {
        return Err(PacketError::InvalidString(field));
    }
    let value = String::from_utf8_lossy(&buf[..end]).into_owned();
    Ok((value, &buf[end + 1..]))
}
