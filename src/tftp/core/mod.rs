//! TFTP core protocol implementation
//!
//! This module contains the core components of the TFTP protocol:
//! - `packet`: Packet serialization and deserialization
//! - `socket`: Datagram transport abstraction
//! - `exchange`: Send-and-await with timeout-driven retransmission

pub mod exchange;
mod packet;
mod socket;

// Public core types
pub use exchange::{Datagram, ExchangeError, RetryPolicy, Verdict, exchange};
pub use packet::{BLOCK_SIZE, ErrorCode, MAX_PACKET_SIZE, MODE, Opcode, Packet, PacketError, opcode_of};
pub(crate) use packet::{SERVER_ERRORS, UNKNOWN_SERVER_ERROR};
pub use socket::{Socket, bind_ephemeral, is_timeout};
